//! In-process implementation of the persistence collaborator.
//!
//! Used for local (signed-out or offline) mode and in tests. When opened
//! with a path, every write is flushed to a JSON snapshot so logged
//! activities survive restarts.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{Filter, Store, StoreError, Table};

type Tables = HashMap<String, Vec<Value>>;

/// Clone is cheap - rows live behind an Arc.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading any existing snapshot.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables: Tables = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Tables::new()
        };
        debug!(path = %path.display(), tables = tables.len(), "Opened local store");
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            path: Some(path),
        })
    }

    /// Number of rows currently held in a table
    pub fn row_count(&self, table: Table) -> usize {
        self.read()
            .get(table.name())
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        // A poisoned lock only means another writer panicked mid-update;
        // rows are replaced whole so the map is still consistent.
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, tables: &Tables) -> Result<(), StoreError> {
        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(tables)?)?;
        }
        Ok(())
    }

    /// Replace a table's rows, keeping the previous rows if the snapshot
    /// cannot be written so memory never runs ahead of disk.
    fn commit(&self, tables: &mut Tables, table: Table, rows: Vec<Value>) -> Result<(), StoreError> {
        let previous = tables.insert(table.name().to_string(), rows);
        if let Err(e) = self.flush(tables) {
            match previous {
                Some(rows) => tables.insert(table.name().to_string(), rows),
                None => tables.remove(table.name()),
            };
            return Err(e);
        }
        Ok(())
    }

    fn as_object(record: Value) -> Result<Map<String, Value>, StoreError> {
        match record {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidResponse(format!(
                "Expected a JSON object row, got {}",
                other
            ))),
        }
    }

    fn same_row(table: Table, a: &Value, b: &Map<String, Value>) -> bool {
        table
            .conflict_columns()
            .iter()
            .all(|column| matches!(b.get(*column), Some(v) if a.get(*column) == Some(v)))
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            // Timestamps carry a variable-width fraction, so compare them parsed
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let mut row = Self::as_object(record)?;
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        let row = Value::Object(row);

        let mut tables = self.write();
        let mut rows = tables.get(table.name()).cloned().unwrap_or_default();
        if let Some(id) = row.get("id") {
            if rows.iter().any(|existing| existing.get("id") == Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "duplicate id {} in {}",
                    id,
                    table.name()
                )));
            }
        }
        rows.push(row.clone());
        self.commit(&mut tables, table, rows)?;
        Ok(row)
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let tables = self.read();
        let mut rows: Vec<Value> = tables
            .get(table.name())
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(ref order) = filter.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        Ok(rows)
    }

    async fn upsert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let mut incoming = Self::as_object(record)?;
        if table.conflict_columns() == ["id"] {
            incoming
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        }

        let mut tables = self.write();
        let mut rows = tables.get(table.name()).cloned().unwrap_or_default();
        let stored = match rows.iter_mut().find(|row| Self::same_row(table, row, &incoming)) {
            Some(existing) => {
                if let Value::Object(fields) = existing {
                    fields.extend(incoming);
                }
                existing.clone()
            }
            None => {
                let row = Value::Object(incoming);
                rows.push(row.clone());
                row
            }
        };
        self.commit(&mut tables, table, rows)?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_select_filters() {
        let store = MemoryStore::new();
        let row = store
            .insert(Table::Activities, json!({"user_id": "u1", "value": 1}))
            .await
            .unwrap();
        assert!(row.get("id").and_then(Value::as_str).is_some());

        store
            .insert(Table::Activities, json!({"user_id": "u2", "value": 2}))
            .await
            .unwrap();

        let rows = store
            .select(Table::Activities, &Filter::new().eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["value"], 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        store.insert(Table::Users, json!({"id": "u1"})).await.unwrap();
        let err = store.insert(Table::Users, json!({"id": "u1"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_select_orders_descending() {
        let store = MemoryStore::new();
        for ts in ["2026-10-19T08:00:00Z", "2026-10-19T10:00:00Z", "2026-10-19T09:00:00Z"] {
            store
                .insert(Table::Activities, json!({"created_at": ts}))
                .await
                .unwrap();
        }
        let rows = store
            .select(Table::Activities, &Filter::new().order_by("created_at", false))
            .await
            .unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r["created_at"].as_str().unwrap()).collect();
        assert_eq!(
            order,
            vec!["2026-10-19T10:00:00Z", "2026-10-19T09:00:00Z", "2026-10-19T08:00:00Z"]
        );
    }

    #[tokio::test]
    async fn test_upsert_merges_on_conflict_columns() {
        let store = MemoryStore::new();
        store
            .upsert(
                Table::WellnessScores,
                json!({"user_id": "u1", "date": "2026-10-19", "score": 40}),
            )
            .await
            .unwrap();
        let updated = store
            .upsert(
                Table::WellnessScores,
                json!({"user_id": "u1", "date": "2026-10-19", "score": 80}),
            )
            .await
            .unwrap();

        assert_eq!(updated["score"], 80);
        assert_eq!(store.row_count(Table::WellnessScores), 1);
    }

    #[tokio::test]
    async fn test_open_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::open(&path).unwrap();
        store
            .insert(Table::Goals, json!({"id": "g1", "target_value": 8}))
            .await
            .unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.row_count(Table::Goals), 1);
    }

    #[tokio::test]
    async fn test_failed_flush_leaves_rows_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = MemoryStore::open(&path).unwrap();
        store
            .upsert(Table::Goals, json!({"id": "g1", "target_value": 8}))
            .await
            .unwrap();

        // A directory where the snapshot file should be makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store
            .insert(Table::Activities, json!({"user_id": "u1", "value": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.row_count(Table::Activities), 0);

        assert!(store
            .upsert(Table::Goals, json!({"id": "g1", "target_value": 12}))
            .await
            .is_err());
        let goals = store.select(Table::Goals, &Filter::new()).await.unwrap();
        assert_eq!(goals[0]["target_value"], 8);
    }
}
