//! Persistence collaborator for wellness data.
//!
//! The rest of the crate reaches the hosted relational store only through
//! the three verbs of the [`Store`] trait: `insert`, `select` and `upsert`.
//! Two implementations are provided:
//!
//! - `RestStore`: PostgREST-style REST client for the hosted database
//! - `MemoryStore`: in-process tables, optionally persisted to a JSON file
//!
//! All failures surface as [`StoreError`].

pub mod error;
pub mod memory;
pub mod rest;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Tables known to the wellness backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Activities,
    Goals,
    Reminders,
    WellnessScores,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Activities => "activities",
            Table::Goals => "goals",
            Table::Reminders => "reminders",
            Table::WellnessScores => "wellness_scores",
        }
    }

    /// Columns that identify a row for upsert purposes.
    pub fn conflict_columns(&self) -> &'static [&'static str] {
        match self {
            Table::WellnessScores => &["user_id", "date"],
            _ => &["id"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality filter with optional ordering, the only query shape the
/// wellness views need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<(String, Value)>,
    pub order: Option<Order>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    /// Check whether a JSON row satisfies every equality condition
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a row and return it as stored
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError>;

    /// Return every row matching the filter
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Insert or replace the row sharing the table's conflict columns
    async fn upsert(&self, table: Table, record: Value) -> Result<Value, StoreError>;
}

// ===== Typed helpers =====

pub async fn insert_as<T>(store: &dyn Store, table: Table, record: &T) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let stored = store.insert(table, serde_json::to_value(record)?).await?;
    Ok(serde_json::from_value(stored)?)
}

pub async fn upsert_as<T>(store: &dyn Store, table: Table, record: &T) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let stored = store.upsert(table, serde_json::to_value(record)?).await?;
    Ok(serde_json::from_value(stored)?)
}

pub async fn select_as<T>(store: &dyn Store, table: Table, filter: &Filter) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
{
    store
        .select(table, filter)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}
