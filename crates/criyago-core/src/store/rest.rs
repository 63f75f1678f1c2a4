//! REST client for the hosted wellness database.
//!
//! Speaks the PostgREST dialect exposed at `<base>/rest/v1/<table>`:
//! equality filters are encoded as `column=eq.value`, inserts and upserts
//! ask for the stored row back with `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Filter, Store, StoreError, Table};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    token: Option<String>,
    initial_backoff: Duration,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Create a store handle acting on behalf of a signed-in user,
    /// sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            token: Some(token),
            initial_backoff: self.initial_backoff,
        }
    }

    /// Override the first rate-limit backoff; later retries double it
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self.token.as_deref().unwrap_or(&self.api_key);
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
            .header(header::ACCEPT, "application/json")
    }

    /// Render a filter as PostgREST query parameters
    fn query_params(filter: &Filter) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &filter.conditions {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.push((column.clone(), format!("eq.{}", rendered)));
        }
        if let Some(ref order) = filter.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        params
    }

    /// Send a request, backing off and retrying while the server rate limits us.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.authorize(build()).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(StoreError::RateLimited);
                }
                warn!(
                    url = url,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(status, &body));
        }
    }

    /// PostgREST returns representation rows as an array even for single inserts.
    async fn single_row(response: Response) -> Result<Value, StoreError> {
        match response.json::<Value>().await? {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Value::Array(_) => Err(StoreError::InvalidResponse(
                "Empty representation returned".to_string(),
            )),
            row @ Value::Object(_) => Ok(row),
            other => Err(StoreError::InvalidResponse(format!(
                "Unexpected row payload: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl Store for RestStore {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let url = self.table_url(table);
        debug!(table = table.name(), "Inserting row");
        let response = self
            .send(&url, || {
                self.client
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&record)
            })
            .await?;
        Self::single_row(response).await
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(table);
        let params = Self::query_params(filter);
        debug!(table = table.name(), conditions = filter.conditions.len(), "Selecting rows");
        let response = self
            .send(&url, || self.client.get(&url).query(&params))
            .await?;
        let rows: Vec<Value> = response.json().await?;
        Ok(rows)
    }

    async fn upsert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let url = self.table_url(table);
        let on_conflict = table.conflict_columns().join(",");
        debug!(table = table.name(), on_conflict = %on_conflict, "Upserting row");
        let response = self
            .send(&url, || {
                self.client
                    .post(&url)
                    .query(&[("on_conflict", on_conflict.as_str())])
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .json(&record)
            })
            .await?;
        Self::single_row(response).await
    }
}
