//! Read-only access to the nutrition log database
//!
//! The structured-data tool executes generated SELECT statements it cannot
//! know the column shape of ahead of time, so the store wraps each statement
//! in `json_agg` and hands back a JSON array of row objects. That keeps the
//! execution path generic and makes empty-result detection uniform.
//!
//! The pool connects with `default_transaction_read_only=on`; even a
//! statement that slips past validation cannot write.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use thiserror::Error;

/// Errors from executing a generated statement
#[derive(Debug, Error)]
pub enum StoreError {
    /// The statement failed to execute (syntax, missing column, connectivity)
    ///
    /// Local and recoverable; the tool converts this into a soft failure
    /// message rather than letting it cross the orchestrator boundary.
    #[error("statement execution failed: {0}")]
    Execution(String),
}

/// Executes read-only statements against the log database
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Run one SELECT statement, returning its rows as a JSON array
    ///
    /// The array is empty when no rows matched. An aggregate over zero rows
    /// comes back as a single row of NULLs; callers must treat that as empty
    /// too (see `is_empty_result` in the tools module).
    async fn select_rows(&self, statement: &str) -> Result<serde_json::Value, StoreError>;
}

/// PostgreSQL-backed store
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    /// Build a lazily-connecting pool from the configured database URL
    ///
    /// Lazy connection keeps startup independent of database availability;
    /// the first query pays the connection cost instead.
    pub fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| AppError::Config(format!("Invalid database URL: {}", e)))?
            .options([("default_transaction_read_only", "on")]);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn select_rows(&self, statement: &str) -> Result<serde_json::Value, StoreError> {
        // json_agg turns any row shape into one JSON value; COALESCE maps a
        // zero-row aggregation to an empty array instead of NULL.
        let wrapped = format!(
            "SELECT COALESCE(json_agg(q), '[]'::json) AS rows FROM ({}) AS q",
            statement
        );

        let row = sqlx::query(&wrapped)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Generated statement failed to execute");
                StoreError::Execution(e.to_string())
            })?;

        let rows: serde_json::Value = row
            .try_get("rows")
            .map_err(|e| StoreError::Execution(format!("result decode failed: {}", e)))?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_is_lazy_and_accepts_valid_url() {
        // No server is running here; connect_lazy must still succeed.
        let store = PgLogStore::connect("postgres://user:pw@localhost:5432/nutrition", 5);
        assert!(store.is_ok());
    }

    #[test]
    fn test_connect_rejects_malformed_url() {
        let store = PgLogStore::connect("not-a-database-url", 5);
        assert!(store.is_err());
    }
}
