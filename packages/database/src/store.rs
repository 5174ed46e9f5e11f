//! The storage capability every query operation runs against.
//!
//! Operations never reach for a process-wide connection; they receive a
//! `&dyn Store`. [`DatabaseStore`] adapts a `switchy_database` connection,
//! and tests substitute scripted stores.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use switchy_database::{Database, DatabaseValue, Row};
use tokio::time::Instant;

use crate::DbError;

/// A read-only handle to the relational store.
///
/// Result sets are returned fully materialized, so no cursor outlives the
/// call regardless of how the caller exits.
#[async_trait]
pub trait Store: Send + Sync {
    /// Executes a parameterized statement and returns every row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails.
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, DbError>;

    /// Round-trips a trivial statement to confirm the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the store does not answer.
    async fn ping(&self) -> Result<(), DbError> {
        self.query("SELECT 1", &[])
            .await
            .map(|_| ())
            .map_err(DbError::into_unreachable)
    }
}

/// [`Store`] backed by a `switchy_database` connection.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Arc<dyn Database>,
}

impl DatabaseStore {
    /// Wraps a shared connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

impl From<Box<dyn Database>> for DatabaseStore {
    fn from(db: Box<dyn Database>) -> Self {
        Self::new(Arc::from(db))
    }
}

#[async_trait]
impl Store for DatabaseStore {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, DbError> {
        log::trace!("query: {sql} ({} params)", params.len());
        Ok(self.db.query_raw_params(sql, params).await?)
    }
}

/// Runs `fut`, failing with [`DbError::Timeout`] if it takes longer than
/// `timeout`.
///
/// # Errors
///
/// Returns the future's own error, or [`DbError::Timeout`].
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, fut: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, DbError>> + Send,
{
    with_deadline(operation, Instant::now() + timeout, timeout, fut).await
}

/// Runs `fut`, failing with [`DbError::Timeout`] once `deadline` passes.
///
/// `budget` is the full allowance the deadline was derived from and is
/// only used for the error message.
///
/// # Errors
///
/// Returns the future's own error, or [`DbError::Timeout`].
pub async fn with_deadline<T, F>(
    operation: &str,
    deadline: Instant,
    budget: Duration,
    fut: F,
) -> Result<T, DbError>
where
    F: Future<Output = Result<T, DbError>> + Send,
{
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| DbError::Timeout {
            operation: operation.to_string(),
            timeout: budget,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store::{Reply, ScriptedStore};

    #[tokio::test]
    async fn default_ping_issues_select_one() {
        let store = ScriptedStore::new().on("SELECT 1", Reply::Rows(vec![]));
        store.ping().await.unwrap();
        assert_eq!(store.calls()[0].0, "SELECT 1");
    }

    #[tokio::test]
    async fn failed_ping_is_connection_error() {
        let store = ScriptedStore::new().on("SELECT 1", Reply::Fail("refused"));
        let err = store.ping().await.unwrap_err();
        assert_eq!(err.category(), "connection_failed");
        assert_eq!(err.to_string(), "Connection error: refused");
    }

    #[tokio::test]
    async fn failed_query_is_query_error() {
        let store = ScriptedStore::new().on("SELECT 1", Reply::Fail("refused"));
        let err = store.query("SELECT 1", &[]).await.unwrap_err();
        assert_eq!(err.category(), "query_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_future_times_out() {
        let result: Result<(), DbError> = with_timeout("slow query", Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        match result {
            Err(DbError::Timeout { operation, timeout }) => {
                assert_eq!(operation, "slow query");
                assert_eq!(timeout, Duration::from_secs(5));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fast_future_passes_through() {
        let value = with_timeout("fast", Duration::from_secs(5), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
