//! Service health: store connectivity plus the latest status of each
//! upstream data source.

use chrono::{DateTime, NaiveDateTime, Utc};
use ice_tracker_database_models::{DataSourceHealth, DatabaseHealth, HealthReport, HealthStatus};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::Row;

use crate::store::{Store, with_timeout};
use crate::{DbError, PING_TIMEOUT, QUERY_TIMEOUT};

/// Maximum number of sources listed in a report.
pub const MAX_SOURCES: u32 = 10;

/// Latest row per source by creation time, ordered by source name.
const LATEST_SOURCES_SQL: &str = "SELECT DISTINCT ON (source_name)
        source_name,
        last_successful_fetch,
        last_attempt,
        status,
        error_message,
        records_fetched
    FROM data_source_health
    ORDER BY source_name, created_at DESC
    LIMIT $1";

fn optional_utc(row: &Row, column: &str) -> Result<Option<DateTime<Utc>>, DbError> {
    let naive: Option<NaiveDateTime> = row.to_value(column).map_err(|e| DbError::Conversion {
        message: format!("column {column}: {e}"),
    })?;
    Ok(naive.map(|n| DateTime::<Utc>::from_naive_utc_and_offset(n, Utc)))
}

fn row_to_source(row: &Row) -> Result<DataSourceHealth, DbError> {
    let conversion = |column: &str, e: &dyn std::fmt::Display| DbError::Conversion {
        message: format!("column {column}: {e}"),
    };

    Ok(DataSourceHealth {
        source_name: row
            .to_value("source_name")
            .map_err(|e| conversion("source_name", &e))?,
        last_successful_fetch: optional_utc(row, "last_successful_fetch")?,
        last_attempt: optional_utc(row, "last_attempt")?,
        status: row.to_value("status").map_err(|e| conversion("status", &e))?,
        error_message: row
            .to_value("error_message")
            .map_err(|e| conversion("error_message", &e))?,
        records_fetched: row
            .to_value("records_fetched")
            .map_err(|e| conversion("records_fetched", &e))?,
    })
}

/// Fetches the most recent status row of each upstream source.
///
/// Rows that fail to decode are skipped.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails or times out.
pub async fn latest_source_health(store: &dyn Store) -> Result<Vec<DataSourceHealth>, DbError> {
    let params = [switchy_database::DatabaseValue::Int64(i64::from(MAX_SOURCES))];
    let rows = with_timeout(
        "source health listing",
        QUERY_TIMEOUT,
        store.query(LATEST_SOURCES_SQL, &params),
    )
    .await?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            row_to_source(row)
                .map_err(|e| log::warn!("Skipping data_source_health row: {e}"))
                .ok()
        })
        .collect())
}

/// Builds the health report at time `now`.
///
/// A failed ping makes the report unhealthy and skips the source listing.
/// A failed source listing leaves the report healthy with no sources.
pub async fn check_health(store: &dyn Store, now: DateTime<Utc>) -> HealthReport {
    if let Err(e) = with_timeout("database ping", PING_TIMEOUT, store.ping()).await {
        log::error!("Health check failed: {e}");
        return HealthReport {
            status: HealthStatus::Unhealthy,
            timestamp: now,
            database: DatabaseHealth {
                connected: false,
                message: Some(e.to_string()),
            },
            sources: None,
        };
    }

    let sources = match latest_source_health(store).await {
        Ok(sources) => Some(sources),
        Err(e) => {
            log::warn!("Source health unavailable: {e}");
            None
        }
    };

    HealthReport {
        status: HealthStatus::Healthy,
        timestamp: now,
        database: DatabaseHealth {
            connected: true,
            message: Some("connected".to_string()),
        },
        sources,
    }
}

#[cfg(test)]
mod tests {
    use switchy_database::DatabaseValue;

    use super::*;
    use crate::test_store::{Reply, ScriptedStore, row, text, ts};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn source_row(name: &str, status: &str) -> Row {
        row(vec![
            ("source_name", text(name)),
            ("last_successful_fetch", ts("2024-06-15 02:00:00")),
            ("last_attempt", ts("2024-06-15 02:00:00")),
            ("status", text(status)),
            ("error_message", DatabaseValue::Null),
            ("records_fetched", DatabaseValue::Int32(51)),
        ])
    }

    #[tokio::test]
    async fn unreachable_store_is_unhealthy_without_sources() {
        let store = ScriptedStore::new().on("SELECT 1", Reply::Fail("connection refused"));

        let report = check_health(&store, now()).await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!report.database.connected);
        assert!(
            report
                .database
                .message
                .as_deref()
                .is_some_and(|m| m.contains("connection refused"))
        );
        assert!(report.sources.is_none());
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_ping_is_unhealthy() {
        let store = ScriptedStore::new().on("SELECT 1", Reply::Hang);

        let report = check_health(&store, now()).await;

        assert!(!report.is_healthy());
        assert_eq!(
            report.database.message.as_deref(),
            Some("database ping timed out after 5s")
        );
    }

    #[tokio::test]
    async fn healthy_with_latest_sources() {
        let store = ScriptedStore::new()
            .on("SELECT 1", Reply::Rows(vec![]))
            .on(
                "FROM data_source_health",
                Reply::Rows(vec![source_row("ohss", "success"), source_row("trac", "error")]),
            );

        let report = check_health(&store, now()).await;

        assert!(report.is_healthy());
        assert!(report.database.connected);
        assert_eq!(report.database.message.as_deref(), Some("connected"));
        let sources = report.sources.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_name, "ohss");
        assert_eq!(sources[0].records_fetched, Some(51));
        assert_eq!(sources[1].status.as_deref(), Some("error"));

        let calls = store.calls();
        assert!(calls[1].0.contains("DISTINCT ON (source_name)"));
        assert!(matches!(calls[1].1[0], DatabaseValue::Int64(10)));
    }

    #[tokio::test]
    async fn source_listing_failure_stays_healthy() {
        let store = ScriptedStore::new()
            .on("SELECT 1", Reply::Rows(vec![]))
            .on("FROM data_source_health", Reply::Fail("relation missing"));

        let report = check_health(&store, now()).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.database.connected);
        assert!(report.sources.is_none());
    }

    #[tokio::test]
    async fn malformed_source_rows_are_skipped() {
        let store = ScriptedStore::new().on(
            "FROM data_source_health",
            Reply::Rows(vec![
                source_row("ohss", "success"),
                row(vec![("status", text("success"))]),
            ]),
        );

        let sources = latest_source_health(&store).await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_name, "ohss");
    }
}
