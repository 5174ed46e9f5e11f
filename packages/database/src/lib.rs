#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Read-only query layer over the ICE activity `TimescaleDB` schema.
//!
//! Listing queries are composed with [`query_builder::QueryBuilder`], which
//! binds every filter value as a `$n` parameter and hands the statement to
//! `switchy_database` via `query_raw_params()`. All operations take an
//! explicit [`store::Store`] handle so callers decide which connection (or
//! test double) backs them.

pub mod aggregates;
pub mod db;
pub mod health;
pub mod query_builder;
pub mod queries;
pub mod store;

#[cfg(test)]
pub(crate) mod test_store;

use std::time::Duration;

/// Upper bound on a listing query or on the whole aggregate request.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the connectivity check.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The store rejected or failed a statement.
    #[error("Database error: {message}")]
    Database {
        /// Driver error text.
        message: String,
    },

    /// Connection could not be established or was lost.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// The operation did not finish before its deadline.
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// What was being executed.
        operation: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl DbError {
    /// Short machine-readable label for the failure class.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Database { .. } => "query_failed",
            Self::Connection { .. } => "connection_failed",
            Self::Timeout { .. } => "timeout",
            Self::Conversion { .. } => "decode_failed",
        }
    }

    /// Reclassifies a failed connectivity round-trip as the store being
    /// unreachable. Timeouts keep their own category.
    #[must_use]
    pub fn into_unreachable(self) -> Self {
        match self {
            Self::Database { message } | Self::Conversion { message } => {
                Self::Connection { message }
            }
            other => other,
        }
    }
}

impl From<switchy_database::DatabaseError> for DbError {
    fn from(e: switchy_database::DatabaseError) -> Self {
        Self::Database {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_operation() {
        let err = DbError::Timeout {
            operation: "arrests listing".to_string(),
            timeout: QUERY_TIMEOUT,
        };
        assert_eq!(err.to_string(), "arrests listing timed out after 10s");
        assert_eq!(err.category(), "timeout");
    }

    #[test]
    fn query_failure_category() {
        let err = DbError::Database {
            message: "relation \"arrests\" does not exist".to_string(),
        };
        assert_eq!(err.category(), "query_failed");
        assert_eq!(
            err.to_string(),
            "Database error: relation \"arrests\" does not exist"
        );
    }

    #[test]
    fn failed_round_trip_becomes_unreachable() {
        let err = DbError::Database {
            message: "connection refused".to_string(),
        }
        .into_unreachable();
        assert_eq!(err.category(), "connection_failed");
        assert_eq!(err.to_string(), "Connection error: connection refused");

        let timeout = DbError::Timeout {
            operation: "database ping".to_string(),
            timeout: PING_TIMEOUT,
        }
        .into_unreachable();
        assert_eq!(timeout.category(), "timeout");
    }

    #[test]
    fn conversion_category() {
        let err = DbError::Conversion {
            message: "missing column id".to_string(),
        };
        assert_eq!(err.category(), "decode_failed");
    }
}
