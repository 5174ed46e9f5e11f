//! Scripted [`Store`] double for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use switchy_database::{DatabaseValue, Row};

use crate::DbError;
use crate::store::Store;

/// How the store answers a statement.
#[derive(Clone)]
pub enum Reply {
    /// Return these rows.
    Rows(Vec<Row>),
    /// Fail the way the driver does, with this message.
    Fail(&'static str),
    /// Never answer within any test deadline.
    Hang,
}

/// Answers each statement with the reply of the first rule whose pattern
/// appears in the SQL, and records every call.
#[derive(Default)]
pub struct ScriptedStore {
    rules: Vec<(&'static str, Reply)>,
    calls: Mutex<Vec<(String, Vec<DatabaseValue>)>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, pattern: &'static str, reply: Reply) -> Self {
        self.rules.push((pattern, reply));
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<DatabaseValue>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for ScriptedStore {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<Vec<Row>, DbError> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        let reply = self
            .rules
            .iter()
            .find(|(pattern, _)| sql.contains(pattern))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(DbError::Database {
                message: message.to_string(),
            }),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
            None => Err(DbError::Database {
                message: format!("no scripted reply for: {sql}"),
            }),
        }
    }
}

/// Builds a row from `(column, value)` pairs.
pub fn row(columns: Vec<(&str, DatabaseValue)>) -> Row {
    Row {
        columns: columns
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    }
}

/// Parses `YYYY-MM-DD HH:MM:SS` into a [`DatabaseValue::DateTime`].
pub fn ts(value: &str) -> DatabaseValue {
    DatabaseValue::DateTime(NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap())
}

pub fn text(value: &str) -> DatabaseValue {
    DatabaseValue::String(value.to_string())
}
