//! Parameterized `SELECT` composition for the fact tables.
//!
//! Filter values are always bound as `$n` parameters, never spliced into
//! the statement text. The builder owns the parameter list, so the next
//! placeholder index is always `params.len() + 1` and cannot drift from
//! the number of predicates already appended.

use chrono::NaiveDateTime;
use ice_tracker_database_models::{RecordFilter, end_of_day, start_of_day};
use strum_macros::Display;
use switchy_database::DatabaseValue;

/// Column holding the jurisdiction code in every fact table.
pub const JURISDICTION_COLUMN: &str = "state";

/// Column holding the event time in every fact table.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Column holding the facility identifier in `detentions`.
pub const FACILITY_COLUMN: &str = "facility_id";

/// One of the time-series tables holding enforcement events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FactTable {
    /// `arrests`
    Arrests,
    /// `detentions`
    Detentions,
    /// `removals`
    Removals,
}

impl FactTable {
    /// Column list selected when listing records.
    ///
    /// `avg_daily_population` is `NUMERIC` in the store and is cast so it
    /// decodes as a float.
    #[must_use]
    pub const fn columns(self) -> &'static str {
        match self {
            Self::Arrests => {
                "id, timestamp, state, county, city, \
                 arrest_count, criminal_arrests, non_criminal_arrests, \
                 data_source, source_url, created_at"
            }
            Self::Detentions => {
                "id, timestamp, facility_name, facility_id, state, city, \
                 detained_count, capacity, \
                 CAST(avg_daily_population AS DOUBLE PRECISION) AS avg_daily_population, \
                 facility_type, data_source, created_at"
            }
            Self::Removals => {
                "id, timestamp, state, removal_count, country_of_citizenship, \
                 removal_type, data_source, created_at"
            }
        }
    }

    /// Whether the table carries a facility identifier.
    #[must_use]
    pub const fn has_facility(self) -> bool {
        matches!(self, Self::Detentions)
    }

    /// `SELECT <columns> FROM <table> WHERE 1=1`, ready for predicates.
    #[must_use]
    pub fn base_select(self) -> String {
        format!("SELECT {} FROM {self} WHERE 1=1", self.columns())
    }
}

/// A statement and its positional parameters.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    /// Statement text with `$1..$n` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<DatabaseValue>,
}

/// Appends predicates to a base statement, binding each value.
///
/// The base statement must already end in a `WHERE` clause (e.g.
/// `WHERE 1=1`) so every predicate can be appended with `AND`.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    sql: String,
    params: Vec<DatabaseValue>,
}

impl QueryBuilder {
    /// Starts from `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            sql: base.into(),
            params: Vec::new(),
        }
    }

    /// Index the next bound value will receive.
    #[must_use]
    pub fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }

    fn bind(&mut self, value: DatabaseValue) -> usize {
        let idx = self.next_placeholder();
        self.params.push(value);
        idx
    }

    fn push_predicate(&mut self, column: &'static str, op: &str, value: DatabaseValue) {
        let idx = self.bind(value);
        self.sql.push_str(&format!(" AND {column} {op} ${idx}"));
    }

    /// `AND column = $n` when `value` is present and not blank.
    #[must_use]
    pub fn and_eq(self, column: &'static str, value: Option<&str>) -> Self {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(value) => self.and_matches(column, value),
            None => self,
        }
    }

    /// `AND column = $n`, binding `value` as given.
    #[must_use]
    pub fn and_matches(mut self, column: &'static str, value: &str) -> Self {
        self.push_predicate(column, "=", DatabaseValue::String(value.to_string()));
        self
    }

    /// `AND column >= $n` when `value` is present.
    #[must_use]
    pub fn and_at_least(mut self, column: &'static str, value: Option<NaiveDateTime>) -> Self {
        if let Some(value) = value {
            self.push_predicate(column, ">=", DatabaseValue::DateTime(value));
        }
        self
    }

    /// `AND column <= $n` when `value` is present.
    #[must_use]
    pub fn and_at_most(mut self, column: &'static str, value: Option<NaiveDateTime>) -> Self {
        if let Some(value) = value {
            self.push_predicate(column, "<=", DatabaseValue::DateTime(value));
        }
        self
    }

    /// `ORDER BY column DESC`.
    #[must_use]
    pub fn order_by_desc(mut self, column: &'static str) -> Self {
        self.sql.push_str(&format!(" ORDER BY {column} DESC"));
        self
    }

    /// `LIMIT $n`.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        let idx = self.bind(DatabaseValue::Int64(i64::from(limit)));
        self.sql.push_str(&format!(" LIMIT ${idx}"));
        self
    }

    /// Finishes the statement.
    #[must_use]
    pub fn build(self) -> BuiltQuery {
        BuiltQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Builds the listing statement for `table` from `filter`.
///
/// Predicates are appended in a fixed order (jurisdiction, facility,
/// start, end) followed by newest-first ordering and the row limit. The
/// facility filter is ignored for tables without a facility column.
#[must_use]
pub fn listing_query(table: FactTable, filter: &RecordFilter) -> BuiltQuery {
    let facility = if table.has_facility() {
        filter.facility_id.as_deref()
    } else {
        if filter.facility_id.is_some() {
            log::debug!("Ignoring facility_id filter for {table}");
        }
        None
    };

    QueryBuilder::new(table.base_select())
        .and_eq(JURISDICTION_COLUMN, filter.jurisdiction.as_deref())
        .and_eq(FACILITY_COLUMN, facility)
        .and_at_least(TIMESTAMP_COLUMN, filter.start_date.map(start_of_day))
        .and_at_most(TIMESTAMP_COLUMN, filter.end_date.map(end_of_day))
        .order_by_desc(TIMESTAMP_COLUMN)
        .limit(filter.limit)
        .build()
}
