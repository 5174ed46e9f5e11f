#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Enforcement record types, query filters, and health report definitions.
//!
//! These types represent the shapes of data as read from the `TimescaleDB`
//! fact tables (`arrests`, `detentions`, `removals`) and the
//! `data_source_health` table. They are request-scoped snapshots: nothing
//! here is cached or written back. The HTTP-facing parameter types live in
//! `ice_tracker_server_models`.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Row limit applied to record listings when the caller supplies none.
pub const DEFAULT_LIMIT: u32 = 100;

/// `period` label reported for aggregates spanning every jurisdiction.
pub const NATIONAL_PERIOD: &str = "national";

/// An arrest activity row from the `arrests` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrestRecord {
    /// Primary key.
    pub id: i32,
    /// When the arrests were recorded.
    pub timestamp: DateTime<Utc>,
    /// Two-letter state code.
    pub state: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Total arrests. Not checked against the criminal/non-criminal split.
    pub arrest_count: Option<i32>,
    /// Arrests of people with criminal convictions or pending charges.
    pub criminal_arrests: Option<i32>,
    /// Arrests of people without criminal history.
    pub non_criminal_arrests: Option<i32>,
    /// Name of the upstream source that published the figures.
    pub data_source: Option<String>,
    /// URL of the upstream publication.
    pub source_url: Option<String>,
    /// When the row was ingested.
    pub created_at: DateTime<Utc>,
}

/// A facility population snapshot from the `detentions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetentionRecord {
    /// Primary key.
    pub id: i32,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Facility display name.
    pub facility_name: Option<String>,
    /// Upstream facility identifier.
    pub facility_id: Option<String>,
    /// Two-letter state code.
    pub state: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Number of people detained at snapshot time.
    pub detained_count: Option<i32>,
    /// Rated facility capacity.
    pub capacity: Option<i32>,
    /// Average daily population reported for the facility.
    pub avg_daily_population: Option<f64>,
    /// Facility type (e.g. `SPC`, `IGSA`, `CDF`).
    pub facility_type: Option<String>,
    /// Name of the upstream source that published the figures.
    pub data_source: Option<String>,
    /// When the row was ingested.
    pub created_at: DateTime<Utc>,
}

/// A removal (deportation) row from the `removals` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRecord {
    /// Primary key.
    pub id: i32,
    /// When the removals were recorded.
    pub timestamp: DateTime<Utc>,
    /// Two-letter state code.
    pub state: Option<String>,
    /// Number of removals.
    pub removal_count: Option<i32>,
    /// Country of citizenship of the people removed.
    pub country_of_citizenship: Option<String>,
    /// Removal type (e.g. `removal`, `return`).
    pub removal_type: Option<String>,
    /// Name of the upstream source that published the figures.
    pub data_source: Option<String>,
    /// When the row was ingested.
    pub created_at: DateTime<Utc>,
}

/// Optional filters for listing records from a fact table.
///
/// Empty strings are treated the same as absent values by the query
/// builder, so callers can pass raw transport values straight through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Exact match on the `state` column.
    pub jurisdiction: Option<String>,
    /// Exact match on `facility_id`. Only honored for detentions.
    pub facility_id: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on `timestamp` (the whole day is included).
    pub end_date: Option<NaiveDate>,
    /// Maximum number of rows to return.
    pub limit: u32,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            jurisdiction: None,
            facility_id: None,
            start_date: None,
            end_date: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Which jurisdictions an aggregate covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JurisdictionScope {
    /// Every jurisdiction combined.
    All,
    /// A single jurisdiction code (two-letter state).
    Jurisdiction(String),
}

impl JurisdictionScope {
    /// The jurisdiction code to filter on, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Jurisdiction(code) => Some(code.as_str()),
        }
    }

    /// Label reported as the aggregate `period`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.code().unwrap_or(NATIONAL_PERIOD)
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub start: NaiveDate,
    /// Last day included.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range from explicit bounds.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The month ending on `today`: one calendar month back through today.
    ///
    /// Month arithmetic clamps to the end of shorter months, so
    /// `2024-03-31` starts on `2024-02-29`.
    #[must_use]
    pub fn trailing_month(today: NaiveDate) -> Self {
        let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
        Self::new(start, today)
    }

    /// Fills in whichever bound is missing from the trailing month ending
    /// on `today`.
    #[must_use]
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        let default = Self::trailing_month(today);
        Self::new(start.unwrap_or(default.start), end.unwrap_or(default.end))
    }

    /// First instant of the range (midnight at the start date).
    #[must_use]
    pub fn start_bound(&self) -> NaiveDateTime {
        start_of_day(self.start)
    }

    /// Last instant of the range (the final microsecond of the end date).
    #[must_use]
    pub fn end_bound(&self) -> NaiveDateTime {
        end_of_day(self.end)
    }
}

/// Midnight at the start of `date`.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// The final microsecond of `date`, so `<=` comparisons include the whole
/// day.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_else(|| start_of_day(date))
}

/// Windowed totals across the three fact tables.
///
/// Each total is computed independently; a total whose query failed is
/// reported as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Sum of `arrest_count`.
    pub total_arrests: i64,
    /// Average daily detained population, truncated to an integer.
    pub total_detentions: i64,
    /// Sum of `removal_count`.
    pub total_removals: i64,
    /// Jurisdiction code, or [`NATIONAL_PERIOD`].
    pub period: String,
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Last day of the window.
    pub end_date: NaiveDate,
}

/// Latest fetch status of one upstream data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceHealth {
    /// Unique source name.
    pub source_name: String,
    /// When the source was last fetched successfully.
    pub last_successful_fetch: Option<DateTime<Utc>>,
    /// When a fetch was last attempted.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Status label written by the collector.
    pub status: Option<String>,
    /// Error from the most recent failed attempt.
    pub error_message: Option<String>,
    /// Records fetched in the most recent run.
    pub records_fetched: Option<i32>,
}

/// Overall service verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    /// The store answered the connectivity check.
    Healthy,
    /// The store could not be reached.
    Unhealthy,
}

/// Store connectivity sub-status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHealth {
    /// Whether the connectivity check succeeded.
    pub connected: bool,
    /// Diagnostic message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Composite health document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall verdict.
    pub status: HealthStatus,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Store connectivity.
    pub database: DatabaseHealth,
    /// Latest status per upstream source. Absent when the store is
    /// unreachable or the listing failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<DataSourceHealth>>,
}

impl HealthReport {
    /// Whether the overall verdict is [`HealthStatus::Healthy`].
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
