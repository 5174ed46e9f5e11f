#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP request parameters and response envelopes for the ICE tracker API.
//!
//! Query parameters arrive as raw strings so that a malformed date or
//! limit degrades to its default instead of rejecting the request. The
//! conversions into `ice_tracker_database_models` filter types live here.

use chrono::{DateTime, NaiveDate};
use ice_tracker_database_models::{DEFAULT_LIMIT, DateRange, RecordFilter};
use serde::{Deserialize, Serialize};

/// Query parameters for the record listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQueryParams {
    /// Jurisdiction code. `state` is accepted as an alias.
    #[serde(alias = "state")]
    pub jurisdiction: Option<String>,
    /// Facility identifier (detentions only).
    pub facility_id: Option<String>,
    /// Inclusive start date (`YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`).
    pub end_date: Option<String>,
    /// Maximum number of rows, as a positive integer.
    pub limit: Option<String>,
}

impl ListQueryParams {
    /// Converts the raw parameters into a [`RecordFilter`].
    ///
    /// Blank values are absent. Unparsable dates are treated as absent
    /// (no bound). An unparsable or zero limit falls back to
    /// [`DEFAULT_LIMIT`].
    #[must_use]
    pub fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            jurisdiction: non_blank(self.jurisdiction.as_deref()).map(str::to_string),
            facility_id: non_blank(self.facility_id.as_deref()).map(str::to_string),
            start_date: parse_date_param("start_date", self.start_date.as_deref()),
            end_date: parse_date_param("end_date", self.end_date.as_deref()),
            limit: parse_limit(self.limit.as_deref()),
        }
    }
}

/// Query parameters for the aggregate endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateQueryParams {
    /// Inclusive start date (`YYYY-MM-DD`). Defaults to one month before
    /// today.
    pub start_date: Option<String>,
    /// Inclusive end date (`YYYY-MM-DD`). Defaults to today.
    pub end_date: Option<String>,
}

impl AggregateQueryParams {
    /// Resolves the aggregate window, defaulting missing or unparsable
    /// bounds to the month ending on `today`.
    #[must_use]
    pub fn date_range(&self, today: NaiveDate) -> DateRange {
        DateRange::resolve(
            parse_date_param("start_date", self.start_date.as_deref()),
            parse_date_param("end_date", self.end_date.as_deref()),
            today,
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a calendar date from `YYYY-MM-DD`, or from the date part of an
/// RFC 3339 timestamp.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn parse_date_param(name: &str, value: Option<&str>) -> Option<NaiveDate> {
    let value = non_blank(value)?;
    let parsed = parse_date(value);
    if parsed.is_none() {
        log::warn!("Ignoring unparsable {name}: {value:?}");
    }
    parsed
}

/// Parses a positive row limit, falling back to [`DEFAULT_LIMIT`].
#[must_use]
pub fn parse_limit(value: Option<&str>) -> u32 {
    let Some(value) = non_blank(value) else {
        return DEFAULT_LIMIT;
    };

    match value.parse::<u32>() {
        Ok(limit) if limit > 0 => limit,
        _ => {
            log::warn!("Ignoring invalid limit {value:?}, using {DEFAULT_LIMIT}");
            DEFAULT_LIMIT
        }
    }
}

/// Envelope for record listings.
#[derive(Debug, Clone, Serialize)]
pub struct ApiRecordList<T> {
    /// Number of records in `data`.
    pub count: usize,
    /// The records, newest first.
    pub data: Vec<T>,
}

impl<T> From<Vec<T>> for ApiRecordList<T> {
    fn from(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

/// Error body returned when a listing fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable summary.
    pub error: String,
    /// Failure class (e.g. `timeout`, `query_failed`).
    pub category: String,
    /// Diagnostic detail from the store.
    pub detail: String,
}

/// Service index returned from `/`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiIndex {
    /// Service name.
    pub name: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Always `running`.
    pub status: &'static str,
    /// Available endpoint paths.
    pub endpoints: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_params_give_default_filter() {
        assert_eq!(ListQueryParams::default().to_filter(), RecordFilter::default());
    }

    #[test]
    fn params_convert_to_filter() {
        let params = ListQueryParams {
            jurisdiction: Some("CA".to_string()),
            facility_id: Some(" ".to_string()),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-31".to_string()),
            limit: Some("2".to_string()),
        };

        let filter = params.to_filter();

        assert_eq!(filter.jurisdiction.as_deref(), Some("CA"));
        assert_eq!(filter.facility_id, None);
        assert_eq!(filter.start_date, Some(date(2024, 1, 1)));
        assert_eq!(filter.end_date, Some(date(2024, 1, 31)));
        assert_eq!(filter.limit, 2);
    }

    #[test]
    fn unparsable_dates_are_absent() {
        let params = ListQueryParams {
            start_date: Some("last tuesday".to_string()),
            end_date: Some("2024-13-45".to_string()),
            ..ListQueryParams::default()
        };

        let filter = params.to_filter();

        assert_eq!(filter.start_date, None);
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn rfc3339_dates_use_their_date_part() {
        assert_eq!(parse_date("2024-03-05T10:00:00Z"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn invalid_limits_use_default() {
        assert_eq!(parse_limit(None), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("0")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("-5")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("lots")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("5000")), 5000);
    }

    #[test]
    fn aggregate_range_defaults_to_trailing_month() {
        let today = date(2024, 6, 15);
        let range = AggregateQueryParams::default().date_range(today);
        assert_eq!(range, DateRange::new(date(2024, 5, 15), today));

        let params = AggregateQueryParams {
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("garbage".to_string()),
        };
        let range = params.date_range(today);
        assert_eq!(range, DateRange::new(date(2024, 1, 1), today));
    }

    #[test]
    fn record_list_counts_data() {
        let list = ApiRecordList::from(vec![1, 2, 3]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["count"], 3);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
    }
}
