//! Record listing for the fact tables.
//!
//! Statements come from [`crate::query_builder::listing_query`]. Rows that
//! fail to decode are dropped individually; a failed or timed-out
//! statement fails the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use ice_tracker_database_models::{ArrestRecord, DetentionRecord, RecordFilter, RemovalRecord};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::Row;

use crate::query_builder::{FactTable, listing_query};
use crate::store::{Store, with_timeout};
use crate::{DbError, QUERY_TIMEOUT};

/// A record type that can be decoded from one result row.
pub trait FromRow: Sized {
    /// Table the record is read from.
    const TABLE: FactTable;

    /// Decodes a row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conversion`] if a column is missing or has an
    /// incompatible type.
    fn from_row(row: &Row) -> Result<Self, DbError>;
}

fn column_error<E: std::fmt::Display>(column: &'static str) -> impl FnOnce(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("column {column}: {e}"),
    }
}

/// Reads a `TIMESTAMPTZ` column, which arrives as naive UTC.
fn utc_column(row: &Row, column: &'static str) -> Result<DateTime<Utc>, DbError> {
    let naive: NaiveDateTime = row.to_value(column).map_err(column_error(column))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

impl FromRow for ArrestRecord {
    const TABLE: FactTable = FactTable::Arrests;

    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            id: row.to_value("id").map_err(column_error("id"))?,
            timestamp: utc_column(row, "timestamp")?,
            state: row.to_value("state").map_err(column_error("state"))?,
            county: row.to_value("county").map_err(column_error("county"))?,
            city: row.to_value("city").map_err(column_error("city"))?,
            arrest_count: row.to_value("arrest_count").map_err(column_error("arrest_count"))?,
            criminal_arrests: row
                .to_value("criminal_arrests")
                .map_err(column_error("criminal_arrests"))?,
            non_criminal_arrests: row
                .to_value("non_criminal_arrests")
                .map_err(column_error("non_criminal_arrests"))?,
            data_source: row.to_value("data_source").map_err(column_error("data_source"))?,
            source_url: row.to_value("source_url").map_err(column_error("source_url"))?,
            created_at: utc_column(row, "created_at")?,
        })
    }
}

impl FromRow for DetentionRecord {
    const TABLE: FactTable = FactTable::Detentions;

    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            id: row.to_value("id").map_err(column_error("id"))?,
            timestamp: utc_column(row, "timestamp")?,
            facility_name: row
                .to_value("facility_name")
                .map_err(column_error("facility_name"))?,
            facility_id: row.to_value("facility_id").map_err(column_error("facility_id"))?,
            state: row.to_value("state").map_err(column_error("state"))?,
            city: row.to_value("city").map_err(column_error("city"))?,
            detained_count: row
                .to_value("detained_count")
                .map_err(column_error("detained_count"))?,
            capacity: row.to_value("capacity").map_err(column_error("capacity"))?,
            avg_daily_population: row
                .to_value("avg_daily_population")
                .map_err(column_error("avg_daily_population"))?,
            facility_type: row
                .to_value("facility_type")
                .map_err(column_error("facility_type"))?,
            data_source: row.to_value("data_source").map_err(column_error("data_source"))?,
            created_at: utc_column(row, "created_at")?,
        })
    }
}

impl FromRow for RemovalRecord {
    const TABLE: FactTable = FactTable::Removals;

    fn from_row(row: &Row) -> Result<Self, DbError> {
        Ok(Self {
            id: row.to_value("id").map_err(column_error("id"))?,
            timestamp: utc_column(row, "timestamp")?,
            state: row.to_value("state").map_err(column_error("state"))?,
            removal_count: row
                .to_value("removal_count")
                .map_err(column_error("removal_count"))?,
            country_of_citizenship: row
                .to_value("country_of_citizenship")
                .map_err(column_error("country_of_citizenship"))?,
            removal_type: row.to_value("removal_type").map_err(column_error("removal_type"))?,
            data_source: row.to_value("data_source").map_err(column_error("data_source"))?,
            created_at: utc_column(row, "created_at")?,
        })
    }
}

/// Decodes every row that can be decoded, logging and dropping the rest.
pub fn decode_rows<T: FromRow>(rows: &[Row]) -> Vec<T> {
    let mut records = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        match T::from_row(row) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping {} row {idx}: {e}", T::TABLE),
        }
    }

    records
}

/// Lists records of type `T` matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails or exceeds
/// [`QUERY_TIMEOUT`].
pub async fn list_records<T: FromRow>(
    store: &dyn Store,
    filter: &RecordFilter,
) -> Result<Vec<T>, DbError> {
    let query = listing_query(T::TABLE, filter);
    let operation = format!("{} listing", T::TABLE);

    let rows = with_timeout(
        &operation,
        QUERY_TIMEOUT,
        store.query(&query.sql, &query.params),
    )
    .await?;

    let records = decode_rows::<T>(&rows);
    log::debug!(
        "{operation}: {} of {} rows decoded",
        records.len(),
        rows.len()
    );

    Ok(records)
}

/// Lists arrest records matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails or times out.
pub async fn list_arrests(
    store: &dyn Store,
    filter: &RecordFilter,
) -> Result<Vec<ArrestRecord>, DbError> {
    list_records(store, filter).await
}

/// Lists detention records matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails or times out.
pub async fn list_detentions(
    store: &dyn Store,
    filter: &RecordFilter,
) -> Result<Vec<DetentionRecord>, DbError> {
    list_records(store, filter).await
}

/// Lists removal records matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails or times out.
pub async fn list_removals(
    store: &dyn Store,
    filter: &RecordFilter,
) -> Result<Vec<RemovalRecord>, DbError> {
    list_records(store, filter).await
}
