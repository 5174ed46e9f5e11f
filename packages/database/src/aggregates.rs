//! Windowed totals across the fact tables.
//!
//! Each figure comes from its own statement. The three statements run
//! concurrently under one shared deadline, and a figure whose statement
//! fails or times out is reported as `0` without affecting the others.

use ice_tracker_database_models::{AggregateResult, DateRange, JurisdictionScope};
use moosicbox_json_utils::database::ToValue as _;
use tokio::time::Instant;

use crate::query_builder::{
    BuiltQuery, FactTable, JURISDICTION_COLUMN, QueryBuilder, TIMESTAMP_COLUMN,
};
use crate::store::{Store, with_deadline};
use crate::{DbError, QUERY_TIMEOUT};

/// How a figure folds its table's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// `SUM(column)`
    Sum,
    /// `AVG(column)`, truncated to an integer.
    Average,
}

/// One aggregate figure: a fold over one column of one fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Figure {
    /// Table the rows come from.
    pub table: FactTable,
    /// Column being folded.
    pub column: &'static str,
    /// Fold applied to the column.
    pub fold: Fold,
}

/// Sum of `arrests.arrest_count`.
pub const TOTAL_ARRESTS: Figure = Figure {
    table: FactTable::Arrests,
    column: "arrest_count",
    fold: Fold::Sum,
};

/// Average of `detentions.detained_count`.
///
/// Detention counts are point-in-time population snapshots, so summing
/// them over a window would count the same people many times.
pub const TOTAL_DETENTIONS: Figure = Figure {
    table: FactTable::Detentions,
    column: "detained_count",
    fold: Fold::Average,
};

/// Sum of `removals.removal_count`.
pub const TOTAL_REMOVALS: Figure = Figure {
    table: FactTable::Removals,
    column: "removal_count",
    fold: Fold::Sum,
};

impl Figure {
    fn select(self) -> String {
        let expr = match self.fold {
            Fold::Sum => format!("CAST(COALESCE(SUM({}), 0) AS BIGINT)", self.column),
            Fold::Average => format!(
                "CAST(COALESCE(AVG({}), 0) AS DOUBLE PRECISION)",
                self.column
            ),
        };
        format!("SELECT {expr} AS value FROM {} WHERE 1=1", self.table)
    }

    /// Builds the statement for this figure over `scope` and `range`.
    #[must_use]
    pub fn query(self, scope: &JurisdictionScope, range: &DateRange) -> BuiltQuery {
        let builder = QueryBuilder::new(self.select());
        let builder = match scope {
            JurisdictionScope::All => builder,
            JurisdictionScope::Jurisdiction(code) => builder.and_matches(JURISDICTION_COLUMN, code),
        };

        builder
            .and_at_least(TIMESTAMP_COLUMN, Some(range.start_bound()))
            .and_at_most(TIMESTAMP_COLUMN, Some(range.end_bound()))
            .build()
    }

    /// Decodes the single `value` column of the result.
    ///
    /// No rows, or a `NULL` value, is `0`.
    #[allow(clippy::cast_possible_truncation)]
    fn decode(self, rows: &[switchy_database::Row]) -> Result<i64, DbError> {
        let Some(row) = rows.first() else {
            return Ok(0);
        };

        Ok(match self.fold {
            Fold::Sum => row
                .to_value::<Option<i64>>("value")
                .map_err(|e| self.conversion_error(e))?
                .unwrap_or(0),
            Fold::Average => row
                .to_value::<Option<f64>>("value")
                .map_err(|e| self.conversion_error(e))?
                .map_or(0, |avg| avg.trunc() as i64),
        })
    }

    fn conversion_error(self, e: impl std::fmt::Display) -> DbError {
        DbError::Conversion {
            message: format!("{} {}: {e}", self.table, self.column),
        }
    }

    /// Computes this figure, failing on any storage or decode error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails, decodes badly, or
    /// `deadline` passes.
    pub async fn compute(
        self,
        store: &dyn Store,
        scope: &JurisdictionScope,
        range: &DateRange,
        deadline: Instant,
    ) -> Result<i64, DbError> {
        let query = self.query(scope, range);
        let operation = format!("{} aggregate", self.table);

        let rows = with_deadline(
            &operation,
            deadline,
            QUERY_TIMEOUT,
            store.query(&query.sql, &query.params),
        )
        .await?;

        self.decode(&rows)
    }

    /// Computes this figure, reporting `0` on any failure.
    pub async fn compute_or_zero(
        self,
        store: &dyn Store,
        scope: &JurisdictionScope,
        range: &DateRange,
        deadline: Instant,
    ) -> i64 {
        match self.compute(store, scope, range, deadline).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "{} {} for {} unavailable, reporting 0: {e}",
                    self.table,
                    self.column,
                    scope.label()
                );
                0
            }
        }
    }
}

/// Computes arrest, detention, and removal totals for `scope` over
/// `range`.
///
/// Never fails: each total whose statement fails is reported as `0`.
pub async fn compute_aggregate(
    store: &dyn Store,
    scope: &JurisdictionScope,
    range: DateRange,
) -> AggregateResult {
    let deadline = Instant::now() + QUERY_TIMEOUT;

    let (total_arrests, total_detentions, total_removals) = tokio::join!(
        TOTAL_ARRESTS.compute_or_zero(store, scope, &range, deadline),
        TOTAL_DETENTIONS.compute_or_zero(store, scope, &range, deadline),
        TOTAL_REMOVALS.compute_or_zero(store, scope, &range, deadline),
    );

    AggregateResult {
        total_arrests,
        total_detentions,
        total_removals,
        period: scope.label().to_string(),
        start_date: range.start,
        end_date: range.end,
    }
}

/// Computes the national aggregate over `range`.
pub async fn national_aggregate(store: &dyn Store, range: DateRange) -> AggregateResult {
    compute_aggregate(store, &JurisdictionScope::All, range).await
}

/// Computes the aggregate for one jurisdiction over `range`.
///
/// The code is used as given, so the reported `period` always matches the
/// filter that was applied.
pub async fn jurisdiction_aggregate(
    store: &dyn Store,
    jurisdiction: &str,
    range: DateRange,
) -> AggregateResult {
    let scope = JurisdictionScope::Jurisdiction(jurisdiction.to_string());
    compute_aggregate(store, &scope, range).await
}
