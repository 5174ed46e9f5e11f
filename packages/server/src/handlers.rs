//! HTTP handler functions for the ICE tracker API.

use actix_web::{HttpResponse, web};
use ice_tracker_database::{DbError, aggregates, health, queries};
use ice_tracker_server_models::{
    AggregateQueryParams, ApiError, ApiIndex, ApiRecordList, ListQueryParams,
};
use serde::Serialize;

use crate::AppState;

/// Paths advertised by the index endpoint.
const ENDPOINTS: &[&str] = &[
    "/api/v1/health",
    "/api/v1/arrests",
    "/api/v1/detentions",
    "/api/v1/removals",
    "/api/v1/aggregates/national",
    "/api/v1/aggregates/state/{state}",
];

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(ApiIndex {
        name: "ICE Tracker API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: ENDPOINTS.to_vec(),
    })
}

/// `GET /api/v1/health`
///
/// Responds `503` when the store is unreachable.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let report = health::check_health(state.store.as_ref(), chrono::Utc::now()).await;
    log::debug!("Health check: {}", report.status);

    if report.is_healthy() {
        HttpResponse::Ok().json(report)
    } else {
        HttpResponse::ServiceUnavailable().json(report)
    }
}

/// `GET /api/v1/arrests`
pub async fn arrests(
    state: web::Data<AppState>,
    params: web::Query<ListQueryParams>,
) -> HttpResponse {
    let result = queries::list_arrests(state.store.as_ref(), &params.to_filter()).await;
    list_response("arrests", result)
}

/// `GET /api/v1/detentions`
pub async fn detentions(
    state: web::Data<AppState>,
    params: web::Query<ListQueryParams>,
) -> HttpResponse {
    let result = queries::list_detentions(state.store.as_ref(), &params.to_filter()).await;
    list_response("detentions", result)
}

/// `GET /api/v1/removals`
pub async fn removals(
    state: web::Data<AppState>,
    params: web::Query<ListQueryParams>,
) -> HttpResponse {
    let result = queries::list_removals(state.store.as_ref(), &params.to_filter()).await;
    list_response("removals", result)
}

/// `GET /api/v1/aggregates/national`
pub async fn national_aggregate(
    state: web::Data<AppState>,
    params: web::Query<AggregateQueryParams>,
) -> HttpResponse {
    let range = params.date_range(today());
    HttpResponse::Ok().json(aggregates::national_aggregate(state.store.as_ref(), range).await)
}

/// `GET /api/v1/aggregates/state/{state}`
pub async fn state_aggregate(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<AggregateQueryParams>,
) -> HttpResponse {
    let range = params.date_range(today());
    let jurisdiction = path.into_inner();
    HttpResponse::Ok().json(
        aggregates::jurisdiction_aggregate(state.store.as_ref(), &jurisdiction, range).await,
    )
}

/// Today's date in UTC, the zone the date bounds are bound in.
fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

fn list_response<T: Serialize>(what: &str, result: Result<Vec<T>, DbError>) -> HttpResponse {
    match result {
        Ok(records) => HttpResponse::Ok().json(ApiRecordList::from(records)),
        Err(e) => {
            log::error!("Failed to query {what}: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: format!("Failed to query {what}"),
                category: e.category().to_string(),
                detail: e.to_string(),
            })
        }
    }
}
