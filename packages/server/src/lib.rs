#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the ICE tracker.
//!
//! Serves read-only JSON endpoints over the `TimescaleDB` enforcement
//! schema: record listings for arrests, detentions, and removals, windowed
//! national and per-state aggregates, and a health report. All query
//! logic lives in `ice_tracker_database`; this crate only parses requests
//! and maps results to HTTP responses.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use ice_tracker_database::db;
use ice_tracker_database::store::{DatabaseStore, Store};

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Store every handler queries.
    pub store: Arc<dyn Store>,
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index)).service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health))
            .route("/arrests", web::get().to(handlers::arrests))
            .route("/detentions", web::get().to(handlers::detentions))
            .route("/removals", web::get().to(handlers::removals))
            .route(
                "/aggregates/national",
                web::get().to(handlers::national_aggregate),
            )
            .route(
                "/aggregates/state/{state}",
                web::get().to(handlers::state_aggregate),
            ),
    );
}

/// Starts the ICE tracker API server.
///
/// Reads [`ServerConfig`] from the environment, connects to the database,
/// and serves until shut down. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the database connection fails,
/// or if the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();

    log::info!("Starting ICE Tracker API server");
    log::info!("Connecting to database at {}...", config.database.display_target());
    let db_conn = db::connect(&config.database)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {e}")))?;

    let state = web::Data::new(AppState {
        store: Arc::new(DatabaseStore::from(db_conn)),
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
