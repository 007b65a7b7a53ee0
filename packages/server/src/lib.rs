#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the safety map application.
//!
//! Serves the REST API for geofence checks, zone management, area safety
//! scores, and review submission. All state lives behind the injected
//! [`Storage`] implementation plus an in-memory R-tree spatial index that
//! is rebuilt from storage at startup. Baseline area data is seeded from a
//! JSON file (`SEED_AREAS`, default `data/areas.json`) on boot.

mod handlers;
pub mod seed;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use safety_map_geofence::ZoneMatcher;
use safety_map_reviews::ReviewIngestor;
use safety_map_spatial::SpatialIndex;
use safety_map_storage::{MemoryStorage, Storage};

/// Shared application state.
pub struct AppState {
    /// Backing store for zones, areas, and reviews.
    pub storage: Arc<dyn Storage>,
    /// Shared R-tree index over zone polygons and area locations.
    pub spatial: Arc<SpatialIndex>,
    /// Point-in-zone matching and zone management.
    pub matcher: ZoneMatcher,
    /// Review validation, area resolution, and aggregate recompute.
    pub ingestor: ReviewIngestor,
}

impl AppState {
    /// Builds the full component graph over a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, spatial: Arc<SpatialIndex>) -> Self {
        let matcher = ZoneMatcher::new(Arc::clone(&storage), Arc::clone(&spatial));
        let ingestor = ReviewIngestor::new(Arc::clone(&storage));
        Self {
            storage,
            spatial,
            matcher,
            ingestor,
        }
    }
}

/// Starts the safety map API server.
///
/// Opens the in-memory store, seeds baseline areas from the `SEED_AREAS`
/// JSON file when it exists, rebuilds the spatial index, and starts the
/// Actix-Web HTTP server. This is a regular async function — the caller is
/// responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the seed file exists but cannot be read or applied, or if the
/// persisted zones cannot be loaded into the spatial index.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let spatial = Arc::new(SpatialIndex::new());

    let seed_path = std::env::var("SEED_AREAS").unwrap_or_else(|_| "data/areas.json".to_string());
    if Path::new(&seed_path).exists() {
        log::info!("Seeding baseline areas from {seed_path}...");
        let seeded = seed::apply(Path::new(&seed_path), storage.as_ref(), &spatial)
            .await
            .expect("Failed to seed baseline areas");
        log::info!("Seeded {seeded} baseline areas");
    } else {
        log::info!("No seed file at {seed_path}; starting with an empty area set");
    }

    let state = AppState::new(storage, spatial);
    state
        .matcher
        .load_index()
        .await
        .expect("Failed to load zones into spatial index");

    let state = web::Data::new(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/geo/check", web::post().to(handlers::check_point))
                    .route("/geo/zones", web::get().to(handlers::list_zones))
                    .route("/geo/zones", web::post().to(handlers::create_zone))
                    .route("/safety-scores", web::get().to(handlers::list_areas))
                    .route("/safety-scores/nearby", web::get().to(handlers::nearby_areas))
                    .route("/safety-scores/search", web::get().to(handlers::search_areas))
                    .route("/reviews", web::get().to(handlers::list_reviews))
                    .route("/reviews", web::post().to(handlers::submit_review)),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
