#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the cycle parking map.
//!
//! Serves `GeoJSON` parking locations from a `PostGIS` table, filtered by
//! viewport bounding box or ordered by distance from a point. Each request
//! checks one connection out of a fixed-size pool and returns it before
//! the response is sent.

pub mod config;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use cycle_parking_database::{ConnectionPool, ParkingStore, db};
use cycle_parking_server_models::ParkingLimits;

pub use config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Pool of store connections, one checked out per request.
    pub pool: Arc<ConnectionPool<Box<dyn ParkingStore>>>,
    /// Row caps per query mode.
    pub limits: ParkingLimits,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/parking", web::get().to(handlers::parking)),
    );
}

/// Starts the cycle parking API server.
///
/// Opens the connection pool (running migrations on the first
/// connection), starts the Actix-Web HTTP server, and closes the pool once
/// the server stops. The caller is responsible for initialising logging
/// and providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the database cannot be reached,
/// the HTTP server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Connecting to database ({} connections)...", config.pool_size);
    let pool = db::connect_pool_from_env(config.pool_size)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to open database pool: {e}")))?;
    let pool = Arc::new(pool);

    let state = web::Data::new(AppState {
        pool: Arc::clone(&pool),
        limits: config.limits,
    });

    log::info!(
        "Starting server on {}:{} (limits: bbox {}, nearest {}, default {})",
        config.bind_addr,
        config.port,
        config.limits.within,
        config.limits.nearest,
        config.limits.any,
    );

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await;

    log::info!("Server stopped, closing connection pool");
    pool.close();

    result
}
