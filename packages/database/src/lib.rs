#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `PostGIS` connection pool, spatial queries, and migrations for cycle
//! parking.
//!
//! Uses `switchy_database` for connections and `switchy_schema` for
//! embedded SQL migrations. Spatial queries use raw SQL via
//! `query_raw_params()` so `PostGIS` operators (`&&`, `<->`) reach the
//! spatial index directly.

pub mod db;
pub mod memory;
pub mod pool;
pub mod queries;

use cycle_parking_database_models::{ParkingQuery, ParkingRow};
use include_dir::{Dir, include_dir};
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

pub use memory::MemoryStore;
pub use pool::{ConnectionPool, PoolError, PooledConnection};
pub use queries::PostgisStore;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// Connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// A read-only source of parking locations.
///
/// Each pooled connection is one store; implementations are not expected
/// to be shared across concurrent requests.
#[async_trait::async_trait]
pub trait ParkingStore: Send + Sync {
    /// Runs a spatial query and returns the matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the underlying query fails.
    async fn query_parking(&self, query: &ParkingQuery) -> Result<Vec<ParkingRow>, DbError>;
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}
