#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Viewport-driven parking data synchronization for the map client.
//!
//! The map reports a [`Viewport`] every time a pan or zoom settles.
//! [`ViewportSync`] turns that into at most one request to the parking API
//! and merges the answer into an [`AccumulatedFeatureSet`], a growing,
//! de-duplicated cache of every location seen during the session. Markers
//! are rendered from that set by the presentation layer.
//!
//! [`RecenterController`] handles the "follow me" behaviour: after a
//! manual pan the map waits a fixed delay before snapping back to the
//! user's live location, and any further pan restarts the wait.

pub mod feature_set;
pub mod fetcher;
pub mod recenter;
pub mod selection;
pub mod sync;

use cycle_parking_database_models::BoundingBox;

pub use feature_set::AccumulatedFeatureSet;
pub use fetcher::{FetchError, HttpParkingClient, ParkingFetcher};
pub use recenter::{
    RECENTER_DELAY, RecenterController, RecenterState, RecenterTimer, RecenterTransition,
};
pub use selection::{ParkingDetails, Selection};
pub use sync::{FetchTicket, MIN_FETCH_ZOOM, SettleDecision, SyncOutcome, ViewportSync};

/// The visible map area after a pan or zoom settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible extent, southwest to northeast.
    pub bounds: BoundingBox,
    /// Current zoom level.
    pub zoom: f64,
}
