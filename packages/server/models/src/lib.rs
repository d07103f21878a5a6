#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the cycle parking server.
//!
//! These types are serialized to JSON for the REST API. Parking locations
//! themselves are returned as `GeoJSON` and live in `cycle_parking_models`.

use cycle_parking_database_models::{
    BoundingBox, DEFAULT_ANY_LIMIT, DEFAULT_BBOX_LIMIT, DEFAULT_NEAREST_LIMIT, InvalidInput,
    ParkingQuery, parse_point,
};
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /api/parking`.
///
/// Values are kept as raw strings so malformed numbers are reported as a
/// bad request instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParkingQueryParams {
    /// Bounding box as `swLng,swLat,neLng,neLat`.
    pub bounds: Option<String>,
    /// Latitude of the reference point.
    pub lat: Option<String>,
    /// Longitude of the reference point.
    pub lon: Option<String>,
}

/// Row caps applied per query mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkingLimits {
    /// Cap for bounding box queries.
    pub within: u32,
    /// Cap for nearest-neighbour queries.
    pub nearest: u32,
    /// Cap for unfiltered queries.
    pub any: u32,
}

impl Default for ParkingLimits {
    fn default() -> Self {
        Self {
            within: DEFAULT_BBOX_LIMIT,
            nearest: DEFAULT_NEAREST_LIMIT,
            any: DEFAULT_ANY_LIMIT,
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl ParkingQueryParams {
    /// Resolves the parameters into a store query.
    ///
    /// `bounds` takes precedence over `lat`/`lon`. Blank values count as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if a supplied value is malformed or only one
    /// of `lat`/`lon` is present.
    pub fn to_query(&self, limits: &ParkingLimits) -> Result<ParkingQuery, InvalidInput> {
        if let Some(bounds) = non_blank(self.bounds.as_ref()) {
            return Ok(ParkingQuery::Within {
                bbox: BoundingBox::parse(bounds)?,
                limit: limits.within,
            });
        }

        match (non_blank(self.lat.as_ref()), non_blank(self.lon.as_ref())) {
            (Some(lat), Some(lon)) => Ok(ParkingQuery::Nearest {
                point: parse_point(lat, lon)?,
                limit: limits.nearest,
            }),
            (None, None) => Ok(ParkingQuery::Any { limit: limits.any }),
            _ => Err(InvalidInput::IncompletePoint),
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Short status text.
    pub error: String,
    /// Detail for client errors. Never set for server errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// The body of every 500 response.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            error: "Internal Server Error".to_string(),
            message: None,
        }
    }

    /// A 400 body carrying the validation failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "Bad Request".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
