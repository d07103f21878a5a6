#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and spatial query definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the `PostGIS` `cycle_parking` table. They are distinct from the wire
//! types in `cycle_parking_models` and the request types in
//! `cycle_parking_server_models`.

use chrono::NaiveDate;
use cycle_parking_models::{
    FeatureId, GeoPoint, ModelError, ParkingAmenities, ParkingLocation, is_valid_latitude,
    is_valid_longitude,
};
use geo::{Intersects, Point, Rect, coord};
use serde::{Deserialize, Serialize};

/// Maximum rows returned for a bounding box query.
pub const DEFAULT_BBOX_LIMIT: u32 = 2000;

/// Maximum rows returned for a nearest-neighbour query.
pub const DEFAULT_NEAREST_LIMIT: u32 = 100;

/// Maximum rows returned when no spatial filter is given.
pub const DEFAULT_ANY_LIMIT: u32 = 100;

/// Rejected geographic query input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    /// Bounds did not contain exactly four values.
    #[error("bounds must have 4 comma-separated values, got {0}")]
    BoundsArity(usize),

    /// A value could not be parsed as a number.
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// Longitude is not finite or outside [-180, 180].
    #[error("longitude {0} is out of range")]
    Longitude(f64),

    /// Latitude is not finite or outside [-90, 90].
    #[error("latitude {0} is out of range")]
    Latitude(f64),

    /// The southern edge lies north of the northern edge.
    #[error("south edge {south} is north of north edge {north}")]
    InvertedLatitude {
        /// Southern edge.
        south: f64,
        /// Northern edge.
        north: f64,
    },

    /// The western edge lies east of the eastern edge.
    #[error("west edge {west} is east of east edge {east}")]
    InvertedLongitude {
        /// Western edge.
        west: f64,
        /// Eastern edge.
        east: f64,
    },

    /// Only one of `lat`/`lon` was supplied.
    #[error("lat and lon must be supplied together")]
    IncompletePoint,
}

fn parse_number(raw: &str) -> Result<f64, InvalidInput> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| InvalidInput::NotANumber(trimmed.to_string()))
}

fn check_longitude(value: f64) -> Result<f64, InvalidInput> {
    if is_valid_longitude(value) {
        Ok(value)
    } else {
        Err(InvalidInput::Longitude(value))
    }
}

fn check_latitude(value: f64) -> Result<f64, InvalidInput> {
    if is_valid_latitude(value) {
        Ok(value)
    } else {
        Err(InvalidInput::Latitude(value))
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its edges, validating them.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if any edge is out of range or the box is
    /// inverted.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, InvalidInput> {
        let west = check_longitude(west)?;
        let east = check_longitude(east)?;
        let south = check_latitude(south)?;
        let north = check_latitude(north)?;

        if south > north {
            return Err(InvalidInput::InvertedLatitude { south, north });
        }
        if west > east {
            return Err(InvalidInput::InvertedLongitude { west, east });
        }

        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Parses `"swLng,swLat,neLng,neLat"`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the string does not hold exactly four
    /// numbers describing a valid box.
    pub fn parse(s: &str) -> Result<Self, InvalidInput> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(InvalidInput::BoundsArity(parts.len()));
        }

        let values = parts
            .into_iter()
            .map(parse_number)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Whether the point lies inside or on the edge of this box.
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let rect = Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        );
        rect.intersects(&Point::new(point.longitude, point.latitude))
    }

    /// Formats the box the way the `bounds` query parameter expects.
    #[must_use]
    pub fn to_query_value(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Parses a `lat`/`lon` pair into a point.
///
/// # Errors
///
/// Returns [`InvalidInput`] if either value is not a number or is out of
/// range.
pub fn parse_point(lat: &str, lon: &str) -> Result<GeoPoint, InvalidInput> {
    let latitude = check_latitude(parse_number(lat)?)?;
    let longitude = check_longitude(parse_number(lon)?)?;

    Ok(GeoPoint {
        longitude,
        latitude,
    })
}

/// A spatial query against the `cycle_parking` table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParkingQuery {
    /// Locations intersecting a bounding box, in store order.
    Within {
        /// Area to search.
        bbox: BoundingBox,
        /// Row cap.
        limit: u32,
    },
    /// Locations nearest to a point, closest first.
    Nearest {
        /// Reference point.
        point: GeoPoint,
        /// Row cap.
        limit: u32,
    },
    /// The first rows of the table, with no spatial filter.
    Any {
        /// Row cap.
        limit: u32,
    },
}

impl ParkingQuery {
    /// Row cap for this query.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        match self {
            Self::Within { limit, .. } | Self::Nearest { limit, .. } | Self::Any { limit } => {
                *limit
            }
        }
    }

    /// Whether rows should carry amenity flags and the survey date.
    #[must_use]
    pub const fn includes_details(&self) -> bool {
        matches!(self, Self::Within { .. })
    }
}

/// A `cycle_parking` row as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingRow {
    /// Dataset feature identifier.
    pub feature_id: String,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Borough name.
    pub borough: Option<String>,
    /// Parking capacity (`prk_cpt`).
    pub capacity: Option<i32>,
    /// First survey photo URL.
    pub photo_url: Option<String>,
    /// Amenity flags, when selected.
    pub amenities: Option<ParkingAmenities>,
    /// Survey date as `YYYY-MM-DD` text, when selected.
    pub last_surveyed: Option<String>,
}

impl ParkingRow {
    /// Converts the row into the shared [`ParkingLocation`] entity.
    ///
    /// Negative capacities are clamped to zero and unparsable survey dates
    /// are dropped. Empty photo URLs are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingFeatureId`] if the identifier is blank,
    /// or [`ModelError::InvalidCoordinates`] if the stored point is not a
    /// valid longitude/latitude pair.
    pub fn into_location(self) -> Result<ParkingLocation, ModelError> {
        if self.feature_id.trim().is_empty() {
            return Err(ModelError::MissingFeatureId);
        }
        let coordinates = GeoPoint::new(self.longitude, self.latitude)?;

        Ok(ParkingLocation {
            feature_id: FeatureId::new(self.feature_id),
            coordinates,
            borough: self.borough.unwrap_or_default(),
            capacity: self
                .capacity
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(0),
            photo_url: self.photo_url.filter(|url| !url.is_empty()),
            amenities: self.amenities,
            last_surveyed: self
                .last_surveyed
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        })
    }
}
