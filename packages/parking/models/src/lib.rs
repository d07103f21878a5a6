#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Cycle parking location types and `GeoJSON` conversions.
//!
//! This crate defines the [`ParkingLocation`] entity shared by the API
//! server and the map client, together with the amenity taxonomy used by
//! the London cycle parking dataset. Locations travel over the wire as
//! `GeoJSON` `Feature`s with camelCase properties.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value, feature::Id};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Errors raised while building or decoding parking locations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Coordinates are not finite or fall outside Earth's bounds.
    #[error("Invalid coordinates: longitude {longitude}, latitude {latitude}")]
    InvalidCoordinates {
        /// Offending longitude.
        longitude: f64,
        /// Offending latitude.
        latitude: f64,
    },

    /// The feature has no geometry.
    #[error("Feature has no geometry")]
    MissingGeometry,

    /// The feature geometry is not a point.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// The feature has no properties object.
    #[error("Feature has no properties")]
    MissingProperties,

    /// The feature identifier is missing or blank.
    #[error("Feature has no featureId")]
    MissingFeatureId,

    /// The properties object does not match the expected shape.
    #[error("Invalid feature properties: {0}")]
    Properties(#[from] serde_json::Error),
}

/// Stable identifier of a parking location, unique across the dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    /// Wraps a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A WGS84 longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees, -180 to 180.
    pub longitude: f64,
    /// Latitude in degrees, -90 to 90.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting values outside Earth's bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidCoordinates`] if either value is not
    /// finite or out of range.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ModelError> {
        if is_valid_longitude(longitude) && is_valid_latitude(latitude) {
            Ok(Self {
                longitude,
                latitude,
            })
        } else {
            Err(ModelError::InvalidCoordinates {
                longitude,
                latitude,
            })
        }
    }
}

/// Whether `value` is a finite longitude within [-180, 180].
#[must_use]
pub fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}

/// Whether `value` is a finite latitude within [-90, 90].
#[must_use]
pub fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

/// Facility features recorded by the parking survey.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Amenity {
    /// Carrier (cycle parking on a carriageway).
    Carrier,
    /// Covered from the weather.
    Covered,
    /// Secure enclosure.
    Secure,
    /// Individual cycle lockers.
    Locker,
    /// Sheffield stands.
    Sheffield,
    /// M-shaped stands.
    MStand,
    /// Post-and-ring stands.
    PostStand,
    /// Hoop stands.
    Hoop,
    /// Plain posts.
    Post,
    /// Butterfly racks.
    Butterfly,
    /// Wheel racks.
    Wheel,
    /// On-street bike hangars.
    Hangar,
    /// Two-tier racks.
    Tier,
    /// Anything else.
    Other,
}

impl Amenity {
    /// Every amenity, in column order.
    pub const ALL: &[Self] = &[
        Self::Carrier,
        Self::Covered,
        Self::Secure,
        Self::Locker,
        Self::Sheffield,
        Self::MStand,
        Self::PostStand,
        Self::Hoop,
        Self::Post,
        Self::Butterfly,
        Self::Wheel,
        Self::Hangar,
        Self::Tier,
        Self::Other,
    ];

    /// Name of the boolean column holding this flag in `cycle_parking`.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Carrier => "prk_carr",
            Self::Covered => "prk_cover",
            Self::Secure => "prk_secure",
            Self::Locker => "prk_locker",
            Self::Sheffield => "prk_sheff",
            Self::MStand => "prk_mstand",
            Self::PostStand => "prk_pstand",
            Self::Hoop => "prk_hoop",
            Self::Post => "prk_post",
            Self::Butterfly => "prk_buterf",
            Self::Wheel => "prk_wheel",
            Self::Hangar => "prk_hangar",
            Self::Tier => "prk_tier",
            Self::Other => "prk_other",
        }
    }
}

/// The set of amenities present at a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParkingAmenities(BTreeSet<Amenity>);

impl ParkingAmenities {
    /// Whether the given amenity is present.
    #[must_use]
    pub fn has(&self, amenity: Amenity) -> bool {
        self.0.contains(&amenity)
    }

    /// Marks an amenity as present.
    pub fn insert(&mut self, amenity: Amenity) {
        self.0.insert(amenity);
    }

    /// Iterates present amenities in column order.
    pub fn iter(&self) -> impl Iterator<Item = Amenity> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.has(Amenity::Covered)
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.has(Amenity::Secure)
    }

    #[must_use]
    pub fn has_locker(&self) -> bool {
        self.has(Amenity::Locker)
    }

    #[must_use]
    pub fn has_hangar(&self) -> bool {
        self.has(Amenity::Hangar)
    }
}

impl FromIterator<Amenity> for ParkingAmenities {
    fn from_iter<T: IntoIterator<Item = Amenity>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One physical cycle parking facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLocation {
    /// Dataset identifier, the de-duplication key.
    pub feature_id: FeatureId,
    /// Position of the facility.
    pub coordinates: GeoPoint,
    /// London borough name.
    pub borough: String,
    /// Number of cycle spaces.
    pub capacity: u32,
    /// Survey photo, if one was taken.
    pub photo_url: Option<String>,
    /// Amenity flags. `None` when the responding query omitted them.
    pub amenities: Option<ParkingAmenities>,
    /// Date of the last survey. `None` when omitted or never recorded.
    pub last_surveyed: Option<NaiveDate>,
}

/// Wire shape of a feature's `properties` object.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParkingProperties {
    feature_id: FeatureId,
    #[serde(default)]
    borough: String,
    #[serde(default)]
    capacity: u32,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amenities: Option<ParkingAmenities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_surveyed: Option<NaiveDate>,
}

impl ParkingLocation {
    /// Encodes this location as a `GeoJSON` point feature.
    #[must_use]
    pub fn to_feature(&self) -> Feature {
        let properties = ParkingProperties {
            feature_id: self.feature_id.clone(),
            borough: self.borough.clone(),
            capacity: self.capacity,
            photo_url: self.photo_url.clone(),
            amenities: self.amenities.clone(),
            last_surveyed: self.last_surveyed,
        };

        let properties = match serde_json::to_value(properties) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        };

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![
                self.coordinates.longitude,
                self.coordinates.latitude,
            ]))),
            id: Some(Id::String(self.feature_id.to_string())),
            properties,
            foreign_members: None,
        }
    }
}

impl TryFrom<&Feature> for ParkingLocation {
    type Error = ModelError;

    fn try_from(feature: &Feature) -> Result<Self, Self::Error> {
        let geometry = feature.geometry.as_ref().ok_or(ModelError::MissingGeometry)?;
        let coordinates = match &geometry.value {
            Value::Point(position) if position.len() >= 2 => {
                GeoPoint::new(position[0], position[1])?
            }
            Value::Point(_) => return Err(ModelError::MissingGeometry),
            other => return Err(ModelError::UnsupportedGeometry(geometry_kind(other).to_string())),
        };

        let properties: &JsonObject = feature
            .properties
            .as_ref()
            .ok_or(ModelError::MissingProperties)?;
        let properties: ParkingProperties =
            serde_json::from_value(serde_json::Value::Object(properties.clone()))?;
        if properties.feature_id.as_str().trim().is_empty() {
            return Err(ModelError::MissingFeatureId);
        }

        Ok(Self {
            feature_id: properties.feature_id,
            coordinates,
            borough: properties.borough,
            capacity: properties.capacity,
            photo_url: properties.photo_url,
            amenities: properties.amenities,
            last_surveyed: properties.last_surveyed,
        })
    }
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Wraps locations into a `GeoJSON` `FeatureCollection`, preserving order.
#[must_use]
pub fn to_feature_collection(locations: &[ParkingLocation]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: locations.iter().map(ParkingLocation::to_feature).collect(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParkingLocation {
        ParkingLocation {
            feature_id: FeatureId::new("RWG000123"),
            coordinates: GeoPoint::new(-0.0912, 51.5101).unwrap(),
            borough: "City of London".to_string(),
            capacity: 12,
            photo_url: Some("https://example.org/p.jpg".to_string()),
            amenities: Some([Amenity::Covered, Amenity::Sheffield].into_iter().collect()),
            last_surveyed: NaiveDate::from_ymd_opt(2017, 6, 14),
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(-181.0, 51.0).is_err());
        assert!(GeoPoint::new(0.0, 90.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 51.0).is_err());
        assert!(GeoPoint::new(180.0, -90.0).is_ok());
    }

    #[test]
    fn feature_carries_point_geometry_and_camel_case_properties() {
        let feature = sample().to_feature();

        let Some(Geometry {
            value: Value::Point(position),
            ..
        }) = &feature.geometry
        else {
            panic!("expected point geometry");
        };
        assert!((position[0] - -0.0912).abs() < 1e-9);
        assert!((position[1] - 51.5101).abs() < 1e-9);

        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["featureId"], "RWG000123");
        assert_eq!(props["capacity"], 12);
        assert_eq!(props["photoUrl"], "https://example.org/p.jpg");
        assert_eq!(props["lastSurveyed"], "2017-06-14");
        assert_eq!(
            props["amenities"],
            serde_json::json!(["COVERED", "SHEFFIELD"])
        );
    }

    #[test]
    fn omits_detail_properties_when_absent() {
        let mut location = sample();
        location.amenities = None;
        location.last_surveyed = None;

        let feature = location.to_feature();
        let props = feature.properties.as_ref().unwrap();
        assert!(!props.contains_key("amenities"));
        assert!(!props.contains_key("lastSurveyed"));
        assert!(props.contains_key("photoUrl"));
    }

    #[test]
    fn decodes_feature_from_wire_json() {
        let json = serde_json::json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [-0.1, 51.5] },
            "properties": {
                "featureId": "A1",
                "borough": "Camden",
                "capacity": 4,
                "photoUrl": null
            }
        });
        let feature: Feature = serde_json::from_value(json).unwrap();
        let location = ParkingLocation::try_from(&feature).unwrap();

        assert_eq!(location.feature_id.as_str(), "A1");
        assert_eq!(location.borough, "Camden");
        assert_eq!(location.capacity, 4);
        assert!(location.photo_url.is_none());
        assert!(location.amenities.is_none());
    }

    #[test]
    fn rejects_non_point_geometry() {
        let json = serde_json::json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
            "properties": { "featureId": "X" }
        });
        let feature: Feature = serde_json::from_value(json).unwrap();
        assert!(matches!(
            ParkingLocation::try_from(&feature),
            Err(ModelError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn rejects_missing_feature_id() {
        let json = serde_json::json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "properties": { "borough": "Hackney" }
        });
        let feature: Feature = serde_json::from_value(json).unwrap();
        assert!(matches!(
            ParkingLocation::try_from(&feature),
            Err(ModelError::Properties(_))
        ));
    }

    #[test]
    fn amenity_columns_are_unique() {
        let columns: BTreeSet<&str> = Amenity::ALL.iter().map(|a| a.column()).collect();
        assert_eq!(columns.len(), Amenity::ALL.len());
    }

    #[test]
    fn amenity_names_parse() {
        assert_eq!("HANGAR".parse::<Amenity>().unwrap(), Amenity::Hangar);
        assert_eq!(Amenity::MStand.to_string(), "M_STAND");
    }

    #[test]
    fn blank_feature_id_is_rejected() {
        let mut location = sample();
        location.feature_id = FeatureId::new("");
        assert!(matches!(
            ParkingLocation::try_from(&location.to_feature()),
            Err(ModelError::MissingFeatureId)
        ));
    }
}
