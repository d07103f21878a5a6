//! The details sheet shown when a marker is tapped.

use cycle_parking_models::{Amenity, FeatureId, ParkingLocation};

use crate::AccumulatedFeatureSet;

/// Display fields for a selected location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingDetails {
    pub feature_id: FeatureId,
    pub borough: String,
    pub capacity: u32,
    pub photo_url: Option<String>,
    pub amenities: Vec<Amenity>,
}

impl From<&ParkingLocation> for ParkingDetails {
    fn from(location: &ParkingLocation) -> Self {
        Self {
            feature_id: location.feature_id.clone(),
            borough: location.borough.clone(),
            capacity: location.capacity,
            photo_url: location.photo_url.clone(),
            amenities: location
                .amenities
                .as_ref()
                .map(|a| a.iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// The currently selected marker, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<FeatureId>,
}

impl Selection {
    pub fn select(&mut self, id: FeatureId) {
        self.selected = Some(id);
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub const fn selected(&self) -> Option<&FeatureId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.selected.is_some()
    }

    /// Looks up the selection in `features`.
    #[must_use]
    pub fn details(&self, features: &AccumulatedFeatureSet) -> Option<ParkingDetails> {
        let id = self.selected.as_ref()?;
        features.get(id).map(ParkingDetails::from)
    }
}
