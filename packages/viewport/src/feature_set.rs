//! Session-scoped cache of every parking location fetched so far.

use std::collections::BTreeMap;
use std::sync::Arc;

use cycle_parking_models::{FeatureId, ParkingLocation};

/// A grow-only map from [`FeatureId`] to [`ParkingLocation`].
///
/// The first location stored under an id wins; later copies are ignored.
/// The map sits behind an [`Arc`] that is only replaced when a merge adds
/// something, so holders of a [`snapshot`](Self::snapshot) can compare
/// pointers to skip redundant re-renders.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedFeatureSet {
    features: Arc<BTreeMap<FeatureId, ParkingLocation>>,
    generation: u64,
}

impl AccumulatedFeatureSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts every location whose id is not already present.
    ///
    /// Returns the number of locations added. When nothing is added the
    /// underlying map is not touched.
    pub fn merge(&mut self, locations: impl IntoIterator<Item = ParkingLocation>) -> usize {
        let mut added = 0;

        for location in locations {
            if self.features.contains_key(&location.feature_id) {
                continue;
            }
            Arc::make_mut(&mut self.features).insert(location.feature_id.clone(), location);
            added += 1;
        }

        if added > 0 {
            self.generation += 1;
        }

        added
    }

    /// Shares the current map.
    #[must_use]
    pub fn snapshot(&self) -> Arc<BTreeMap<FeatureId, ParkingLocation>> {
        Arc::clone(&self.features)
    }

    /// Bumped on every change; unchanged by no-op merges.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &FeatureId) -> Option<&ParkingLocation> {
        self.features.get(id)
    }

    /// Iterates stored locations ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &ParkingLocation> {
        self.features.values()
    }

    /// Drops every stored location.
    pub fn clear(&mut self) {
        if !self.features.is_empty() {
            self.features = Arc::new(BTreeMap::new());
            self.generation += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use cycle_parking_models::GeoPoint;

    use super::*;

    fn location(id: &str, capacity: u32) -> ParkingLocation {
        ParkingLocation {
            feature_id: FeatureId::new(id),
            coordinates: GeoPoint::new(-0.09, 51.51).unwrap(),
            borough: "Islington".to_string(),
            capacity,
            photo_url: None,
            amenities: None,
            last_surveyed: None,
        }
    }

    fn ids(set: &AccumulatedFeatureSet) -> Vec<String> {
        set.iter().map(|l| l.feature_id.to_string()).collect()
    }

    #[test]
    fn first_write_wins() {
        let mut set = AccumulatedFeatureSet::new();
        assert_eq!(set.merge([location("A", 1)]), 1);
        assert_eq!(set.merge([location("A", 99)]), 0);
        assert_eq!(set.get(&FeatureId::new("A")).unwrap().capacity, 1);
    }

    #[test]
    fn duplicates_within_one_batch_keep_the_first() {
        let mut set = AccumulatedFeatureSet::new();
        assert_eq!(set.merge([location("A", 1), location("A", 2)]), 1);
        assert_eq!(set.get(&FeatureId::new("A")).unwrap().capacity, 1);
    }

    #[test]
    fn merging_twice_equals_merging_once() {
        let batch = vec![location("A", 1), location("B", 2), location("C", 3)];

        let mut once = AccumulatedFeatureSet::new();
        once.merge(batch.clone());

        let mut twice = AccumulatedFeatureSet::new();
        twice.merge(batch.clone());
        twice.merge(batch);

        assert_eq!(*once.snapshot(), *twice.snapshot());
        assert_eq!(once.generation(), twice.generation());
    }

    #[test]
    fn merge_never_shrinks_the_key_set() {
        let mut set = AccumulatedFeatureSet::new();
        let batches = [
            vec![location("A", 1), location("B", 1)],
            vec![],
            vec![location("B", 1), location("C", 1)],
            vec![location("A", 1)],
        ];

        let mut previous = Vec::new();
        for batch in batches {
            set.merge(batch);
            let current = ids(&set);
            assert!(previous.iter().all(|id| current.contains(id)));
            previous = current;
        }
        assert_eq!(previous, ["A", "B", "C"]);
    }

    #[test]
    fn no_op_merge_keeps_the_same_map() {
        let mut set = AccumulatedFeatureSet::new();
        set.merge([location("A", 1), location("B", 2)]);
        let before = set.snapshot();
        let generation = set.generation();

        assert_eq!(set.merge([location("B", 5), location("A", 7)]), 0);
        assert!(Arc::ptr_eq(&before, &set.snapshot()));
        assert_eq!(set.generation(), generation);
    }

    #[test]
    fn growing_merge_replaces_the_map_and_leaves_snapshots_intact() {
        let mut set = AccumulatedFeatureSet::new();
        set.merge([location("A", 1)]);
        let before = set.snapshot();

        assert_eq!(set.merge([location("B", 2)]), 1);
        assert!(!Arc::ptr_eq(&before, &set.snapshot()));
        assert_eq!(before.len(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn clear_empties_and_bumps_generation() {
        let mut set = AccumulatedFeatureSet::new();
        set.merge([location("A", 1)]);
        let generation = set.generation();

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.generation(), generation + 1);

        set.clear();
        assert_eq!(set.generation(), generation + 1);
    }
}
