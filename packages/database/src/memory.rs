//! In-memory [`ParkingStore`] backed by an R-tree.
//!
//! Mirrors the `PostGIS` query semantics: bounding box queries return rows
//! whose point lies inside or on the envelope, nearest queries order by
//! planar distance in degrees (what `<->` computes for SRID 4326 points),
//! and unfiltered queries return rows in insertion order.

use cycle_parking_database_models::{ParkingQuery, ParkingRow};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use crate::{DbError, ParkingStore};

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// A read-only parking store held entirely in memory.
pub struct MemoryStore {
    rows: Vec<ParkingRow>,
    index: RTree<IndexedPoint>,
}

impl MemoryStore {
    /// Builds the store and its spatial index.
    ///
    /// Rows whose coordinates are not finite are kept for unfiltered
    /// queries but left out of the spatial index.
    #[must_use]
    pub fn new(rows: Vec<ParkingRow>) -> Self {
        let points = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.longitude.is_finite() && row.latitude.is_finite())
            .map(|(i, row)| GeomWithData::new([row.longitude, row.latitude], i))
            .collect();

        let index = RTree::bulk_load(points);
        log::debug!("Loaded {} parking rows into memory store", index.size());

        Self { rows, index }
    }

    /// Number of rows held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn emit(&self, idx: usize, with_details: bool) -> ParkingRow {
        let mut row = self.rows[idx].clone();
        if !with_details {
            row.amenities = None;
            row.last_surveyed = None;
        }
        row
    }
}

#[async_trait::async_trait]
impl ParkingStore for MemoryStore {
    async fn query_parking(&self, query: &ParkingQuery) -> Result<Vec<ParkingRow>, DbError> {
        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
        let with_details = query.includes_details();

        let indices: Vec<usize> = match query {
            ParkingQuery::Within { bbox, .. } => {
                let envelope =
                    AABB::from_corners([bbox.west, bbox.south], [bbox.east, bbox.north]);
                let mut hits: Vec<usize> = self
                    .index
                    .locate_in_envelope_intersecting(&envelope)
                    .map(|p| p.data)
                    .collect();
                hits.sort_unstable();
                hits.truncate(limit);
                hits
            }
            ParkingQuery::Nearest { point, .. } => self
                .index
                .nearest_neighbor_iter_with_distance_2(&[point.longitude, point.latitude])
                .take(limit)
                .map(|(p, _)| p.data)
                .collect(),
            ParkingQuery::Any { .. } => (0..self.rows.len().min(limit)).collect(),
        };

        Ok(indices
            .into_iter()
            .map(|i| self.emit(i, with_details))
            .collect())
    }
}
