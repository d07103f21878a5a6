//! Turns settled viewports into fetches and merges the results.
//!
//! Each settle that passes the zoom gate is issued a [`FetchTicket`] with a
//! monotonically increasing sequence number. Only the ticket issued last may
//! merge; a response for an older ticket arrived after the user moved on and
//! is dropped.

use cycle_parking_database_models::BoundingBox;
use cycle_parking_models::ParkingLocation;

use crate::{AccumulatedFeatureSet, FetchError, ParkingFetcher, Viewport};

/// Zoom level below which no data is fetched and markers are hidden.
pub const MIN_FETCH_ZOOM: f64 = 14.0;

/// Permission to run one fetch for a settled viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchTicket {
    seq: u64,
    bounds: BoundingBox,
}

impl FetchTicket {
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub const fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }
}

/// What to do about a settled viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettleDecision {
    /// Fetch the ticket's bounds and pass the result to
    /// [`ViewportSync::complete`].
    Fetch(FetchTicket),
    /// Zoomed out too far; nothing to fetch.
    Suppressed,
}

/// Effect of a settle on the accumulated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// This many new locations were merged.
    Added(usize),
    /// Every returned location was already known.
    Unchanged,
    /// A newer settle was issued while this fetch was in flight.
    Discarded,
    /// The fetch failed. The set is untouched.
    Failed,
    /// Zoomed out below [`MIN_FETCH_ZOOM`].
    Suppressed,
}

/// Keeps an [`AccumulatedFeatureSet`] in step with the map viewport.
#[derive(Debug)]
pub struct ViewportSync<F> {
    fetcher: F,
    features: AccumulatedFeatureSet,
    min_zoom: f64,
    zoom: Option<f64>,
    latest_seq: u64,
}

impl<F> ViewportSync<F> {
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self::with_min_zoom(fetcher, MIN_FETCH_ZOOM)
    }

    #[must_use]
    pub fn with_min_zoom(fetcher: F, min_zoom: f64) -> Self {
        Self {
            fetcher,
            features: AccumulatedFeatureSet::new(),
            min_zoom,
            zoom: None,
            latest_seq: 0,
        }
    }

    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[must_use]
    pub const fn features(&self) -> &AccumulatedFeatureSet {
        &self.features
    }

    /// Whether markers should be drawn at the last reported zoom.
    #[must_use]
    pub fn markers_visible(&self) -> bool {
        self.zoom.is_some_and(|zoom| zoom >= self.min_zoom)
    }

    /// Records a settled viewport and decides whether to fetch.
    ///
    /// A suppressed settle does not invalidate a fetch already in flight.
    pub fn begin_settle(&mut self, viewport: &Viewport) -> SettleDecision {
        self.zoom = Some(viewport.zoom);

        if viewport.zoom < self.min_zoom {
            log::debug!(
                "Viewport zoom {} below {}, skipping fetch",
                viewport.zoom,
                self.min_zoom
            );
            return SettleDecision::Suppressed;
        }

        self.latest_seq += 1;
        SettleDecision::Fetch(FetchTicket {
            seq: self.latest_seq,
            bounds: viewport.bounds,
        })
    }

    /// Applies the result of the fetch authorized by `ticket`.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<ParkingLocation>, FetchError>,
    ) -> SyncOutcome {
        if ticket.seq != self.latest_seq {
            log::debug!(
                "Discarding response for settle {} (latest is {})",
                ticket.seq,
                self.latest_seq
            );
            return SyncOutcome::Discarded;
        }

        match result {
            Ok(locations) => match self.features.merge(locations) {
                0 => SyncOutcome::Unchanged,
                added => {
                    log::debug!("Merged {added} new parking locations");
                    SyncOutcome::Added(added)
                }
            },
            Err(e) => {
                log::warn!("Failed to fetch parking data: {e}");
                SyncOutcome::Failed
            }
        }
    }

    /// Clears the accumulated set and invalidates any fetch in flight.
    pub fn reset(&mut self) {
        self.features.clear();
        self.latest_seq += 1;
    }
}

impl<F: ParkingFetcher> ViewportSync<F> {
    /// Fetches and merges data for a settled viewport.
    pub async fn on_viewport_settle(&mut self, viewport: &Viewport) -> SyncOutcome {
        let ticket = match self.begin_settle(viewport) {
            SettleDecision::Fetch(ticket) => ticket,
            SettleDecision::Suppressed => return SyncOutcome::Suppressed,
        };

        let result = self.fetcher.fetch_within(ticket.bounds()).await;
        self.complete(&ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use cycle_parking_models::{FeatureId, GeoPoint};

    use super::*;

    #[derive(Default)]
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Vec<ParkingLocation>, FetchError>>>,
        requests: Mutex<Vec<BoundingBox>>,
    }

    impl ScriptedFetcher {
        fn with(responses: Vec<Result<Vec<ParkingLocation>, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ParkingFetcher for ScriptedFetcher {
        async fn fetch_within(
            &self,
            bounds: &BoundingBox,
        ) -> Result<Vec<ParkingLocation>, FetchError> {
            self.requests.lock().unwrap().push(*bounds);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn location(id: &str, capacity: u32) -> ParkingLocation {
        ParkingLocation {
            feature_id: FeatureId::new(id),
            coordinates: GeoPoint::new(-0.1, 51.5).unwrap(),
            borough: "Lambeth".to_string(),
            capacity,
            photo_url: None,
            amenities: None,
            last_surveyed: None,
        }
    }

    fn viewport(zoom: f64) -> Viewport {
        Viewport {
            bounds: BoundingBox::new(-0.2, 51.4, 0.0, 51.6).unwrap(),
            zoom,
        }
    }

    fn ids(sync: &ViewportSync<ScriptedFetcher>) -> Vec<String> {
        sync.features()
            .iter()
            .map(|l| l.feature_id.to_string())
            .collect()
    }

    #[tokio::test]
    async fn later_settles_only_add_new_features() {
        let fetcher = ScriptedFetcher::with(vec![
            Ok(vec![location("A1", 4), location("A2", 6)]),
            Ok(vec![location("A2", 99), location("A3", 2)]),
        ]);
        let mut sync = ViewportSync::new(fetcher);

        assert_eq!(
            sync.on_viewport_settle(&viewport(15.0)).await,
            SyncOutcome::Added(2)
        );
        assert_eq!(
            sync.on_viewport_settle(&viewport(15.0)).await,
            SyncOutcome::Added(1)
        );

        assert_eq!(ids(&sync), ["A1", "A2", "A3"]);
        let a2 = sync.features().get(&FeatureId::new("A2")).unwrap();
        assert_eq!(a2.capacity, 6);
    }

    #[tokio::test]
    async fn repeated_response_leaves_set_unchanged() {
        let batch = vec![location("A1", 4)];
        let fetcher = ScriptedFetcher::with(vec![Ok(batch.clone()), Ok(batch)]);
        let mut sync = ViewportSync::new(fetcher);

        sync.on_viewport_settle(&viewport(16.0)).await;
        let snapshot = sync.features().snapshot();

        assert_eq!(
            sync.on_viewport_settle(&viewport(16.0)).await,
            SyncOutcome::Unchanged
        );
        assert!(std::sync::Arc::ptr_eq(&snapshot, &sync.features().snapshot()));
    }

    #[tokio::test]
    async fn zoomed_out_settle_skips_fetch_and_keeps_set() {
        let fetcher = ScriptedFetcher::with(vec![Ok(vec![location("A1", 4)])]);
        let mut sync = ViewportSync::new(fetcher);

        sync.on_viewport_settle(&viewport(15.0)).await;
        assert!(sync.markers_visible());

        assert_eq!(
            sync.on_viewport_settle(&viewport(12.0)).await,
            SyncOutcome::Suppressed
        );
        assert!(!sync.markers_visible());
        assert_eq!(sync.fetcher().request_count(), 1);
        assert_eq!(sync.features().len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_set_unchanged() {
        let fetcher = ScriptedFetcher::with(vec![
            Ok(vec![location("A1", 4)]),
            Err(FetchError::Status(503)),
        ]);
        let mut sync = ViewportSync::new(fetcher);

        sync.on_viewport_settle(&viewport(15.0)).await;
        let generation = sync.features().generation();

        assert_eq!(
            sync.on_viewport_settle(&viewport(15.0)).await,
            SyncOutcome::Failed
        );
        assert_eq!(sync.features().generation(), generation);
        assert_eq!(ids(&sync), ["A1"]);
    }

    #[test]
    fn superseded_response_is_discarded() {
        let mut sync = ViewportSync::new(ScriptedFetcher::default());

        let SettleDecision::Fetch(first) = sync.begin_settle(&viewport(15.0)) else {
            panic!("expected a fetch");
        };
        let SettleDecision::Fetch(second) = sync.begin_settle(&viewport(15.0)) else {
            panic!("expected a fetch");
        };
        assert!(second.seq() > first.seq());

        assert_eq!(
            sync.complete(&second, Ok(vec![location("B1", 1)])),
            SyncOutcome::Added(1)
        );
        assert_eq!(
            sync.complete(&first, Ok(vec![location("A1", 1)])),
            SyncOutcome::Discarded
        );
        assert_eq!(ids(&sync), ["B1"]);
    }

    #[test]
    fn suppressed_settle_does_not_supersede_in_flight_fetch() {
        let mut sync = ViewportSync::new(ScriptedFetcher::default());

        let SettleDecision::Fetch(ticket) = sync.begin_settle(&viewport(15.0)) else {
            panic!("expected a fetch");
        };
        assert_eq!(
            sync.begin_settle(&viewport(10.0)),
            SettleDecision::Suppressed
        );

        assert_eq!(
            sync.complete(&ticket, Ok(vec![location("A1", 1)])),
            SyncOutcome::Added(1)
        );
    }

    #[test]
    fn reset_clears_set_and_invalidates_in_flight_fetch() {
        let mut sync = ViewportSync::new(ScriptedFetcher::default());

        let SettleDecision::Fetch(ticket) = sync.begin_settle(&viewport(15.0)) else {
            panic!("expected a fetch");
        };
        sync.reset();

        assert_eq!(
            sync.complete(&ticket, Ok(vec![location("A1", 1)])),
            SyncOutcome::Discarded
        );
        assert!(sync.features().is_empty());
    }

    #[test]
    fn custom_zoom_threshold() {
        let mut sync = ViewportSync::with_min_zoom(ScriptedFetcher::default(), 10.0);
        assert!(!sync.markers_visible());
        assert!(matches!(
            sync.begin_settle(&viewport(10.0)),
            SettleDecision::Fetch(_)
        ));
        assert!(sync.markers_visible());
    }
}
