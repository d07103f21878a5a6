//! Fetching parking locations from the API.

use cycle_parking_database_models::BoundingBox;
use cycle_parking_models::{GeoPoint, ModelError, ParkingLocation};
use geojson::FeatureCollection;

/// Errors that can occur while fetching parking data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Parking request failed with status {0}")]
    Status(u16),

    /// The body was not a `GeoJSON` `FeatureCollection`.
    #[error("Failed to parse parking response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A feature could not be read as a parking location.
    #[error("Invalid parking feature: {0}")]
    Feature(#[from] ModelError),
}

/// Source of parking locations for a map viewport.
#[async_trait::async_trait]
pub trait ParkingFetcher: Send + Sync {
    /// Fetches locations intersecting `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request or decoding fails.
    async fn fetch_within(&self, bounds: &BoundingBox) -> Result<Vec<ParkingLocation>, FetchError>;
}

/// [`ParkingFetcher`] that calls `GET {base_url}/api/parking?bounds=...`.
///
/// Also covers the point and unfiltered modes of the endpoint for the
/// initial "parking near me" view.
#[derive(Debug, Clone)]
pub struct HttpParkingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpParkingClient {
    /// Creates a client for the API at `base_url` (e.g.
    /// `http://localhost:8080`).
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full URL of the parking endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/api/parking", self.base_url)
    }

    /// Fetches the locations nearest to `point`, closest first.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request or decoding fails.
    pub async fn fetch_nearest(
        &self,
        point: &GeoPoint,
    ) -> Result<Vec<ParkingLocation>, FetchError> {
        self.get(&[
            ("lat", point.latitude.to_string()),
            ("lon", point.longitude.to_string()),
        ])
        .await
    }

    /// Fetches the unfiltered first page of locations.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request or decoding fails.
    pub async fn fetch_default(&self) -> Result<Vec<ParkingLocation>, FetchError> {
        self.get(&[]).await
    }

    /// Fetches around the user's location, or the default set when it is
    /// unknown (for example when location access was denied).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request or decoding fails.
    pub async fn fetch_around(
        &self,
        location: Option<&GeoPoint>,
    ) -> Result<Vec<ParkingLocation>, FetchError> {
        match location {
            Some(point) => self.fetch_nearest(point).await,
            None => {
                log::debug!("No user location, fetching default parking set");
                self.fetch_default().await
            }
        }
    }

    async fn get(&self, query: &[(&str, String)]) -> Result<Vec<ParkingLocation>, FetchError> {
        let mut request = self.client.get(self.endpoint());
        if !query.is_empty() {
            request = request.query(query);
        }
        let resp = request.send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        decode_feature_collection(&body)
    }
}

/// Decodes a `FeatureCollection` body into parking locations.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not a `FeatureCollection`
/// or [`FetchError::Feature`] if any feature is malformed.
pub fn decode_feature_collection(body: &str) -> Result<Vec<ParkingLocation>, FetchError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;

    collection
        .features
        .iter()
        .map(|feature| ParkingLocation::try_from(feature).map_err(FetchError::from))
        .collect()
}

#[async_trait::async_trait]
impl ParkingFetcher for HttpParkingClient {
    async fn fetch_within(&self, bounds: &BoundingBox) -> Result<Vec<ParkingLocation>, FetchError> {
        self.get(&[("bounds", bounds.to_query_value())]).await
    }
}
