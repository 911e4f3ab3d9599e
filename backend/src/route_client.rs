use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Coordinate, SegmentMetric, SegmentQuery};

pub const DEFAULT_MAPS_API_BASE: &str = "https://maps.googleapis.com/maps/api";

/// Routing collaborator: travel figures for one origin/destination pair.
///
/// Implementations must not retry; a failed query is reported as-is and the
/// caller decides how far the failure spreads.
#[async_trait]
pub trait RouteClient: Send + Sync {
    async fn segment(&self, query: &SegmentQuery) -> Result<SegmentMetric, RoutingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing API returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed routing response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the Google Distance Matrix API, one origin and one destination per call.
pub struct DistanceMatrixClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DistanceMatrixClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Same as [`DistanceMatrixClient::new`] with a per-request timeout.
    pub fn with_timeout(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl RouteClient for DistanceMatrixClient {
    async fn segment(&self, query: &SegmentQuery) -> Result<SegmentMetric, RoutingError> {
        let url = format!("{}/distancematrix/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("origins", format_coordinate(query.origin)),
                ("destinations", format_coordinate(query.destination)),
                ("mode", query.mode.as_str().to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: DistanceMatrixResponse = serde_json::from_slice(&body)?;
        Ok(parsed.into_segment_metric())
    }
}

fn format_coordinate(coord: Coordinate) -> String {
    format!("{},{}", coord.lat, coord.lon)
}

#[derive(Debug, Default, Deserialize)]
pub struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Default, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Default, Deserialize)]
struct MatrixElement {
    distance: Option<ValueField>,
    duration: Option<ValueField>,
    fare: Option<FareField>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueField {
    value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FareField {
    value: Option<f64>,
    currency: Option<String>,
}

impl DistanceMatrixResponse {
    /// Absent fields read as zero (or an empty currency); the first element of
    /// the first row is the only one a single-pair query produces.
    pub fn into_segment_metric(self) -> SegmentMetric {
        let element = self
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .unwrap_or_default();

        let fare = element.fare.unwrap_or_default();
        SegmentMetric {
            distance_meters: element.distance.and_then(|d| d.value).unwrap_or(0.0),
            fare: fare.value.unwrap_or(0.0),
            currency: fare.currency.unwrap_or_default(),
            duration_seconds: element.duration.and_then(|d| d.value).unwrap_or(0.0),
        }
    }
}
