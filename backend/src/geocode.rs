use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Coordinate, Viewport};

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Location of a free-text place name, `None` when nothing matched.
    async fn locate(&self, place: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoding API returned status {0}")]
    Status(reqwest::StatusCode),
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/geocode/json", self.base_url))
            .query(&[("address", place), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let body: GeocodeResponse = response.json().await?;
        Ok(body.first_location())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeocodeResponse {
    fn first_location(self) -> Option<Coordinate> {
        self.results.into_iter().next().map(|r| Coordinate {
            lat: r.geometry.location.lat,
            lon: r.geometry.location.lng,
        })
    }
}

/// Map viewport centred on the player's city, or the fallback viewport when
/// there is no city or the lookup fails.
pub async fn initial_viewport(geocoder: &dyn Geocoder, city: Option<&str>) -> Viewport {
    let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) else {
        return Viewport::FALLBACK;
    };

    match geocoder.locate(city).await {
        Ok(Some(center)) => {
            tracing::debug!("centering viewport on {city} at {center:?}");
            Viewport::centered_on(center)
        }
        Ok(None) => {
            tracing::debug!("no geocoding result for {city}, keeping fallback viewport");
            Viewport::FALLBACK
        }
        Err(err) => {
            tracing::warn!("geocoding {city} failed: {err}");
            Viewport::FALLBACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGeocoder(Result<Option<Coordinate>, ()>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, _place: &str) -> Result<Option<Coordinate>, GeocodeError> {
            match self.0 {
                Ok(found) => Ok(found),
                Err(()) => Err(GeocodeError::Status(reqwest::StatusCode::BAD_GATEWAY)),
            }
        }
    }

    #[test]
    fn parses_first_result() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{"results": [
                {"geometry": {"location": {"lat": 53.48, "lng": -2.24}}},
                {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
            ], "status": "OK"}"#,
        )
        .unwrap();
        assert_eq!(body.first_location(), Some(Coordinate::new(53.48, -2.24)));
    }

    #[test]
    fn empty_results_have_no_location() {
        let body: GeocodeResponse = serde_json::from_str(r#"{"status": "ZERO_RESULTS"}"#).unwrap();
        assert_eq!(body.first_location(), None);
    }

    #[tokio::test]
    async fn viewport_centres_on_city() {
        let geocoder = FixedGeocoder(Ok(Some(Coordinate::new(53.48, -2.24))));
        let viewport = initial_viewport(&geocoder, Some("Manchester")).await;
        assert_eq!(viewport.center, Coordinate::new(53.48, -2.24));
        assert_eq!(viewport.latitude_delta, 0.1);
    }

    #[tokio::test]
    async fn viewport_falls_back_on_failure() {
        let failing = FixedGeocoder(Err(()));
        assert_eq!(initial_viewport(&failing, Some("Atlantis")).await, Viewport::FALLBACK);

        let empty = FixedGeocoder(Ok(None));
        assert_eq!(initial_viewport(&empty, Some("Nowhere")).await, Viewport::FALLBACK);

        assert_eq!(initial_viewport(&empty, Some("  ")).await, Viewport::FALLBACK);
        assert_eq!(initial_viewport(&empty, None).await, Viewport::FALLBACK);
    }
}
