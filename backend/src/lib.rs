pub mod circle;
pub mod config;
pub mod distance;
pub mod error;
pub mod explore;
pub mod geocode;
pub mod metrics;
pub mod models;
pub mod quests;
pub mod route_client;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::config::ExploreConfig;
use crate::error::ExploreError;
use crate::explore::ExploreController;
use crate::geocode::{Geocoder, GoogleGeocoder, initial_viewport};
use crate::models::{ApiError, QuestOverlay, QuestSummary, TransportModeRequest, Viewport};
use crate::quests::load_quests_from_path;
use crate::route_client::{DistanceMatrixClient, RouteClient};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ExploreController>,
    pub geocoder: Arc<dyn Geocoder>,
    pub home_city: Option<String>,
}

impl AppState {
    /// Wire the Google-backed collaborators and the quest catalogue from config.
    pub fn from_config(config: &ExploreConfig) -> Result<Self, ExploreError> {
        let quests = load_quests_from_path(&config.quests_path)?;
        tracing::info!(
            "loaded {} quests from {}",
            quests.len(),
            config.quests_path.display()
        );

        let client: Arc<dyn RouteClient> = match config.route_timeout {
            Some(timeout) => Arc::new(DistanceMatrixClient::with_timeout(
                &config.routing_base_url,
                &config.api_key,
                timeout,
            )?),
            None => Arc::new(DistanceMatrixClient::new(
                &config.routing_base_url,
                &config.api_key,
            )),
        };
        let geocoder = Arc::new(GoogleGeocoder::new(
            &config.geocoding_base_url,
            &config.api_key,
        ));

        Ok(Self {
            controller: Arc::new(ExploreController::from_config(quests, client, config)),
            geocoder,
            home_city: config.home_city.clone(),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/quests", get(quests_handler))
        .route("/api/quests/:index/overlay", get(overlay_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/transport-mode", post(transport_mode_handler))
        .route("/api/viewport", get(viewport_handler))
        .with_state(state)
}

async fn quests_handler(State(state): State<AppState>) -> Json<Vec<QuestSummary>> {
    Json(state.controller.summaries())
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.controller.metrics() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn overlay_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<QuestOverlay>, (StatusCode, Json<ApiError>)> {
    state.controller.overlay(index).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                message: format!("no quest at index {index}"),
            }),
        )
    })
}

async fn transport_mode_handler(
    State(state): State<AppState>,
    Json(req): Json<TransportModeRequest>,
) -> Response {
    match state.controller.change_transport_mode(req.mode).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ViewportQuery {
    city: Option<String>,
}

async fn viewport_handler(
    State(state): State<AppState>,
    Query(query): Query<ViewportQuery>,
) -> Json<Viewport> {
    let city = query.city.or(state.home_city);
    Json(initial_viewport(state.geocoder.as_ref(), city.as_deref()).await)
}
