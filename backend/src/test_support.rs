use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::{
    distance::haversine_m,
    models::{Coordinate, Quest, SegmentMetric, SegmentQuery, TransportMode, Waypoint},
    route_client::{RouteClient, RoutingError},
};

pub fn quest(name: &str, coords: &[(f64, f64)]) -> Quest {
    Quest {
        name: name.to_string(),
        description: format!("{name} quest"),
        colour: "#FDBE3D".to_string(),
        icon: "seagull-quest-icon.svg".to_string(),
        progress: 0.0,
        waypoints: coords
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| Waypoint::new(format!("{name} stop {}", i + 1), lat, lon))
            .collect(),
    }
}

/// Routing stub with scripted behaviour.
///
/// Distance is the rounded haversine distance, duration assumes 1.25 m/s, and
/// transit segments cost 1.75 GBP.
#[derive(Default)]
pub struct StubRouteClient {
    calls: AtomicUsize,
    queries: Mutex<Vec<SegmentQuery>>,
    delays: Vec<(Coordinate, Duration)>,
    failing_origins: Vec<Coordinate>,
    failing_modes: Vec<TransportMode>,
    gated_mode: Option<TransportMode>,
    gate: Option<Semaphore>,
}

impl StubRouteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay answers for segments starting at `origin`.
    pub fn delay_from(mut self, origin: (f64, f64), delay: Duration) -> Self {
        self.delays.push((Coordinate::new(origin.0, origin.1), delay));
        self
    }

    pub fn fail_from(mut self, origin: (f64, f64)) -> Self {
        self.failing_origins.push(Coordinate::new(origin.0, origin.1));
        self
    }

    pub fn fail_mode(mut self, mode: TransportMode) -> Self {
        self.failing_modes.push(mode);
        self
    }

    /// Hold every query for `mode` until [`StubRouteClient::release`] is called.
    pub fn gate_mode(mut self, mode: TransportMode) -> Self {
        self.gated_mode = Some(mode);
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<SegmentQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn expected(query: &SegmentQuery) -> SegmentMetric {
        let distance = haversine_m(query.origin, query.destination).round();
        SegmentMetric {
            distance_meters: distance,
            fare: if query.mode.bears_fare() { 1.75 } else { 0.0 },
            currency: if query.mode.bears_fare() { "GBP".into() } else { String::new() },
            duration_seconds: (distance / 1.25).round(),
        }
    }
}

#[async_trait]
impl RouteClient for StubRouteClient {
    async fn segment(&self, query: &SegmentQuery) -> Result<SegmentMetric, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(*query);

        if let (Some(mode), Some(gate)) = (self.gated_mode, &self.gate) {
            if mode == query.mode {
                let _permit = gate.acquire().await.unwrap();
            }
        }
        if let Some((_, delay)) = self.delays.iter().find(|(c, _)| *c == query.origin) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_origins.contains(&query.origin) || self.failing_modes.contains(&query.mode) {
            return Err(RoutingError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }

        Ok(Self::expected(query))
    }
}
