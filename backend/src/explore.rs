use std::{
    str::FromStr,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    circle::{CircleStrategy, classify_radius, enclosing_circle},
    config::ExploreConfig,
    metrics::{compute_quest_metrics, compute_quest_metrics_isolated},
    models::{
        EnclosingCircle, MetricsSnapshot, Quest, QuestMetric, QuestOverlay, QuestSummary,
        TransportMode,
    },
    route_client::RouteClient,
};

/// Progress of the automatic, mount-time aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationState {
    NotStarted,
    InFlight,
    Done,
}

/// How far a routing failure spreads when metrics are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any failure clears the published metrics.
    #[default]
    AllOrNothing,
    /// A failing quest publishes `None`; the others keep their metrics.
    PerQuest,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown failure policy '{0}' (expected all-or-nothing or per-quest)")]
pub struct UnknownFailurePolicy(pub String);

impl FromStr for FailurePolicy {
    type Err = UnknownFailurePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "all-or-nothing" => Ok(FailurePolicy::AllOrNothing),
            "per-quest" => Ok(FailurePolicy::PerQuest),
            _ => Err(UnknownFailurePolicy(s.to_string())),
        }
    }
}

/// Data controller behind the explore map.
///
/// Owns a fixed quest list, the enclosing circles derived from it (computed
/// once) and the latest published metrics. Every published vector is
/// index-aligned with the quest list.
pub struct ExploreController {
    quests: Vec<Quest>,
    client: Arc<dyn RouteClient>,
    circle_strategy: CircleStrategy,
    failure_policy: FailurePolicy,
    circles: OnceLock<Vec<EnclosingCircle>>,
    mode: Mutex<TransportMode>,
    state: Mutex<AggregationState>,
    /// Number of aggregation runs issued so far; the latest run owns the snapshot.
    generation: AtomicU64,
    metrics: Mutex<Option<MetricsSnapshot>>,
}

impl ExploreController {
    pub fn new(quests: Vec<Quest>, client: Arc<dyn RouteClient>) -> Self {
        Self {
            quests,
            client,
            circle_strategy: CircleStrategy::default(),
            failure_policy: FailurePolicy::default(),
            circles: OnceLock::new(),
            mode: Mutex::new(TransportMode::default()),
            state: Mutex::new(AggregationState::NotStarted),
            generation: AtomicU64::new(0),
            metrics: Mutex::new(None),
        }
    }

    pub fn from_config(
        quests: Vec<Quest>,
        client: Arc<dyn RouteClient>,
        config: &ExploreConfig,
    ) -> Self {
        Self::new(quests, client)
            .with_circle_strategy(config.circle_strategy)
            .with_failure_policy(config.failure_policy)
            .with_transport_mode(config.transport_mode)
    }

    pub fn with_circle_strategy(mut self, strategy: CircleStrategy) -> Self {
        self.circle_strategy = strategy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_transport_mode(self, mode: TransportMode) -> Self {
        *lock(&self.mode) = mode;
        self
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn transport_mode(&self) -> TransportMode {
        *lock(&self.mode)
    }

    pub fn aggregation_state(&self) -> AggregationState {
        *lock(&self.state)
    }

    /// Enclosing circle per quest, computed on first access and fixed afterwards.
    pub fn circles(&self) -> &[EnclosingCircle] {
        self.circles.get_or_init(|| {
            let circles: Vec<EnclosingCircle> = self
                .quests
                .iter()
                .map(|quest| enclosing_circle(&quest.waypoints, self.circle_strategy))
                .collect();
            for (idx, (quest, circle)) in self.quests.iter().zip(&circles).enumerate() {
                tracing::info!(
                    "quest {} ({}) - radius: {:.2} meters, color: {}",
                    idx + 1,
                    quest.name,
                    circle.radius_meters,
                    classify_radius(circle.radius_meters).marker_colour()
                );
            }
            circles
        })
    }

    pub fn summaries(&self) -> Vec<QuestSummary> {
        self.quests
            .iter()
            .zip(self.circles())
            .enumerate()
            .map(|(index, (quest, circle))| {
                let bucket = classify_radius(circle.radius_meters);
                QuestSummary {
                    index,
                    name: quest.name.clone(),
                    description: quest.description.clone(),
                    colour: quest.colour.clone(),
                    icon: quest.icon.clone(),
                    progress: quest.progress,
                    circle: *circle,
                    bucket,
                    marker_colour: bucket.marker_colour().to_string(),
                    legend_label: bucket.legend_label().to_string(),
                }
            })
            .collect()
    }

    /// Latest published metrics, `None` when none are available.
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        lock(&self.metrics).clone()
    }

    /// Overlay text for one quest. `None` for an index outside the quest list.
    pub fn overlay(&self, index: usize) -> Option<QuestOverlay> {
        if index >= self.quests.len() {
            return None;
        }
        let overlay = lock(&self.metrics)
            .as_ref()
            .and_then(|snapshot| snapshot.metrics.get(index).cloned().flatten())
            .map(|metric| QuestOverlay::from_metric(&metric))
            .unwrap_or_default();
        Some(overlay)
    }

    /// Mount-time computation: circles, then metrics in the current mode.
    ///
    /// Runs at most once per controller; later calls return `false` without
    /// touching the network. With no quests nothing happens and the gate stays
    /// closed.
    pub async fn mount(&self) -> bool {
        if self.quests.is_empty() {
            return false;
        }
        {
            let mut state = lock(&self.state);
            if *state != AggregationState::NotStarted {
                return false;
            }
            *state = AggregationState::InFlight;
        }

        tracing::info!("calculating quest circles and metrics (one time only)");
        self.circles();
        let mode = self.transport_mode();
        self.run_aggregation(mode).await;

        *lock(&self.state) = AggregationState::Done;
        true
    }

    /// Switch transport mode and recompute every quest's metrics in full.
    ///
    /// Before mount only the mode is recorded. Returns the snapshot published
    /// after this run, if any.
    pub async fn change_transport_mode(&self, mode: TransportMode) -> Option<MetricsSnapshot> {
        *lock(&self.mode) = mode;

        if self.aggregation_state() == AggregationState::NotStarted {
            tracing::debug!("transport mode set to {mode} before mount, nothing to recalculate");
            return None;
        }

        tracing::info!("manually recalculating for {mode} mode");
        self.run_aggregation(mode).await
    }

    async fn run_aggregation(&self, mode: TransportMode) -> Option<MetricsSnapshot> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let client = self.client.as_ref();

        let metrics: Option<Vec<Option<QuestMetric>>> = match self.failure_policy {
            FailurePolicy::AllOrNothing => {
                match compute_quest_metrics(&self.quests, mode, client).await {
                    Ok(metrics) => Some(metrics.into_iter().map(Some).collect()),
                    Err(err) => {
                        tracing::error!("no metrics available for {mode}: {err}");
                        None
                    }
                }
            }
            FailurePolicy::PerQuest => Some(
                compute_quest_metrics_isolated(&self.quests, mode, client)
                    .await
                    .into_iter()
                    .map(|result| {
                        result
                            .map_err(|err| tracing::warn!("metrics unavailable: {err}"))
                            .ok()
                    })
                    .collect(),
            ),
        };

        let mut published = lock(&self.metrics);
        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            tracing::debug!(
                "discarding {mode} metrics from run {generation}, run {latest} supersedes it"
            );
            return published.clone();
        }

        tracing::info!("setting metrics for {mode} (run {generation})");
        *published = metrics.map(|metrics| MetricsSnapshot {
            generation,
            mode,
            metrics,
        });
        published.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
