use futures::future::{join_all, try_join_all};

use crate::{
    models::{Quest, QuestMetric, SegmentMetric, SegmentQuery, TransportMode},
    route_client::{RouteClient, RoutingError},
};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("quest {quest} segment {segment} could not be routed: {source}")]
    Segment {
        quest: usize,
        segment: usize,
        #[source]
        source: RoutingError,
    },
}

/// Travel metrics for every quest, index-aligned with `quests`.
///
/// Quests are routed concurrently and, within a quest, every consecutive
/// waypoint pair is queried concurrently. Nothing is returned until every
/// query has resolved, and the first routing failure fails the whole call.
pub async fn compute_quest_metrics(
    quests: &[Quest],
    mode: TransportMode,
    client: &dyn RouteClient,
) -> Result<Vec<QuestMetric>, MetricsError> {
    try_join_all(
        quests
            .iter()
            .enumerate()
            .map(|(index, quest)| quest_metric(index, quest, mode, client)),
    )
    .await
}

/// Like [`compute_quest_metrics`], but a failing quest only fails its own entry.
pub async fn compute_quest_metrics_isolated(
    quests: &[Quest],
    mode: TransportMode,
    client: &dyn RouteClient,
) -> Vec<Result<QuestMetric, MetricsError>> {
    join_all(
        quests
            .iter()
            .enumerate()
            .map(|(index, quest)| quest_metric(index, quest, mode, client)),
    )
    .await
}

/// Metric for one quest. `index` only labels logs and errors.
pub async fn quest_metric(
    index: usize,
    quest: &Quest,
    mode: TransportMode,
    client: &dyn RouteClient,
) -> Result<QuestMetric, MetricsError> {
    if quest.waypoints.len() < 2 {
        return Ok(QuestMetric::unroutable());
    }

    // try_join_all yields results in input order, whatever order they finish in.
    let segments = try_join_all(quest.waypoints.windows(2).enumerate().map(
        |(segment, pair)| async move {
            let (origin, destination) = (&pair[0], &pair[1]);
            let query = SegmentQuery {
                origin: origin.coordinate(),
                destination: destination.coordinate(),
                mode,
            };
            let metric = client
                .segment(&query)
                .await
                .map_err(|source| MetricsError::Segment {
                    quest: index + 1,
                    segment: segment + 1,
                    source,
                })?;
            tracing::debug!(
                "quest {} segment {}: {} to {}, distance: {} m, fare: {} {}, duration: {} s",
                index + 1,
                segment + 1,
                origin.name,
                destination.name,
                metric.distance_meters,
                metric.fare,
                metric.currency,
                metric.duration_seconds
            );
            Ok::<_, MetricsError>(metric)
        },
    ))
    .await?;

    Ok(reduce_segments(&segments, mode))
}

/// Fold ordered segment metrics into a quest metric.
///
/// Fare and currency only count for fare-bearing modes; currency comes from
/// the first segment.
pub fn reduce_segments(segments: &[SegmentMetric], mode: TransportMode) -> QuestMetric {
    let total_distance = segments.iter().map(|s| s.distance_meters).sum();
    let total_duration = segments.iter().map(|s| s.duration_seconds).sum();

    let (total_fare, currency) = if mode.bears_fare() {
        (
            segments.iter().map(|s| s.fare).sum(),
            segments
                .first()
                .map(|s| s.currency.clone())
                .unwrap_or_default(),
        )
    } else {
        (0.0, String::new())
    };

    QuestMetric {
        total_distance_meters: Some(total_distance),
        total_fare,
        currency,
        total_duration_seconds: total_duration,
    }
}
