pub use shared::{
    ApiError, ColorBucket, Coordinate, EnclosingCircle, MetricsSnapshot, Quest, QuestMetric,
    QuestOverlay, QuestSummary, SegmentMetric, SegmentQuery, TransportMode, TransportModeRequest,
    UnknownTransportMode, Viewport, Waypoint,
};
