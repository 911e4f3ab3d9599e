use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A named stop on a quest's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

/// A quest: display metadata plus an ordered list of waypoints.
/// Waypoint order is the travel path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub name: String,
    pub description: String,
    pub colour: String,
    pub icon: String,
    pub progress: f64,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnclosingCircle {
    pub center: Coordinate,
    pub radius_meters: f64,
}

impl EnclosingCircle {
    pub const EMPTY: Self = Self {
        center: Coordinate { lat: 0.0, lon: 0.0 },
        radius_meters: 0.0,
    };
}

/// Radius bucket used to colour quest markers, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBucket {
    UpTo1Km,
    UpTo3Km,
    UpTo5Km,
    UpTo10Km,
    Over10Km,
}

impl ColorBucket {
    pub const ALL: [ColorBucket; 5] = [
        ColorBucket::UpTo1Km,
        ColorBucket::UpTo3Km,
        ColorBucket::UpTo5Km,
        ColorBucket::UpTo10Km,
        ColorBucket::Over10Km,
    ];

    pub fn marker_colour(self) -> &'static str {
        match self {
            ColorBucket::UpTo1Km => "#FFFFFF",
            ColorBucket::UpTo3Km => "#FFCC00",
            ColorBucket::UpTo5Km => "#FF7700",
            ColorBucket::UpTo10Km => "#FF55B8",
            ColorBucket::Over10Km => "#9955FF",
        }
    }

    pub fn legend_label(self) -> &'static str {
        match self {
            ColorBucket::UpTo1Km => "1km",
            ColorBucket::UpTo3Km => "3km",
            ColorBucket::UpTo5Km => "5km",
            ColorBucket::UpTo10Km => "10km",
            ColorBucket::Over10Km => ">10km",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Driving,
    Walking,
    Bicycling,
    #[default]
    Transit,
}

impl TransportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Driving => "driving",
            TransportMode::Walking => "walking",
            TransportMode::Bicycling => "bicycling",
            TransportMode::Transit => "transit",
        }
    }

    /// Only transit routes carry a fare.
    pub fn bears_fare(self) -> bool {
        matches!(self, TransportMode::Transit)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport mode '{0}' (expected driving, walking, bicycling or transit)")]
pub struct UnknownTransportMode(pub String);

impl FromStr for TransportMode {
    type Err = UnknownTransportMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(TransportMode::Driving),
            "walking" => Ok(TransportMode::Walking),
            "bicycling" => Ok(TransportMode::Bicycling),
            "transit" => Ok(TransportMode::Transit),
            _ => Err(UnknownTransportMode(s.to_string())),
        }
    }
}

/// One routing query: a consecutive waypoint pair under a transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentQuery {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: TransportMode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentMetric {
    pub distance_meters: f64,
    pub fare: f64,
    pub currency: String,
    pub duration_seconds: f64,
}

/// Aggregated travel figures for one quest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestMetric {
    /// `None` when the quest has fewer than two waypoints.
    pub total_distance_meters: Option<f64>,
    pub total_fare: f64,
    pub currency: String,
    pub total_duration_seconds: f64,
}

impl QuestMetric {
    /// Metric for a quest with no route to measure.
    pub fn unroutable() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub generation: u64,
    pub mode: TransportMode,
    /// Index-aligned with the quest list. An entry is `None` only when that
    /// quest's routing failed under per-quest isolation.
    pub metrics: Vec<Option<QuestMetric>>,
}

/// What a display consumer needs to place and colour one quest marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSummary {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub colour: String,
    pub icon: String,
    pub progress: f64,
    pub circle: EnclosingCircle,
    pub bucket: ColorBucket,
    pub marker_colour: String,
    pub legend_label: String,
}

/// Pre-formatted info overlay for a quest marker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl QuestOverlay {
    pub fn from_metric(metric: &QuestMetric) -> Self {
        Self {
            distance: metric
                .total_distance_meters
                .map(|m| format!("{:.2} km", m / 1000.0)),
            fare: (metric.total_fare > 0.0)
                .then(|| format!("{:.2} {}", metric.total_fare, metric.currency)),
            duration: (metric.total_duration_seconds > 0.0)
                .then(|| format!("{:.0} min", metric.total_duration_seconds / 60.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Viewport {
    pub const FALLBACK: Self = Self {
        center: Coordinate {
            lat: 51.5074,
            lon: -0.1278,
        },
        latitude_delta: 0.1,
        longitude_delta: 0.1,
    };

    pub fn centered_on(center: Coordinate) -> Self {
        Self {
            center,
            ..Self::FALLBACK
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransportModeRequest {
    pub mode: TransportMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
