use std::{fmt, str::FromStr};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    distance::{EARTH_RADIUS_M, haversine_m},
    models::{ColorBucket, Coordinate, EnclosingCircle, Waypoint},
};

/// Relative slack when testing whether a projected point lies inside a circle.
const CONTAINS_EPSILON: f64 = 1e-9;

/// Fixed so the minimal circle is reproducible for a given quest.
const SHUFFLE_SEED: u64 = 0x5EA6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleStrategy {
    /// Centroid of the waypoints, radius to the farthest one.
    #[default]
    Centroid,
    /// Smallest enclosing circle of the projected waypoints.
    Minimal,
}

impl fmt::Display for CircleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircleStrategy::Centroid => f.write_str("centroid"),
            CircleStrategy::Minimal => f.write_str("minimal"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown circle strategy '{0}' (expected centroid or minimal)")]
pub struct UnknownCircleStrategy(pub String);

impl FromStr for CircleStrategy {
    type Err = UnknownCircleStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "centroid" => Ok(CircleStrategy::Centroid),
            "minimal" => Ok(CircleStrategy::Minimal),
            _ => Err(UnknownCircleStrategy(s.to_string())),
        }
    }
}

pub fn enclosing_circle(waypoints: &[Waypoint], strategy: CircleStrategy) -> EnclosingCircle {
    match strategy {
        CircleStrategy::Centroid => compute_enclosing_circle(waypoints),
        CircleStrategy::Minimal => compute_minimal_enclosing_circle(waypoints),
    }
}

/// Circle bounding every waypoint, centred on their planar centroid.
///
/// The centre is the plain mean of latitudes and of longitudes, and the radius
/// is the largest haversine distance from that centre to a waypoint. The result
/// always contains every waypoint but is not the smallest such circle.
///
/// An empty slice yields a zero-radius circle at (0, 0).
pub fn compute_enclosing_circle(waypoints: &[Waypoint]) -> EnclosingCircle {
    if waypoints.is_empty() {
        return EnclosingCircle::EMPTY;
    }
    if let Some(circle) = degenerate_circle(waypoints) {
        return circle;
    }

    let center = centroid(waypoints);
    EnclosingCircle {
        center,
        radius_meters: max_distance_from(center, waypoints),
    }
}

/// Smallest enclosing circle, computed on a local equirectangular projection.
///
/// # Algorithm
///
/// 1. Project every waypoint to metres on a plane tangent at the centroid.
/// 2. Shuffle the points with a fixed seed. Ordered input (a path walking
///    steadily outward) is the cubic worst case of the next step; in random
///    order the expected cost is linear.
/// 3. Run the incremental Welzl construction: walk the points, and whenever
///    one falls outside the current circle rebuild the circle with that
///    point on its boundary (one, two or three support points).
/// 4. Unproject the centre and re-measure the radius with haversine, so the
///    bounding property holds on the sphere and not only on the plane.
///
/// Projection error grows with the spread of the waypoints; for quests spanning
/// a city or a region it is well under a percent.
pub fn compute_minimal_enclosing_circle(waypoints: &[Waypoint]) -> EnclosingCircle {
    if waypoints.is_empty() {
        return EnclosingCircle::EMPTY;
    }
    if let Some(circle) = degenerate_circle(waypoints) {
        return circle;
    }

    let projection = LocalProjection::new(centroid(waypoints));
    let mut points: Vec<Point> = waypoints
        .iter()
        .map(|w| projection.project(w.coordinate()))
        .collect();
    points.shuffle(&mut StdRng::seed_from_u64(SHUFFLE_SEED));
    let planar = welzl(&points);
    let center = projection.unproject(planar.center);

    EnclosingCircle {
        center,
        radius_meters: max_distance_from(center, waypoints),
    }
}

/// Marker colour bucket for a circle radius, by radius rounded to whole km.
pub fn classify_radius(radius_meters: f64) -> ColorBucket {
    let km = (radius_meters / 1000.0).round();

    if km <= 1.0 {
        ColorBucket::UpTo1Km
    } else if km <= 3.0 {
        ColorBucket::UpTo3Km
    } else if km <= 5.0 {
        ColorBucket::UpTo5Km
    } else if km <= 10.0 {
        ColorBucket::UpTo10Km
    } else if km > 10.0 {
        ColorBucket::Over10Km
    } else {
        // NaN
        ColorBucket::UpTo1Km
    }
}

fn degenerate_circle(waypoints: &[Waypoint]) -> Option<EnclosingCircle> {
    let first = waypoints.first()?.coordinate();
    waypoints
        .iter()
        .all(|w| w.coordinate() == first)
        .then_some(EnclosingCircle {
            center: first,
            radius_meters: 0.0,
        })
}

fn centroid(waypoints: &[Waypoint]) -> Coordinate {
    let n = waypoints.len() as f64;
    let (lat_sum, lon_sum) = waypoints
        .iter()
        .fold((0.0, 0.0), |(lat, lon), w| (lat + w.latitude, lon + w.longitude));
    Coordinate {
        lat: lat_sum / n,
        lon: lon_sum / n,
    }
}

fn max_distance_from(center: Coordinate, waypoints: &[Waypoint]) -> f64 {
    waypoints
        .iter()
        .map(|w| haversine_m(center, w.coordinate()))
        .fold(0.0, f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl Point {
    fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn midpoint(self, other: Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PlanarCircle {
    center: Point,
    radius: f64,
}

impl PlanarCircle {
    fn contains(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius * (1.0 + CONTAINS_EPSILON) + CONTAINS_EPSILON
    }

    fn from_two(a: Point, b: Point) -> Self {
        Self {
            center: a.midpoint(b),
            radius: a.distance(b) / 2.0,
        }
    }

    /// Circumcircle of three points, or the widest two-point circle when they
    /// are collinear.
    fn from_three(a: Point, b: Point, c: Point) -> Self {
        let bx = b.x - a.x;
        let by = b.y - a.y;
        let cx = c.x - a.x;
        let cy = c.y - a.y;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let d = 2.0 * (bx * cy - by * cx);

        if d.abs() <= f64::EPSILON * (b2 + c2) {
            return [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)]
                .into_iter()
                .max_by(|x, y| x.radius.total_cmp(&y.radius))
                .unwrap_or_else(|| Self::from_two(a, b));
        }

        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let center = Point {
            x: a.x + ux,
            y: a.y + uy,
        };
        Self {
            center,
            radius: ux.hypot(uy),
        }
    }
}

fn welzl(points: &[Point]) -> PlanarCircle {
    let mut circle = PlanarCircle {
        center: points[0],
        radius: 0.0,
    };

    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = PlanarCircle {
            center: points[i],
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = PlanarCircle::from_two(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(points[k]) {
                    circle = PlanarCircle::from_three(points[i], points[j], points[k]);
                }
            }
        }
    }

    circle
}

/// Equirectangular projection in metres around an origin.
struct LocalProjection {
    origin: Coordinate,
    meters_per_deg_lat: f64,
    meters_per_deg_lon: f64,
}

impl LocalProjection {
    fn new(origin: Coordinate) -> Self {
        let meters_per_deg_lat = EARTH_RADIUS_M * 1f64.to_radians();
        // Keep the scale finite at the poles.
        let meters_per_deg_lon =
            (meters_per_deg_lat * origin.lat.to_radians().cos()).max(f64::EPSILON);
        Self {
            origin,
            meters_per_deg_lat,
            meters_per_deg_lon,
        }
    }

    fn project(&self, coord: Coordinate) -> Point {
        Point {
            x: (coord.lon - self.origin.lon) * self.meters_per_deg_lon,
            y: (coord.lat - self.origin.lat) * self.meters_per_deg_lat,
        }
    }

    fn unproject(&self, point: Point) -> Coordinate {
        Coordinate {
            lat: self.origin.lat + point.y / self.meters_per_deg_lat,
            lon: self.origin.lon + point.x / self.meters_per_deg_lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint::new(format!("{lat},{lon}"), lat, lon)
    }

    #[test]
    fn empty_waypoints_give_origin_sentinel() {
        let circle = compute_enclosing_circle(&[]);
        assert_eq!(circle.center, Coordinate::new(0.0, 0.0));
        assert_eq!(circle.radius_meters, 0.0);
        assert_eq!(compute_minimal_enclosing_circle(&[]), EnclosingCircle::EMPTY);
    }

    #[test]
    fn single_waypoint_has_zero_radius() {
        let circle = compute_enclosing_circle(&[wp(51.5, -0.1)]);
        assert_eq!(circle.center, Coordinate::new(51.5, -0.1));
        assert_eq!(circle.radius_meters, 0.0);
    }

    #[test]
    fn coincident_waypoints_have_zero_radius() {
        let points = vec![wp(0.1, 0.1), wp(0.1, 0.1), wp(0.1, 0.1)];
        assert_eq!(compute_enclosing_circle(&points).radius_meters, 0.0);
        assert_eq!(compute_minimal_enclosing_circle(&points).radius_meters, 0.0);
    }

    #[test]
    fn distinct_waypoints_have_positive_radius() {
        let circle = compute_enclosing_circle(&[wp(51.5, -0.1), wp(51.51, -0.09)]);
        assert!(circle.radius_meters > 0.0);
        assert!((circle.center.lat - 51.505).abs() < 1e-9);
        assert!((circle.center.lon - -0.095).abs() < 1e-9);
    }

    #[test]
    fn centroid_is_pulled_by_clustered_points() {
        // Three points clustered at one end drag the centroid away from the
        // midpoint, so the centroid circle is wider than the minimal one.
        let points = vec![
            wp(51.50, -0.10),
            wp(51.50, -0.10),
            wp(51.50, -0.10),
            wp(51.54, -0.10),
        ];
        let centroid = compute_enclosing_circle(&points);
        let minimal = compute_minimal_enclosing_circle(&points);
        assert!(minimal.radius_meters < centroid.radius_meters);
        // Minimal radius is half the span between the two distinct points.
        let half_span = haversine_m(Coordinate::new(51.50, -0.10), Coordinate::new(51.54, -0.10)) / 2.0;
        assert!((minimal.radius_meters - half_span).abs() < 1.0);
    }

    #[test]
    fn collinear_points_use_widest_pair() {
        let circle = PlanarCircle::from_three(
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 0.0 },
            Point { x: 4.0, y: 0.0 },
        );
        assert_eq!(circle.radius, 2.0);
        assert_eq!(circle.center, Point { x: 2.0, y: 0.0 });
    }

    #[test]
    fn outward_spiral_gets_tight_minimal_circle() {
        let spiral: Vec<Waypoint> = (0..256)
            .map(|i| {
                let t = i as f64 * 0.37;
                let r = 0.0005 * i as f64;
                wp(51.5074 + r * t.sin(), -0.1278 + r * t.cos())
            })
            .collect();

        let minimal = compute_minimal_enclosing_circle(&spiral);
        for w in &spiral {
            assert!(haversine_m(minimal.center, w.coordinate()) <= minimal.radius_meters + 1e-6);
        }
        let centroid = compute_enclosing_circle(&spiral);
        assert!(minimal.radius_meters <= centroid.radius_meters * 1.01 + 1.0);

        let reversed: Vec<Waypoint> = spiral.iter().rev().cloned().collect();
        let again = compute_minimal_enclosing_circle(&reversed);
        assert!((again.radius_meters - minimal.radius_meters).abs() < 0.01);
    }

    #[test]
    fn classify_radius_thresholds() {
        assert_eq!(classify_radius(0.0), ColorBucket::UpTo1Km);
        assert_eq!(classify_radius(1_499.0), ColorBucket::UpTo1Km);
        assert_eq!(classify_radius(1_500.0), ColorBucket::UpTo3Km);
        assert_eq!(classify_radius(3_499.0), ColorBucket::UpTo3Km);
        assert_eq!(classify_radius(3_500.0), ColorBucket::UpTo5Km);
        assert_eq!(classify_radius(5_499.0), ColorBucket::UpTo5Km);
        assert_eq!(classify_radius(5_500.0), ColorBucket::UpTo10Km);
        assert_eq!(classify_radius(10_499.0), ColorBucket::UpTo10Km);
        assert_eq!(classify_radius(10_500.0), ColorBucket::Over10Km);
        assert_eq!(classify_radius(2_000_000.0), ColorBucket::Over10Km);
    }

    #[test]
    fn classify_radius_falls_back_on_nan() {
        assert_eq!(classify_radius(f64::NAN), ColorBucket::UpTo1Km);
    }

    #[test]
    fn strategy_parses_from_str() {
        assert_eq!("Minimal".parse::<CircleStrategy>().unwrap(), CircleStrategy::Minimal);
        assert_eq!("centroid".parse::<CircleStrategy>().unwrap(), CircleStrategy::Centroid);
        assert!("welzl".parse::<CircleStrategy>().is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn waypoints() -> impl Strategy<Value = Vec<Waypoint>> {
            prop::collection::vec((-80.0..=80.0, -170.0..=170.0), 1..12)
                .prop_map(|coords| coords.into_iter().map(|(lat, lon)| wp(lat, lon)).collect())
        }

        /// Waypoints within a city-sized box.
        fn local_waypoints() -> impl Strategy<Value = Vec<Waypoint>> {
            (-60.0..=60.0f64, -170.0..=170.0f64).prop_flat_map(|(lat0, lon0)| {
                prop::collection::vec((-0.2..=0.2f64, -0.2..=0.2f64), 1..12).prop_map(
                    move |offsets| {
                        offsets
                            .into_iter()
                            .map(|(dlat, dlon)| wp(lat0 + dlat, lon0 + dlon))
                            .collect()
                    },
                )
            })
        }

        proptest! {
            #[test]
            fn prop_centroid_circle_bounds_every_waypoint(points in waypoints()) {
                let circle = compute_enclosing_circle(&points);
                prop_assert!(circle.radius_meters >= 0.0);
                for w in &points {
                    prop_assert!(haversine_m(circle.center, w.coordinate()) <= circle.radius_meters + 1e-6);
                }
            }

            #[test]
            fn prop_minimal_circle_bounds_every_waypoint(points in local_waypoints()) {
                let circle = compute_minimal_enclosing_circle(&points);
                for w in &points {
                    prop_assert!(haversine_m(circle.center, w.coordinate()) <= circle.radius_meters + 1e-6);
                }
            }

            #[test]
            fn prop_minimal_circle_not_wider_than_centroid(points in local_waypoints()) {
                let minimal = compute_minimal_enclosing_circle(&points);
                let centroid = compute_enclosing_circle(&points);
                prop_assert!(minimal.radius_meters <= centroid.radius_meters * 1.01 + 1.0);
            }

            #[test]
            fn prop_classify_radius_monotonic(a in 0.0..50_000.0f64, b in 0.0..50_000.0f64) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(classify_radius(lo) <= classify_radius(hi));
            }
        }
    }
}
