//! Geometry primitives and distance model (C1).
//!
//! Planning distances are planar Euclidean over (lat, lon) degrees — this
//! is the canonical, order-agnostic metric used consistently across every
//! stage. A conventional 1 degree ≈ 111 km conversion is only used when
//! presenting kilometers to a human or converting a km parameter into a
//! degree epsilon. Haversine is available as an alternate metric for the
//! density-clustering step only (§4.4); it must never be mixed with planar
//! distance within the same plan.

use serde::{Deserialize, Serialize};

/// Conventional conversion used only for human-facing units and for turning
/// a kilometer radius into a degree epsilon.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Mean Earth radius in kilometers, used to convert a km radius into a
/// haversine-native radian epsilon.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the WGS-84 ellipsoid in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Point { lat, lon }
    }

    /// Planar Euclidean distance in decimal degrees.
    pub fn euclidean(&self, other: &Point) -> f64 {
        let dlat = other.lat - self.lat;
        let dlon = other.lon - self.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Manhattan distance in decimal degrees.
    pub fn manhattan(&self, other: &Point) -> f64 {
        (other.lat - self.lat).abs() + (other.lon - self.lon).abs()
    }

    /// Great-circle (haversine) distance in kilometers.
    pub fn haversine_km(&self, other: &Point) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Distance under the given metric. For `Haversine`, the result is in
    /// km; for `Euclidean`/`Manhattan`, it's in decimal degrees. Callers
    /// must not compare distances computed under different metrics.
    pub fn distance(&self, other: &Point, metric: Metric) -> f64 {
        match metric {
            Metric::Euclidean => self.euclidean(other),
            Metric::Manhattan => self.manhattan(other),
            Metric::Haversine => self.haversine_km(other),
        }
    }

    pub fn centroid(points: &[Point]) -> Point {
        let n = points.len().max(1) as f64;
        let (sum_lat, sum_lon) = points
            .iter()
            .fold((0.0, 0.0), |(a, o), p| (a + p.lat, o + p.lon));
        Point::new(sum_lat / n, sum_lon / n)
    }
}

/// Distance metric selectable for the density-clustering step (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Euclidean,
    Haversine,
    Manhattan,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Euclidean
    }
}

impl Metric {
    /// Converts a kilometer radius into this metric's native epsilon unit:
    /// degrees for euclidean/manhattan, radians (scaled by Earth radius)
    /// for haversine.
    pub fn radius_to_epsilon(&self, radius_km: f64) -> f64 {
        match self {
            Metric::Euclidean | Metric::Manhattan => radius_km / KM_PER_DEGREE,
            Metric::Haversine => radius_km / EARTH_RADIUS_KM,
        }
    }
}

/// A straight segment between two points, used for obstacle-crossing tests.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn new(from: Point, to: Point) -> Self {
        Segment { from, to }
    }

    /// Exact segment-segment intersection test (lon, lat treated as x, y).
    ///
    /// Uses the standard orientation-based test; shared/collinear endpoints
    /// count as an intersection so that a route touching a riverbank node
    /// is treated conservatively as a crossing.
    pub fn intersects(&self, other: &Segment) -> bool {
        let p1 = (self.from.lon, self.from.lat);
        let p2 = (self.to.lon, self.to.lat);
        let p3 = (other.from.lon, other.from.lat);
        let p4 = (other.to.lon, other.to.lat);

        let d1 = orientation(p3, p4, p1);
        let d2 = orientation(p3, p4, p2);
        let d3 = orientation(p1, p2, p3);
        let d4 = orientation(p1, p2, p4);

        if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
            && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
        {
            return true;
        }

        if d1 == 0.0 && on_segment(p3, p4, p1) {
            return true;
        }
        if d2 == 0.0 && on_segment(p3, p4, p2) {
            return true;
        }
        if d3 == 0.0 && on_segment(p1, p2, p3) {
            return true;
        }
        if d4 == 0.0 && on_segment(p1, p2, p4) {
            return true;
        }
        false
    }
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Total open-path (Hamiltonian path, no return leg) length through `points`
/// in the order given by `route` (indices into `points`).
pub fn open_path_length(points: &[Point], route: &[usize]) -> f64 {
    route
        .windows(2)
        .map(|w| points[w[0]].euclidean(&points[w[1]]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_is_pythagorean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.euclidean(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_segments_intersect() {
        let a = Segment::new(Point::new(0.0, -1.0), Point::new(0.0, 1.0));
        let b = Segment::new(Point::new(-1.0, 0.0), Point::new(1.0, 0.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let a = Segment::new(Point::new(0.0, 0.0), Point::new(0.0, 1.0));
        let b = Segment::new(Point::new(1.0, 0.0), Point::new(1.0, 1.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn radius_to_epsilon_units() {
        assert!((Metric::Euclidean.radius_to_epsilon(KM_PER_DEGREE) - 1.0).abs() < 1e-9);
        assert!((Metric::Haversine.radius_to_epsilon(EARTH_RADIUS_KM) - 1.0).abs() < 1e-9);
    }
}
