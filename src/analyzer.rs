//! Distribution analyzer (C8): advises clustering/sequencing parameters
//! from the order set's spatial layout alone. Never auto-applied by the
//! planner; purely advisory (§4.8).

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, KM_PER_DEGREE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectBucket {
    Linear,
    Elongated,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityBucket {
    Dense,
    Sparse,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub aspect_ratio: f64,
    pub principal_axis_angle_rad: f64,
    pub hull_area_km2: f64,
    pub density_per_km2: f64,
    pub max_range_km: f64,
    pub likely_crosses_river: bool,
    pub aspect_bucket: AspectBucket,
    pub density_bucket: DensityBucket,
    pub suggestions: Vec<String>,
}

const RIVER_CROSSING_RANGE_KM: f64 = 5.0;
const DENSE_THRESHOLD_PER_KM2: f64 = 100.0;
const SPARSE_THRESHOLD_PER_KM2: f64 = 50.0;

/// Computes the full distribution report over an order set's coordinates.
/// Requires at least 3 distinct points for a meaningful convex hull/PCA;
/// degenerate inputs (0-2 points, or all-collinear) fall back to zero
/// area/density with no bucket-driven suggestions.
pub fn analyze(points: &[Point]) -> DistributionReport {
    let (aspect_ratio, principal_axis_angle_rad) = pca(points);
    let hull = convex_hull(points);
    let mean_lat = points.iter().map(|p| p.lat).sum::<f64>() / points.len().max(1) as f64;
    let km_per_lon_degree = KM_PER_DEGREE * mean_lat.to_radians().cos();

    let hull_area_deg2 = polygon_area(&hull);
    let hull_area_km2 = hull_area_deg2 * KM_PER_DEGREE * km_per_lon_degree;

    let density_per_km2 = if hull_area_km2 > 0.0 {
        points.len() as f64 / hull_area_km2
    } else {
        0.0
    };

    let max_range_km = max_axis_span_km(points, km_per_lon_degree);
    let likely_crosses_river = max_range_km > RIVER_CROSSING_RANGE_KM;

    let aspect_bucket = if aspect_ratio > 3.0 {
        AspectBucket::Linear
    } else if aspect_ratio > 2.0 {
        AspectBucket::Elongated
    } else {
        AspectBucket::Round
    };

    let density_bucket = if density_per_km2 > DENSE_THRESHOLD_PER_KM2 {
        DensityBucket::Dense
    } else if density_per_km2 < SPARSE_THRESHOLD_PER_KM2 {
        DensityBucket::Sparse
    } else {
        DensityBucket::Normal
    };

    let mut suggestions = Vec::new();
    match aspect_bucket {
        AspectBucket::Linear => suggestions.push("group ordering = greedy (linear layout)".to_string()),
        AspectBucket::Elongated => suggestions.push("group ordering = sweep (elongated layout)".to_string()),
        AspectBucket::Round => suggestions.push("group ordering = 2-opt (round layout)".to_string()),
    }
    match density_bucket {
        DensityBucket::Dense => {
            suggestions.push("dense order set: shrink max_group_size and clustering radius".to_string())
        }
        DensityBucket::Sparse => {
            suggestions.push("sparse order set: grow max_group_size and clustering radius".to_string())
        }
        DensityBucket::Normal => {}
    }
    if likely_crosses_river {
        suggestions.push("spread order set: enable obstacle verification and raise penalties".to_string());
    }

    DistributionReport {
        aspect_ratio,
        principal_axis_angle_rad,
        hull_area_km2,
        density_per_km2,
        max_range_km,
        likely_crosses_river,
        aspect_bucket,
        density_bucket,
        suggestions,
    }
}

/// PCA over (lat, lon): returns `(aspect_ratio, principal_axis_angle)` where
/// `aspect_ratio = sqrt(lambda_1 / lambda_2)` for the 2x2 covariance
/// matrix's eigenvalues (lambda_1 >= lambda_2), and the angle is that of the
/// dominant eigenvector from the lon axis.
fn pca(points: &[Point]) -> (f64, f64) {
    if points.len() < 2 {
        return (1.0, 0.0);
    }

    let n = points.len() as f64;
    let mean_lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let mean_lon = points.iter().map(|p| p.lon).sum::<f64>() / n;

    let mut cov_ll = 0.0; // lat-lat
    let mut cov_oo = 0.0; // lon-lon
    let mut cov_lo = 0.0; // lat-lon
    for p in points {
        let dlat = p.lat - mean_lat;
        let dlon = p.lon - mean_lon;
        cov_ll += dlat * dlat;
        cov_oo += dlon * dlon;
        cov_lo += dlat * dlon;
    }
    cov_ll /= n;
    cov_oo /= n;
    cov_lo /= n;

    // Eigenvalues of [[cov_oo, cov_lo], [cov_lo, cov_ll]] (lon, lat order so
    // the angle is measured from the lon/x axis).
    let trace = cov_oo + cov_ll;
    let det = cov_oo * cov_ll - cov_lo * cov_lo;
    let disc = ((trace * trace) / 4.0 - det).max(0.0).sqrt();
    let lambda1 = (trace / 2.0 + disc).max(0.0);
    let lambda2 = (trace / 2.0 - disc).max(1e-15);

    let aspect_ratio = (lambda1 / lambda2).sqrt();

    let angle = if cov_lo.abs() < 1e-15 && cov_oo >= cov_ll {
        0.0
    } else if cov_lo.abs() < 1e-15 {
        std::f64::consts::FRAC_PI_2
    } else {
        (lambda1 - cov_oo).atan2(cov_lo)
    };

    (aspect_ratio, angle)
}

/// Convex hull via the monotone chain algorithm, over (lon, lat) as (x, y).
/// Returns points in counter-clockwise order; empty/degenerate inputs
/// return fewer than 3 points.
fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.lon.partial_cmp(&b.lon).unwrap().then(a.lat.partial_cmp(&b.lat).unwrap()));
    sorted.dedup_by(|a, b| a.lon == b.lon && a.lat == b.lat);
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: Point, a: Point, b: Point| -> f64 {
        (a.lon - o.lon) * (b.lat - o.lat) - (a.lat - o.lat) * (b.lon - o.lon)
    };

    let mut lower: Vec<Point> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace formula, degrees^2, over (lon, lat) as (x, y). Zero for a
/// degenerate (fewer than 3 vertex) hull.
fn polygon_area(hull: &[Point]) -> f64 {
    if hull.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        area += a.lon * b.lat - b.lon * a.lat;
    }
    (area / 2.0).abs()
}

fn max_axis_span_km(points: &[Point], km_per_lon_degree: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let (min_lat, max_lat) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.lat), hi.max(p.lat))
    });
    let (min_lon, max_lon) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.lon), hi.max(p.lon))
    });
    let lat_span_km = (max_lat - min_lat) * KM_PER_DEGREE;
    let lon_span_km = (max_lon - min_lon) * km_per_lon_degree;
    lat_span_km.max(lon_span_km)
}
