//! Point-to-polyline proximity matching.
//!
//! A hazard counts as "on route" when it lies within a fixed tolerance of
//! any edge of the route polyline. Distance is measured point-to-segment in
//! coordinate-degree space, matching the behavior of the mapping provider's
//! `isLocationOnEdge` test: the 0.0001 degree default approximates 10-15
//! meters and is latitude-dependent.

use geo::{Coord, EuclideanDistance, Line, LineString, Point};
use log::debug;

use crate::hazards::HazardIndex;
use crate::{AnalysisConfig, Bounds, GeoPoint, HazardPoint};

fn to_line_string(path: &[GeoPoint]) -> LineString<f64> {
    LineString::new(
        path.iter()
            .map(|p| Coord {
                x: p.longitude,
                y: p.latitude,
            })
            .collect(),
    )
}

/// Minimum degree-space distance from a point to any edge of the polyline.
fn distance_to_polyline(point: &GeoPoint, line: &LineString<f64>) -> f64 {
    let p = Point::new(point.longitude, point.latitude);
    line.lines()
        .map(|segment: Line<f64>| p.euclidean_distance(&segment))
        .fold(f64::INFINITY, f64::min)
}

/// Whether `point` lies within `tolerance_degrees` of any edge of `path`.
///
/// The path is treated as an open polyline, not a closed polygon, and the
/// test handles interior points of segments, not just vertices. A path
/// with fewer than two points has no edges and matches nothing.
///
/// # Example
/// ```
/// use route_hazard::{is_near_path, GeoPoint};
///
/// let path = vec![
///     GeoPoint::new(47.600, -122.33),
///     GeoPoint::new(47.602, -122.33),
/// ];
/// // Mid-segment, not a vertex
/// assert!(is_near_path(&GeoPoint::new(47.601, -122.33), &path, 0.0001));
/// assert!(!is_near_path(&GeoPoint::new(47.601, -122.34), &path, 0.0001));
/// ```
pub fn is_near_path(point: &GeoPoint, path: &[GeoPoint], tolerance_degrees: f64) -> bool {
    if path.len() < 2 {
        return false;
    }
    distance_to_polyline(point, &to_line_string(path)) <= tolerance_degrees
}

/// Match every indexed hazard against the route path, in load order,
/// stopping once `config.max_matches` hazards have matched.
///
/// An R-tree envelope query on the path's tolerance-expanded bounds
/// prefilters candidates before the exact point-to-segment test, so the
/// O(hazards x edges) worst case only applies to hazards near the route's
/// bounding box.
pub fn match_hazards(
    index: &HazardIndex,
    path: &[GeoPoint],
    config: &AnalysisConfig,
) -> Vec<HazardPoint> {
    if path.len() < 2 || index.is_empty() {
        return Vec::new();
    }

    let Some(bounds) = Bounds::from_points(path) else {
        return Vec::new();
    };

    // Candidates inside the expanded box, restored to load order so the
    // match cap cuts off deterministically.
    let mut candidates = index.indexes_in_bounds(&bounds.expand(config.tolerance_degrees));
    candidates.sort_unstable();

    let line = to_line_string(path);
    let mut matches = Vec::new();

    for idx in candidates {
        if matches.len() >= config.max_matches {
            debug!(
                "[match_hazards] match cap of {} reached, stopping early",
                config.max_matches
            );
            break;
        }

        let hazard = &index.hazards()[idx];
        if distance_to_polyline(&hazard.position, &line) <= config.tolerance_degrees {
            matches.push(hazard.clone());
        }
    }

    debug!(
        "[match_hazards] {} of {} hazards on route",
        matches.len(),
        index.len()
    );

    matches
}
