//! Distance-threshold sampling of route geometry.
//!
//! Reduces a dense route path to a sparser sequence of points spaced by a
//! minimum great-circle distance, used as the payload for route-level
//! severity prediction.

use crate::error::{Result, RouteHazardError};
use crate::geo_utils::haversine_distance;
use crate::GeoPoint;

/// Sample a path so that consecutive kept points are separated by at least
/// `min_spacing_meters` of along-path distance.
///
/// The first point is always kept. The walk accumulates great-circle
/// distance over consecutive input points and emits the current point
/// whenever the accumulator reaches the threshold, then resets it.
///
/// The final input point is NOT guaranteed to appear in the output: a
/// trailing segment shorter than the threshold is dropped.
///
/// Returns [`RouteHazardError::EmptyPath`] when the path has zero points.
///
/// # Example
/// ```
/// use route_hazard::{sample_path, GeoPoint};
///
/// let path = vec![
///     GeoPoint::new(47.600, -122.33),
///     GeoPoint::new(47.601, -122.33),
///     GeoPoint::new(47.602, -122.33),
/// ];
/// let sampled = sample_path(&path, 30.0).unwrap();
/// assert_eq!(sampled[0], path[0]);
/// ```
pub fn sample_path(path: &[GeoPoint], min_spacing_meters: f64) -> Result<Vec<GeoPoint>> {
    let first = path.first().ok_or(RouteHazardError::EmptyPath)?;

    let mut sampled = vec![*first];
    let mut accumulated = 0.0;
    let mut prev = first;

    for point in &path[1..] {
        accumulated += haversine_distance(prev, point);
        prev = point;

        if accumulated >= min_spacing_meters {
            sampled.push(*point);
            accumulated = 0.0;
        }
    }

    Ok(sampled)
}
