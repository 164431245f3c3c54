//! Hazard data loading and spatial indexing.
//!
//! The hazard set is a GeoJSON feature collection derived from a flattened
//! accessibility dataset: each feature carries its coordinates and
//! attributes as flattened property keys (`geometry/coordinates/0`,
//! `properties/severity`, ...) rather than in the geometry member. The
//! index is loaded once per session and never mutated.

use geojson::GeoJson;
use log::{info, warn};
use rstar::{RTree, RTreeObject, AABB};
use serde_json::Value;

use crate::error::{Result, RouteHazardError};
use crate::{GeoPoint, HazardPoint};

// Flattened property keys used by the source dataset
const KEY_LNG: &str = "geometry/coordinates/0";
const KEY_LAT: &str = "geometry/coordinates/1";
const KEY_LABEL: &str = "properties/label_type";
const KEY_SEVERITY: &str = "properties/severity";

/// Position entry for R-tree lookup, keyed by load order.
#[derive(Debug, Clone)]
struct HazardRecord {
    idx: usize,
    position: [f64; 2],
}

impl RTreeObject for HazardRecord {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Owns the session's hazard points plus an R-tree over their positions
/// for bounding-box prefiltering.
pub struct HazardIndex {
    hazards: Vec<HazardPoint>,
    tree: RTree<HazardRecord>,
    skipped: usize,
}

impl HazardIndex {
    /// Build an index from already-validated hazard points.
    pub fn from_points(hazards: Vec<HazardPoint>) -> Self {
        let records = hazards
            .iter()
            .enumerate()
            .map(|(idx, h)| HazardRecord {
                idx,
                position: [h.position.longitude, h.position.latitude],
            })
            .collect();

        Self {
            hazards,
            tree: RTree::bulk_load(records),
            skipped: 0,
        }
    }

    /// Parse a GeoJSON feature collection with flattened property keys.
    ///
    /// Loading is partial-success: a feature missing a coordinate, carrying
    /// a non-finite or out-of-range coordinate, or missing a numeric
    /// severity is skipped with a warning and the rest of the collection
    /// still loads. Severity values may be JSON numbers or numeric strings.
    pub fn from_geojson(data: &str) -> Result<Self> {
        let geojson: GeoJson = data.parse().map_err(|e| RouteHazardError::DataError {
            message: format!("invalid GeoJSON: {}", e),
        })?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(RouteHazardError::DataError {
                    message: "expected a FeatureCollection".to_string(),
                })
            }
        };

        let total = collection.features.len();
        let mut hazards = Vec::with_capacity(total);
        let mut skipped = 0;

        for (i, feature) in collection.features.into_iter().enumerate() {
            let Some(props) = feature.properties else {
                warn!("[HazardIndex] feature {} has no properties, skipping", i);
                skipped += 1;
                continue;
            };

            let lng = props.get(KEY_LNG).and_then(numeric);
            let lat = props.get(KEY_LAT).and_then(numeric);
            let severity = props.get(KEY_SEVERITY).and_then(numeric);

            let (Some(lng), Some(lat), Some(severity)) = (lng, lat, severity) else {
                warn!(
                    "[HazardIndex] feature {} missing coordinates or severity, skipping",
                    i
                );
                skipped += 1;
                continue;
            };

            let position = GeoPoint::new(lat, lng);
            if !position.is_valid() {
                warn!(
                    "[HazardIndex] feature {} has out-of-range position ({}, {}), skipping",
                    i, lat, lng
                );
                skipped += 1;
                continue;
            }

            let label = props
                .get(KEY_LABEL)
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();

            hazards.push(HazardPoint::new(position, label, severity));
        }

        info!(
            "[HazardIndex] Loaded {} hazards ({} of {} features skipped)",
            hazards.len(),
            skipped,
            total
        );

        let mut index = Self::from_points(hazards);
        index.skipped = skipped;
        Ok(index)
    }

    /// All hazards in load order.
    pub fn hazards(&self) -> &[HazardPoint] {
        &self.hazards
    }

    pub fn iter(&self) -> impl Iterator<Item = &HazardPoint> {
        self.hazards.iter()
    }

    pub fn len(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    /// Number of malformed features dropped during the last load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Load-order indexes of hazards whose position falls inside the box.
    pub(crate) fn indexes_in_bounds(&self, bounds: &crate::Bounds) -> Vec<usize> {
        let envelope = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|r| r.idx)
            .collect()
    }
}

/// Coerce a JSON value to a finite f64, accepting numeric strings the way
/// the source dataset requires.
fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}
