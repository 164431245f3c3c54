//! # Route Hazard
//!
//! Walking-route hazard analysis for pedestrian navigation.
//!
//! This library provides:
//! - Distance-threshold sampling of route geometry
//! - Proximity matching of known hazard points against a route polyline
//! - Severity aggregation with an optional remote-predicted route score
//! - An async orchestrator tying directions, prediction and matching together
//!
//! ## Features
//!
//! - **`http`** (default) - HTTP clients for the directions provider and the
//!   severity backend
//!
//! ## Quick Start
//!
//! ```rust
//! use route_hazard::{AnalysisConfig, GeoPoint, HazardIndex, HazardPoint};
//! use route_hazard::proximity::match_hazards;
//! use route_hazard::severity::aggregate;
//!
//! let hazards = HazardIndex::from_points(vec![
//!     HazardPoint::new(GeoPoint::new(47.6010, -122.3321), "SurfaceProblem", 4.0),
//!     HazardPoint::new(GeoPoint::new(47.6500, -122.3000), "Obstacle", 2.0),
//! ]);
//!
//! // A short stretch of 1st Ave passing the first hazard only
//! let path = vec![
//!     GeoPoint::new(47.6000, -122.3321),
//!     GeoPoint::new(47.6020, -122.3321),
//! ];
//!
//! let config = AnalysisConfig::default();
//! let matches = match_hazards(&hazards, &path, &config);
//! let report = aggregate(&matches, None, config.severity_scale);
//!
//! assert_eq!(report.matched_count, 1);
//! assert_eq!(report.average_severity, Some(4.0));
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, RouteHazardError};

// Geographic utilities (haversine, polyline length, unit conversion)
pub mod geo_utils;

// Distance-threshold path sampling
pub mod sampler;
pub use sampler::sample_path;

// Hazard data loading and spatial indexing
pub mod hazards;
pub use hazards::HazardIndex;

// Point-to-polyline proximity matching
pub mod proximity;
pub use proximity::{is_near_path, match_hazards};

// Severity aggregation and display banding
pub mod severity;
pub use severity::{aggregate, SeverityBand, SeverityReport};

// Route analysis orchestration
pub mod pipeline;
pub use pipeline::{
    AnalysisStage, DirectionsProvider, DirectionsRequest, HazardMarker, NoPrediction,
    RouteAnalysis, RouteAnalyzer, RoutePlan, SeverityPredictor, TravelMode,
};

// HTTP clients for the directions provider and the severity backend
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{BackendClient, DirectionsClient};

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude (WGS84 degrees).
///
/// # Example
/// ```
/// use route_hazard::GeoPoint;
/// let point = GeoPoint::new(47.6062, -122.3321); // Seattle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box over geographic points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from geographic points.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Grow the box by a margin, in degrees, on every side.
    pub fn expand(&self, margin_deg: f64) -> Self {
        Self {
            min_lat: self.min_lat - margin_deg,
            max_lat: self.max_lat + margin_deg,
            min_lng: self.min_lng - margin_deg,
            max_lng: self.max_lng + margin_deg,
        }
    }
}

/// A known point-location hazard with a category label and severity score.
///
/// Hazards are loaded once per session and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardPoint {
    pub position: GeoPoint,
    /// Category label, e.g. "SurfaceProblem", "Obstacle", "CurbRamp"
    pub label: String,
    /// Severity on the 1-5 scale
    pub severity: f64,
}

impl HazardPoint {
    pub fn new(position: GeoPoint, label: impl Into<String>, severity: f64) -> Self {
        Self {
            position,
            label: label.into(),
            severity,
        }
    }
}

/// Configuration for route hazard analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum spacing between sampled route points, in meters.
    /// Default: 30.0
    pub min_spacing_meters: f64,

    /// Proximity tolerance for "on route", in coordinate degrees.
    /// Approximates 10-15 meters at mid latitudes and degrades toward the
    /// poles. Default: 0.0001
    pub tolerance_degrees: f64,

    /// Maximum number of hazards matched per analysis. Bounds the cost of
    /// pathologically dense hazard sets. Default: 2000
    pub max_matches: usize,

    /// Upper bound of the local severity scale, used to rescale normalized
    /// remote predictions. Default: 5.0
    pub severity_scale: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_spacing_meters: 30.0,
            tolerance_degrees: 0.0001,
            max_matches: 2000,
            severity_scale: 5.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
