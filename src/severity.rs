//! Severity aggregation and display banding.
//!
//! Combines the local proximity matches into a count and mean severity,
//! optionally carrying a remote-predicted route score alongside. The two
//! numbers come from different sources with different semantics (one counts
//! known hazards, one is a model's holistic route score) and are reported
//! side by side, never blended.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::HazardPoint;

/// Severity summary for a route analysis.
///
/// `average_severity` is `None` when no hazards matched: "no hazards on
/// this route" must stay distinguishable from "average severity of zero".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityReport {
    /// Number of hazards matched on the route
    pub matched_count: usize,
    /// Arithmetic mean of matched severities, `None` when nothing matched
    pub average_severity: Option<f64>,
    /// Remote model score rescaled onto the local severity scale
    pub predicted_severity: Option<f64>,
}

impl fmt::Display for SeverityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.average_severity {
            Some(avg) => write!(
                f,
                "Hazards on route: {} | Average severity: {:.2}",
                self.matched_count, avg
            ),
            None => write!(
                f,
                "Hazards on route: {} | Average severity: No data",
                self.matched_count
            ),
        }
    }
}

/// Display band for a severity score, driving marker icon selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Low,
    Medium,
    High,
}

impl SeverityBand {
    /// Band thresholds: >= 4 high, >= 3 medium, otherwise low. The same
    /// thresholds apply to rescaled predicted scores.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.0 {
            SeverityBand::High
        } else if score >= 3.0 {
            SeverityBand::Medium
        } else {
            SeverityBand::Low
        }
    }

    /// Marker icon color used by the presentation layer.
    pub fn marker_color(&self) -> &'static str {
        match self {
            SeverityBand::High => "red",
            SeverityBand::Medium => "orange",
            SeverityBand::Low => "yellow",
        }
    }
}

/// Aggregate matched hazards into a [`SeverityReport`].
///
/// `predicted` is the remote model's normalized score in [0, 1]; it is
/// clamped into range and rescaled by `severity_scale` onto the local
/// severity scale. The local average and the prediction are independent:
/// either can be present without the other.
pub fn aggregate(
    matches: &[HazardPoint],
    predicted: Option<f64>,
    severity_scale: f64,
) -> SeverityReport {
    let matched_count = matches.len();

    let average_severity = if matched_count > 0 {
        let sum: f64 = matches.iter().map(|h| h.severity).sum();
        Some(sum / matched_count as f64)
    } else {
        None
    };

    let predicted_severity = predicted.map(|score| {
        if !(0.0..=1.0).contains(&score) {
            warn!(
                "[aggregate] predicted score {} outside [0, 1], clamping",
                score
            );
        }
        score.clamp(0.0, 1.0) * severity_scale
    });

    SeverityReport {
        matched_count,
        average_severity,
        predicted_severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;

    fn hazard(severity: f64) -> HazardPoint {
        HazardPoint::new(GeoPoint::new(47.6062, -122.3321), "Obstacle", severity)
    }

    #[test]
    fn test_average_of_matches() {
        let matches = vec![hazard(5.0), hazard(3.0), hazard(4.0)];
        let report = aggregate(&matches, None, 5.0);
        assert_eq!(report.matched_count, 3);
        assert_eq!(report.average_severity, Some(4.0));
        assert_eq!(report.predicted_severity, None);
        assert_eq!(
            report.to_string(),
            "Hazards on route: 3 | Average severity: 4.00"
        );
    }

    #[test]
    fn test_empty_matches_report_no_data() {
        let report = aggregate(&[], None, 5.0);
        assert_eq!(report.matched_count, 0);
        // Never zero and never NaN, the sentinel is None
        assert_eq!(report.average_severity, None);
        assert_eq!(
            report.to_string(),
            "Hazards on route: 0 | Average severity: No data"
        );
    }

    #[test]
    fn test_predicted_rescaled_independently() {
        let report = aggregate(&[], Some(0.8), 5.0);
        assert_eq!(report.matched_count, 0);
        assert_eq!(report.average_severity, None);
        let predicted = report.predicted_severity.unwrap();
        assert!((predicted - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_predicted_clamped() {
        let report = aggregate(&[], Some(1.5), 5.0);
        assert_eq!(report.predicted_severity, Some(5.0));

        let report = aggregate(&[], Some(-0.2), 5.0);
        assert_eq!(report.predicted_severity, Some(0.0));
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(SeverityBand::from_score(5.0), SeverityBand::High);
        assert_eq!(SeverityBand::from_score(4.0), SeverityBand::High);
        assert_eq!(SeverityBand::from_score(3.0), SeverityBand::Medium);
        assert_eq!(SeverityBand::from_score(3.9), SeverityBand::Medium);
        assert_eq!(SeverityBand::from_score(2.0), SeverityBand::Low);
        assert_eq!(SeverityBand::from_score(0.0), SeverityBand::Low);
    }

    #[test]
    fn test_marker_colors() {
        assert_eq!(SeverityBand::High.marker_color(), "red");
        assert_eq!(SeverityBand::Medium.marker_color(), "orange");
        assert_eq!(SeverityBand::Low.marker_color(), "yellow");
    }
}
