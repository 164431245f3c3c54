//! Route analysis orchestration.
//!
//! Coordinates the external directions provider, path sampling, the remote
//! severity predictor, proximity matching and aggregation into one
//! pipeline, and owns all per-session state: the hazard index, the
//! configuration and the currently rendered analysis. There are no ambient
//! globals; collaborators are injected through the [`DirectionsProvider`]
//! and [`SeverityPredictor`] seams.
//!
//! At most one analysis can win at a time: every `analyze` call takes a
//! fresh epoch and a run that is no longer the newest when it finishes does
//! not commit (last-call-wins).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteHazardError};
use crate::hazards::HazardIndex;
use crate::proximity::match_hazards;
use crate::sampler::sample_path;
use crate::severity::{aggregate, SeverityBand, SeverityReport};
use crate::{AnalysisConfig, GeoPoint, HazardPoint};

// ============================================================================
// Collaborator Seams
// ============================================================================

/// Travel mode requested from the directions provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
}

/// Origin/destination pair handed to the directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
}

impl DirectionsRequest {
    pub fn walking(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            mode: TravelMode::Walking,
        }
    }
}

/// Route geometry returned by the directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Ordered route geometry, start to end
    pub path: Vec<GeoPoint>,
}

/// External directions provider: origin/destination strings in, route
/// geometry or a failure status out.
pub trait DirectionsProvider {
    fn fetch_route(
        &self,
        request: &DirectionsRequest,
    ) -> impl Future<Output = Result<RoutePlan>> + Send;
}

/// Remote severity model: sampled route coordinates in, a normalized score
/// in [0, 1] out.
pub trait SeverityPredictor {
    fn predict(&self, sampled: &[GeoPoint]) -> impl Future<Output = Result<f64>> + Send;
}

/// Placeholder predictor type for analyzers built without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrediction;

impl SeverityPredictor for NoPrediction {
    async fn predict(&self, _sampled: &[GeoPoint]) -> Result<f64> {
        Err(RouteHazardError::Internal {
            message: "no severity predictor configured".to_string(),
        })
    }
}

// ============================================================================
// Pipeline Output
// ============================================================================

/// A matched hazard prepared for marker placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardMarker {
    pub position: GeoPoint,
    pub label: String,
    pub severity: f64,
    pub band: SeverityBand,
}

impl HazardMarker {
    fn from_hazard(hazard: &HazardPoint) -> Self {
        Self {
            position: hazard.position,
            label: hazard.label.clone(),
            severity: hazard.severity,
            band: SeverityBand::from_score(hazard.severity),
        }
    }
}

/// Complete result of one route analysis, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAnalysis {
    /// Full route geometry from the directions provider
    pub path: Vec<GeoPoint>,
    /// Threshold-spaced subsequence sent to the predictor
    pub sampled_path: Vec<GeoPoint>,
    /// Hazards on the route, in load order, capped
    pub markers: Vec<HazardMarker>,
    pub report: SeverityReport,
}

/// Pipeline stage, for logging and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStage {
    Idle,
    RouteRequested,
    RouteReceived,
    Sampling,
    PredictionPending,
    MatchingComplete,
    Rendered,
    Failed,
}

// ============================================================================
// Route Analyzer
// ============================================================================

struct AnalyzerState {
    stage: AnalysisStage,
    current: Option<RouteAnalysis>,
}

/// Stateful orchestrator for route hazard analysis.
///
/// Owns the hazard index, the configuration and the currently rendered
/// analysis for the session. Each successful [`analyze`](Self::analyze)
/// replaces the previous analysis wholesale, so markers from an earlier
/// route never leak into the next one; a failed analysis leaves the
/// previous one untouched.
pub struct RouteAnalyzer<D, P = NoPrediction> {
    directions: D,
    predictor: Option<P>,
    hazards: HazardIndex,
    config: AnalysisConfig,
    epoch: AtomicU64,
    state: Mutex<AnalyzerState>,
}

impl<D: DirectionsProvider> RouteAnalyzer<D, NoPrediction> {
    /// Build an analyzer without a remote predictor: reports carry local
    /// match data only.
    pub fn new(directions: D, hazards: HazardIndex, config: AnalysisConfig) -> Self {
        Self {
            directions,
            predictor: None,
            hazards,
            config,
            epoch: AtomicU64::new(0),
            state: Mutex::new(AnalyzerState {
                stage: AnalysisStage::Idle,
                current: None,
            }),
        }
    }
}

impl<D: DirectionsProvider, P: SeverityPredictor> RouteAnalyzer<D, P> {
    /// Build an analyzer that also requests a remote severity prediction
    /// for every route.
    pub fn with_predictor(
        directions: D,
        predictor: P,
        hazards: HazardIndex,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            directions,
            predictor: Some(predictor),
            hazards,
            config,
            epoch: AtomicU64::new(0),
            state: Mutex::new(AnalyzerState {
                stage: AnalysisStage::Idle,
                current: None,
            }),
        }
    }

    pub fn hazards(&self) -> &HazardIndex {
        &self.hazards
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Current pipeline stage.
    pub fn stage(&self) -> AnalysisStage {
        self.state().stage
    }

    /// The most recently committed analysis, if any.
    pub fn current(&self) -> Option<RouteAnalysis> {
        self.state().current.clone()
    }

    fn state(&self) -> MutexGuard<'_, AnalyzerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_stage(&self, stage: AnalysisStage) {
        let mut state = self.state();
        debug!("[RouteAnalyzer] {:?} -> {:?}", state.stage, stage);
        state.stage = stage;
    }

    fn fail(&self, err: RouteHazardError) -> RouteHazardError {
        self.set_stage(AnalysisStage::Failed);
        err
    }

    /// Run the full analysis pipeline for a walking route between two
    /// addresses.
    ///
    /// Returns `Ok(None)` without starting the pipeline when either input
    /// is blank. A directions failure surfaces as
    /// [`RouteHazardError::DirectionsFailed`] and leaves the previously
    /// committed analysis untouched. A predictor failure degrades to a
    /// local-only report. A run superseded by a newer `analyze` call
    /// returns [`RouteHazardError::Superseded`] and commits nothing.
    pub async fn analyze(&self, origin: &str, destination: &str) -> Result<Option<RouteAnalysis>> {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Ok(None);
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        self.set_stage(AnalysisStage::RouteRequested);
        let request = DirectionsRequest::walking(origin, destination);
        let plan = self
            .directions
            .fetch_route(&request)
            .await
            .map_err(|e| self.fail(e))?;

        self.set_stage(AnalysisStage::RouteReceived);
        debug!(
            "[RouteAnalyzer] route received with {} points",
            plan.path.len()
        );

        self.set_stage(AnalysisStage::Sampling);
        let sampled = sample_path(&plan.path, self.config.min_spacing_meters)
            .map_err(|e| self.fail(e))?;

        let predicted = match &self.predictor {
            Some(predictor) => {
                self.set_stage(AnalysisStage::PredictionPending);
                match predictor.predict(&sampled).await {
                    Ok(score) => Some(score),
                    Err(e) => {
                        // Local match data is still valid on its own
                        warn!(
                            "[RouteAnalyzer] severity prediction failed ({}), \
                             reporting local data only",
                            e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let matches = match_hazards(&self.hazards, &plan.path, &self.config);
        self.set_stage(AnalysisStage::MatchingComplete);

        let report = aggregate(&matches, predicted, self.config.severity_scale);
        let markers = matches.iter().map(HazardMarker::from_hazard).collect();

        let analysis = RouteAnalysis {
            path: plan.path,
            sampled_path: sampled,
            markers,
            report,
        };

        // Last-call-wins: only the newest request may replace the rendered
        // analysis.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("[RouteAnalyzer] analysis superseded before commit, discarding");
            return Err(RouteHazardError::Superseded);
        }

        {
            let mut state = self.state();
            state.current = Some(analysis.clone());
            state.stage = AnalysisStage::Rendered;
        }

        info!("[RouteAnalyzer] {}", analysis.report);
        Ok(Some(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Straight walk along 1st Ave passing the downtown hazard only.
    fn downtown_path() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(47.5990, -122.3300),
            GeoPoint::new(47.6010, -122.3300),
        ]
    }

    fn test_hazards() -> HazardIndex {
        HazardIndex::from_points(vec![
            HazardPoint::new(GeoPoint::new(47.60, -122.33), "SurfaceProblem", 5.0),
            HazardPoint::new(GeoPoint::new(47.65, -122.30), "Obstacle", 2.0),
        ])
    }

    struct FixedRoute(Vec<GeoPoint>);

    impl DirectionsProvider for FixedRoute {
        async fn fetch_route(&self, _request: &DirectionsRequest) -> Result<RoutePlan> {
            Ok(RoutePlan {
                path: self.0.clone(),
            })
        }
    }

    /// Succeeds on the first call, fails afterwards.
    struct FlakyRoute {
        path: Vec<GeoPoint>,
        calls: AtomicUsize,
    }

    impl DirectionsProvider for FlakyRoute {
        async fn fetch_route(&self, _request: &DirectionsRequest) -> Result<RoutePlan> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(RoutePlan {
                    path: self.path.clone(),
                })
            } else {
                Err(RouteHazardError::DirectionsFailed {
                    status: "NOT_FOUND".to_string(),
                })
            }
        }
    }

    /// Sleeps on the first call only, so two interleaved analyses finish
    /// out of order.
    struct SlowThenFast {
        path: Vec<GeoPoint>,
        calls: AtomicUsize,
    }

    impl DirectionsProvider for SlowThenFast {
        async fn fetch_route(&self, _request: &DirectionsRequest) -> Result<RoutePlan> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(RoutePlan {
                path: self.path.clone(),
            })
        }
    }

    struct FixedPrediction(f64);

    impl SeverityPredictor for FixedPrediction {
        async fn predict(&self, _sampled: &[GeoPoint]) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingPrediction;

    impl SeverityPredictor for FailingPrediction {
        async fn predict(&self, _sampled: &[GeoPoint]) -> Result<f64> {
            Err(RouteHazardError::Http {
                message: "connection refused".to_string(),
                status_code: None,
            })
        }
    }

    #[tokio::test]
    async fn test_route_passing_one_hazard() {
        let analyzer = RouteAnalyzer::new(
            FixedRoute(downtown_path()),
            test_hazards(),
            AnalysisConfig::default(),
        );

        let analysis = analyzer.analyze("Pike Place", "Pioneer Square").await;
        let analysis = analysis.unwrap().unwrap();

        assert_eq!(analysis.report.matched_count, 1);
        assert_eq!(analysis.report.average_severity, Some(5.0));
        assert_eq!(analysis.report.predicted_severity, None);
        assert_eq!(analysis.markers.len(), 1);
        assert_eq!(analysis.markers[0].label, "SurfaceProblem");
        assert_eq!(analysis.markers[0].band, SeverityBand::High);
        assert_eq!(
            analysis.report.to_string(),
            "Hazards on route: 1 | Average severity: 5.00"
        );
        assert_eq!(analyzer.stage(), AnalysisStage::Rendered);
    }

    #[tokio::test]
    async fn test_blank_input_is_noop() {
        let analyzer = RouteAnalyzer::new(
            FixedRoute(downtown_path()),
            test_hazards(),
            AnalysisConfig::default(),
        );

        assert!(analyzer.analyze("", "Pioneer Square").await.unwrap().is_none());
        assert!(analyzer.analyze("Pike Place", "  ").await.unwrap().is_none());
        assert_eq!(analyzer.stage(), AnalysisStage::Idle);
        assert!(analyzer.current().is_none());
    }

    #[tokio::test]
    async fn test_directions_failure_keeps_previous_analysis() {
        let analyzer = RouteAnalyzer::new(
            FlakyRoute {
                path: downtown_path(),
                calls: AtomicUsize::new(0),
            },
            test_hazards(),
            AnalysisConfig::default(),
        );
        analyzer.analyze("a", "b").await.unwrap();
        let before = analyzer.current().unwrap();

        let err = analyzer.analyze("a", "b").await.unwrap_err();
        assert!(matches!(err, RouteHazardError::DirectionsFailed { .. }));
        assert_eq!(analyzer.stage(), AnalysisStage::Failed);

        // The previously rendered analysis is left untouched
        assert_eq!(analyzer.current().unwrap(), before);
    }

    #[tokio::test]
    async fn test_empty_route_fails_sampling() {
        let analyzer = RouteAnalyzer::new(
            FixedRoute(Vec::new()),
            test_hazards(),
            AnalysisConfig::default(),
        );
        let err = analyzer.analyze("a", "b").await.unwrap_err();
        assert!(matches!(err, RouteHazardError::EmptyPath));
        assert_eq!(analyzer.stage(), AnalysisStage::Failed);
    }

    #[tokio::test]
    async fn test_predicted_severity_rescaled() {
        let analyzer = RouteAnalyzer::with_predictor(
            FixedRoute(downtown_path()),
            FixedPrediction(0.8),
            test_hazards(),
            AnalysisConfig::default(),
        );

        let analysis = analyzer.analyze("a", "b").await.unwrap().unwrap();
        let predicted = analysis.report.predicted_severity.unwrap();
        // 0.8 x 5 = 4.00, independent of the local match count
        assert!((predicted - 4.0).abs() < 1e-9);
        assert_eq!(analysis.report.matched_count, 1);
        assert_eq!(analysis.report.average_severity, Some(5.0));
    }

    #[tokio::test]
    async fn test_prediction_failure_falls_back_to_local() {
        let analyzer = RouteAnalyzer::with_predictor(
            FixedRoute(downtown_path()),
            FailingPrediction,
            test_hazards(),
            AnalysisConfig::default(),
        );

        let analysis = analyzer.analyze("a", "b").await.unwrap().unwrap();
        assert_eq!(analysis.report.predicted_severity, None);
        assert_eq!(analysis.report.matched_count, 1);
        assert_eq!(analyzer.stage(), AnalysisStage::Rendered);
    }

    #[tokio::test]
    async fn test_new_analysis_replaces_markers_wholesale() {
        let analyzer = RouteAnalyzer::new(
            FixedRoute(downtown_path()),
            test_hazards(),
            AnalysisConfig::default(),
        );

        analyzer.analyze("a", "b").await.unwrap();
        assert_eq!(analyzer.current().unwrap().markers.len(), 1);

        analyzer.analyze("a", "b").await.unwrap();
        // Same single marker, not accumulated across runs
        assert_eq!(analyzer.current().unwrap().markers.len(), 1);
    }

    #[tokio::test]
    async fn test_superseded_analysis_does_not_commit() {
        let analyzer = RouteAnalyzer::new(
            SlowThenFast {
                path: downtown_path(),
                calls: AtomicUsize::new(0),
            },
            test_hazards(),
            AnalysisConfig::default(),
        );

        let (first, second) = tokio::join!(analyzer.analyze("a", "b"), analyzer.analyze("c", "d"));

        assert!(matches!(first, Err(RouteHazardError::Superseded)));
        let committed = second.unwrap().unwrap();
        assert_eq!(analyzer.current().unwrap(), committed);
    }

    #[tokio::test]
    async fn test_sampled_path_included_in_analysis() {
        // ~445 m of route sampled at 30 m spacing
        let path: Vec<GeoPoint> = (0..40)
            .map(|i| GeoPoint::new(47.6000 + i as f64 * 0.0001, -122.3321))
            .collect();
        let analyzer = RouteAnalyzer::new(
            FixedRoute(path.clone()),
            test_hazards(),
            AnalysisConfig::default(),
        );

        let analysis = analyzer.analyze("a", "b").await.unwrap().unwrap();
        assert_eq!(analysis.path, path);
        assert!(analysis.sampled_path.len() < path.len());
        assert_eq!(analysis.sampled_path[0], path[0]);
    }
}
