//! HTTP clients for the directions provider and the severity backend.
//!
//! This module provides:
//! - A directions client speaking the provider's status-plus-routes JSON
//!   contract
//! - A backend client for hazard data download, route severity prediction
//!   and map-key bootstrap
//!
//! Both clients carry a request timeout; the prediction call additionally
//! enforces its own deadline so a stalled model server cannot hold a route
//! analysis open indefinitely.

use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteHazardError};
use crate::hazards::HazardIndex;
use crate::pipeline::{
    DirectionsProvider, DirectionsRequest, RoutePlan, SeverityPredictor, TravelMode,
};
use crate::GeoPoint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PREDICTION_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| RouteHazardError::Http {
            message: format!("failed to create HTTP client: {}", e),
            status_code: None,
        })
}

fn transport_error(e: reqwest::Error) -> RouteHazardError {
    RouteHazardError::Http {
        message: e.to_string(),
        status_code: e.status().map(|s| s.as_u16()),
    }
}

// ============================================================================
// Directions Client
// ============================================================================

#[derive(Debug, Serialize)]
struct DirectionsApiRequest<'a> {
    origin: &'a str,
    destination: &'a str,
    mode: TravelMode,
}

#[derive(Debug, Deserialize)]
struct DirectionsApiResponse {
    status: String,
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    /// Route geometry as [lat, lng] pairs
    path: Vec<[f64; 2]>,
}

/// Client for the external directions provider.
///
/// The provider answers with a status string plus zero or more routes;
/// anything other than `"OK"` (or an empty route list) is a
/// [`RouteHazardError::DirectionsFailed`].
#[derive(Debug, Clone)]
pub struct DirectionsClient {
    client: Client,
    endpoint: String,
}

impl DirectionsClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.into(),
        })
    }
}

impl DirectionsProvider for DirectionsClient {
    async fn fetch_route(&self, request: &DirectionsRequest) -> Result<RoutePlan> {
        debug!(
            "[DirectionsClient] requesting {:?} route: {} -> {}",
            request.mode, request.origin, request.destination
        );

        let payload = DirectionsApiRequest {
            origin: &request.origin,
            destination: &request.destination,
            mode: request.mode,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteHazardError::Http {
                message: "directions request failed".to_string(),
                status_code: Some(status.as_u16()),
            });
        }

        let body: DirectionsApiResponse =
            response.json().await.map_err(|e| RouteHazardError::Http {
                message: format!("invalid directions response: {}", e),
                status_code: None,
            })?;

        if body.status != "OK" {
            return Err(RouteHazardError::DirectionsFailed {
                status: body.status,
            });
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or(RouteHazardError::DirectionsFailed {
                status: "ZERO_RESULTS".to_string(),
            })?;

        let path: Vec<GeoPoint> = route
            .path
            .iter()
            .map(|pair| GeoPoint::new(pair[0], pair[1]))
            .collect();

        if let Some(bad) = path.iter().find(|p| !p.is_valid()) {
            return Err(RouteHazardError::InvalidCoordinates {
                message: format!(
                    "directions point ({}, {}) out of range",
                    bad.latitude, bad.longitude
                ),
            });
        }

        debug!("[DirectionsClient] route has {} points", path.len());
        Ok(RoutePlan { path })
    }
}

// ============================================================================
// Backend Client
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictionApiRequest {
    /// Sampled route coordinates as [lat, lng] pairs
    points: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct PredictionApiResponse {
    /// Normalized route severity in [0, 1]
    severity: f64,
}

#[derive(Debug, Deserialize)]
struct MapKeyResponse {
    key: String,
}

/// Client for the severity backend: hazard data, route severity prediction
/// and the map-key bootstrap credential.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: build_client()?,
            base_url,
        })
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RouteHazardError::Http {
                message: format!("GET {} failed", url),
                status_code: Some(status.as_u16()),
            });
        }
        Ok(response)
    }

    /// Download the hazard feature collection and build the session index.
    /// Called once at startup.
    pub async fn fetch_hazards(&self) -> Result<HazardIndex> {
        let url = format!("{}/data/obstacles.json", self.base_url);
        let body = self
            .get_checked(&url)
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        let index = HazardIndex::from_geojson(&body)?;
        info!("[BackendClient] hazard data loaded: {} points", index.len());
        Ok(index)
    }

    /// Fetch the opaque map-provider credential used to bootstrap the
    /// mapping frontend. Not part of the analysis pipeline.
    pub async fn fetch_map_key(&self) -> Result<String> {
        let url = format!("{}/maps-api-key", self.base_url);
        let body: MapKeyResponse =
            self.get_checked(&url)
                .await?
                .json()
                .await
                .map_err(|e| RouteHazardError::Http {
                    message: format!("invalid map key response: {}", e),
                    status_code: None,
                })?;
        Ok(body.key)
    }
}

impl SeverityPredictor for BackendClient {
    async fn predict(&self, sampled: &[GeoPoint]) -> Result<f64> {
        let payload = PredictionApiRequest {
            points: sampled
                .iter()
                .map(|p| [p.latitude, p.longitude])
                .collect(),
        };

        debug!(
            "[BackendClient] requesting severity prediction for {} points",
            payload.points.len()
        );

        let url = format!("{}/predict-route-severity", self.base_url);
        let send = self.client.post(&url).json(&payload).send();

        let response = tokio::time::timeout(PREDICTION_TIMEOUT, send)
            .await
            .map_err(|_| RouteHazardError::Http {
                message: format!(
                    "severity prediction timed out after {}s",
                    PREDICTION_TIMEOUT.as_secs()
                ),
                status_code: None,
            })?
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteHazardError::Http {
                message: "severity prediction failed".to_string(),
                status_code: Some(status.as_u16()),
            });
        }

        let body: PredictionApiResponse =
            response.json().await.map_err(|e| RouteHazardError::Http {
                message: format!("invalid prediction response: {}", e),
                status_code: None,
            })?;

        Ok(body.severity)
    }
}
