//! Unified error handling for the route-hazard library.
//!
//! This module provides a consistent error type for all route-hazard
//! operations, replacing mixed error handling patterns (Option, panic,
//! silent failures).

use std::fmt;

/// Unified error type for route-hazard operations.
#[derive(Debug, Clone)]
pub enum RouteHazardError {
    /// A route path with zero points was supplied
    EmptyPath,
    /// A coordinate is out of range or non-finite
    InvalidCoordinates { message: String },
    /// The directions provider answered with a non-success status
    DirectionsFailed { status: String },
    /// HTTP/transport error
    Http {
        message: String,
        status_code: Option<u16>,
    },
    /// Hazard data could not be parsed
    DataError { message: String },
    /// The analysis was superseded by a newer request before it could commit
    Superseded,
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for RouteHazardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteHazardError::EmptyPath => {
                write!(f, "Route path contains no points")
            }
            RouteHazardError::InvalidCoordinates { message } => {
                write!(f, "Invalid coordinates: {}", message)
            }
            RouteHazardError::DirectionsFailed { status } => {
                write!(f, "Route failed: {}", status)
            }
            RouteHazardError::Http {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            RouteHazardError::DataError { message } => {
                write!(f, "Hazard data error: {}", message)
            }
            RouteHazardError::Superseded => {
                write!(f, "Analysis superseded by a newer route request")
            }
            RouteHazardError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RouteHazardError {}

/// Result type alias for route-hazard operations.
pub type Result<T> = std::result::Result<T, RouteHazardError>;
