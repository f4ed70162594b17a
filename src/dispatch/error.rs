//! Gateway error taxonomy.
//!
//! # Responsibilities
//! - One typed exit per failure class in the request pipeline
//! - Map each class to exactly one client-facing status code
//!
//! # Design Decisions
//! - RegistryDegraded is internal detail; clients see 503 like any
//!   other unavailability
//! - Response bodies stay terse and never echo upstream error detail

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error type for the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no matching route")]
    NotFound,

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("token lacks a required scope")]
    Forbidden,

    #[error("no healthy endpoint available")]
    Unavailable,

    #[error("registry data is stale")]
    RegistryDegraded,

    #[error("request body exceeds the configured limit")]
    BodyTooLarge,

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream request timed out")]
    Timeout,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::Unavailable | GatewayError::RegistryDegraded => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::NotFound => "not_found",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::Forbidden => "forbidden",
            GatewayError::Unavailable => "unavailable",
            GatewayError::RegistryDegraded => "registry_degraded",
            GatewayError::BodyTooLarge => "body_too_large",
            GatewayError::Upstream(_) => "upstream_error",
            GatewayError::Timeout => "timeout",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            GatewayError::NotFound => "No matching route found",
            GatewayError::Unauthorized => "Unauthorized",
            GatewayError::Forbidden => "Forbidden",
            GatewayError::Unavailable | GatewayError::RegistryDegraded => {
                "No healthy backend available"
            }
            GatewayError::BodyTooLarge => "Request body too large",
            GatewayError::Upstream(_) => "Upstream request failed",
            GatewayError::Timeout => "Upstream request timed out",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Body::from(self.message())).into_response()
    }
}
