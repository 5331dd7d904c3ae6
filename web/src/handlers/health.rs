//! Health check endpoints.
//!
//! Liveness says the process is up. Readiness aggregates per-component
//! checks (database, ...) that the application runs itself.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Liveness response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// ```text
/// GET /health  →  200 {"status":"ok"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Result of checking one dependency.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentCheck {
    /// Component name, e.g. `"database"`
    pub component: String,
    /// Whether the component answered
    pub healthy: bool,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentCheck {
    /// A passing check.
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            healthy: true,
            message: None,
        }
    }

    /// A failing check.
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            healthy: false,
            message: Some(message.into()),
        }
    }
}

/// Readiness response body.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// True when every component is healthy
    pub ready: bool,
    /// Individual checks
    pub checks: Vec<ComponentCheck>,
}

/// Build a readiness response: 200 when all checks pass, 503 otherwise.
#[must_use]
pub fn readiness(checks: Vec<ComponentCheck>) -> (StatusCode, Json<ReadinessResponse>) {
    let ready = checks.iter().all(|check| check.healthy);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, checks }))
}
