//! Health check endpoints.
//!
//! `/health` is a liveness probe; `/ready` round-trips to the storage backend.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use stayhub_web::handlers::{ComponentCheck, ReadinessResponse};

pub use stayhub_web::handlers::health_check;

/// Readiness check endpoint.
///
/// Returns 200 OK when the storage backend answers, 503 otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/ready
/// # {"ready":true,"checks":[{"component":"postgres","healthy":true}]}
/// ```
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let health = &state.repositories.health;
    let storage = match health.ping().await {
        Ok(()) => ComponentCheck::healthy(health.backend()),
        Err(error) => {
            tracing::warn!(%error, "Storage backend is not ready");
            ComponentCheck::unhealthy(health.backend(), error.to_string())
        },
    };

    stayhub_web::handlers::readiness(vec![storage])
}
