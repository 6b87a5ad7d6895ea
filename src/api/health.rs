/// Health check endpoints
///
/// `/health` is a liveness probe and never touches the database.
/// `/health/ready` answers 503 when the database is unreachable.
use crate::{context::AppContext, db};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub version: String,
}

impl HealthStatus {
    fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
}

pub async fn health_basic() -> Json<HealthStatus> {
    Json(HealthStatus::new("ok", "Clinic API is running"))
}

/// Readiness probe - checks the database
pub async fn readiness_probe(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    match db::test_connection(&ctx.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthStatus::new("ok", "Database reachable")),
        ),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus::new("unavailable", "Database unreachable")),
            )
        }
    }
}
