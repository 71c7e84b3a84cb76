use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Individual health checks
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub model: ComponentHealth,
    pub geocoder: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn healthy(detail: Option<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            detail,
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            detail: None,
            error: Some(error),
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            detail: None,
            error: None,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status != "unhealthy"
    }
}

/// Reports on the artifacts without ever triggering a load.
fn check_model(state: &AppState) -> ComponentHealth {
    match state.context().get() {
        Some(artifacts) => ComponentHealth::healthy(Some(format!(
            "{} trees, {} classes, loaded at {}",
            artifacts.classifier.tree_count(),
            artifacts.classifier.num_class(),
            artifacts.loaded_at.to_rfc3339()
        ))),
        None => ComponentHealth::unhealthy("model artifacts not loaded".to_string()),
    }
}

fn check_geocoder(state: &AppState) -> ComponentHealth {
    if state.geocoder.is_some() {
        ComponentHealth::healthy(Some(state.cfg.geocoder.base_url.clone()))
    } else {
        ComponentHealth::disabled()
    }
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let model = check_model(&state);
    let geocoder = check_geocoder(&state);
    let all_healthy = model.is_healthy() && geocoder.is_healthy();

    let response = HealthResponse {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        checks: HealthChecks { model, geocoder },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(healthy = all_healthy, "Health check completed");
    (status_code, Json(response))
}

/// GET /health/ready - Readiness probe for Kubernetes
///
/// Ready once the model artifacts are in memory
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.context().is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe for Kubernetes
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
