use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "setup-admin",
            "version": version,
            "description": "One-time administrator bootstrap endpoint",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "setup_admin": "/setup-admin, /functions/v1/setup-admin (requires x-setup-token)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.directory.backend();

    match state.directory.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "directory": "ok",
                    "backend": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Directory health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "directory unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "directory": "unavailable",
                        "backend": backend
                    }
                })),
            )
        }
    }
}
