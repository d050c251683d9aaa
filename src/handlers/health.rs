use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use super::AppState;
use crate::database::ConnectionSource;

/// GET /health - pool health and statistics
pub async fn health<S: ConnectionSource>(State(state): State<AppState<S>>) -> Response {
    let health = state.source.health_check().await;
    let now = chrono::Utc::now().to_rfc3339();

    if health.healthy {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": health }
            })),
        )
            .into_response()
    } else {
        tracing::warn!("Health check failed: {}", health.error.as_deref().unwrap_or("unknown"));
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": {
                    "code": "DATABASE_ERROR",
                    "message": "database unavailable",
                    "timestamp": now,
                },
                "data": { "status": "degraded", "database": health }
            })),
        )
            .into_response()
    }
}
