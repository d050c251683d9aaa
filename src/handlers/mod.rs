// handlers/mod.rs - generic table endpoints
//
// Every /api route runs behind the caller middleware, which resolves the
// session token into a Caller (anonymous when no token is sent). The access
// policy decides per request what that caller may see or change.

pub mod data;
pub mod find;
pub mod health;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::database::ConnectionSource;
use crate::middleware::{caller_middleware, TokenVerifier};
use crate::services::TableService;

/// Shared handler state, generic over the connection source
pub struct AppState<S: ConnectionSource> {
    pub tables: TableService<S>,
    pub source: Arc<S>,
}

impl<S: ConnectionSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self { tables: self.tables.clone(), source: Arc::clone(&self.source) }
    }
}

impl<S: ConnectionSource> AppState<S> {
    pub fn new(tables: TableService<S>, source: Arc<S>) -> Self {
        Self { tables, source }
    }
}

pub fn router<S: ConnectionSource>(state: AppState<S>, verifier: TokenVerifier) -> Router {
    Router::new()
        .route("/api/find/:table", post(find::find_post::<S>))
        .route("/api/count/:table", post(find::count_post::<S>))
        .route(
            "/api/data/:table",
            post(data::data_post::<S>)
                .patch(data::data_patch::<S>)
                .delete(data::data_delete::<S>),
        )
        .route_layer(from_fn_with_state(verifier, caller_middleware))
        // Public
        .route("/", get(root))
        .route("/health", get(health::health::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "CareLink API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "find": "POST /api/find/:table",
                "count": "POST /api/count/:table",
                "data": "POST|PATCH|DELETE /api/data/:table",
                "health": "GET /health",
            }
        }
    }))
}
