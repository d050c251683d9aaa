use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use carelink_api::access::AccessPolicy;
use carelink_api::config::{config, AppConfig};
use carelink_api::database::{ConnectionSource, DynamicRepository, PoolGateway, ResilientExecutor};
use carelink_api::handlers::{self, AppState};
use carelink_api::middleware::TokenVerifier;
use carelink_api::services::TableService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = config();
    init_tracing(config);
    tracing::info!("Starting CareLink API in {:?} mode", config.environment);

    let gateway = Arc::new(PoolGateway::open(&config.pool_config()).context("failed to open database pool")?);
    let executor = ResilientExecutor::new(Arc::clone(&gateway), config.retry_policy())
        .with_slow_query_threshold(config.slow_query_threshold());
    let repository = DynamicRepository::new(executor).with_max_limit(config.filter.max_limit);
    let policy = AccessPolicy::default().with_audit_logging(config.security.enable_audit_logging);
    let state = AppState::new(TableService::new(policy, repository), Arc::clone(&gateway));

    if config.security.jwt_secret.is_empty() {
        tracing::warn!("SECURITY_JWT_SECRET is not set; every bearer token will be rejected");
    }
    let verifier = TokenVerifier::new(&config.security.jwt_secret);

    let mut app = handlers::router(state, verifier).layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));
    if config.security.enable_cors {
        app = app.layer(cors_layer(config));
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("CareLink API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    gateway.shutdown().await;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let default_directive = if config.filter.debug_logging {
        "info,carelink_api::database=debug,carelink_api::access=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)))
        .init();
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
