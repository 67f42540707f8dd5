// handlers/health.rs - Liveness and store connectivity
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    if let Err(e) = state.store.health_check().await {
        tracing::error!(error = %e, "store health check failed");
        return Err(ApiError::service_unavailable("Database unavailable"));
    }
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "environment": state.config.environment,
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
