// handlers/schools.rs - Tenant bootstrap
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use crate::app::AppState;
use crate::database::models::School;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::{AuthSession, TenantContext};
use crate::services::schools::{Bootstrap, CreateSchool};
use crate::validation::ValidatedJson;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/schools", post(create))
        .route("/schools/current", get(current))
}

/// POST /schools - needs a session but no school yet.
pub async fn create(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    ValidatedJson(input): ValidatedJson<CreateSchool>,
) -> ApiResult<Bootstrap> {
    let bootstrap = state.schools().bootstrap(&session, input).await?;
    Ok(ApiResponse::created(bootstrap))
}

pub async fn current(State(state): State<AppState>, ctx: TenantContext) -> ApiResult<School> {
    Ok(ApiResponse::success(state.schools().current(&ctx.scope).await?))
}
