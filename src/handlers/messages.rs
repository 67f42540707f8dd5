// handlers/messages.rs - Direct messages between members of a school
use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;

use super::resource::ResourceId;
use crate::app::AppState;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::TenantContext;
use crate::models::message::{CreateMessage, MessageFilter};
use crate::models::Message;
use crate::services::PageParams;
use crate::validation::{ValidatedJson, ValidatedQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list).post(send))
        .route("/messages/:id", get(show).delete(remove))
        .route("/messages/:id/read", put(mark_read))
}

/// GET /messages?box=inbox|sent
pub async fn list(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(filter): ValidatedQuery<MessageFilter>,
) -> ApiResult<Vec<Message>> {
    let page = page.resolve(&state.config.api)?;
    let messages = state
        .messages()
        .list(&ctx.scope, ctx.session.user_id, filter.mailbox, page)
        .await?;
    Ok(ApiResponse::paginated(messages))
}

pub async fn send(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedJson(input): ValidatedJson<CreateMessage>,
) -> ApiResult<Message> {
    let message = state.messages().send(&ctx.scope, ctx.session.user_id, input).await?;
    Ok(ApiResponse::created(message))
}

pub async fn show(State(state): State<AppState>, ctx: TenantContext, ResourceId(id): ResourceId) -> ApiResult<Message> {
    let message = state.messages().get(&ctx.scope, ctx.session.user_id, id).await?;
    Ok(ApiResponse::success(message))
}

pub async fn mark_read(State(state): State<AppState>, ctx: TenantContext, ResourceId(id): ResourceId) -> ApiResult<Message> {
    let message = state.messages().mark_read(&ctx.scope, ctx.session.user_id, id).await?;
    Ok(ApiResponse::success(message))
}

pub async fn remove(State(state): State<AppState>, ctx: TenantContext, ResourceId(id): ResourceId) -> ApiResult<()> {
    state.messages().delete(&ctx.scope, ctx.session.user_id, id).await?;
    Ok(ApiResponse::empty())
}
