// handlers/resource.rs - CRUD handlers shared by every tenant resource
//
// GET    /{resource}       list (filters + page/limit)
// POST   /{resource}       create
// GET    /{resource}/:id   show
// PUT    /{resource}/:id   partial update
// DELETE /{resource}/:id   delete (refused while children exist)

use axum::async_trait;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::routing::get;
use axum::Router;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::TenantContext;
use crate::services::{Entity, PageParams};
use crate::validation::{SchemaError, ValidatedJson, ValidatedQuery};

/// The `:id` path segment, rejected with a 422 when it is not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ResourceId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| SchemaError::single(Some("id".to_string()), "invalid_type", rejection.body_text()))?;
        Uuid::parse_str(&raw)
            .map(ResourceId)
            .map_err(|_| SchemaError::single(Some("id".to_string()), "invalid_type", "id must be a UUID").into())
    }
}

pub fn crud_routes<E: Entity>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<E>).post(create::<E>))
        .route(&format!("{}/:id", path), get(show::<E>).put(update::<E>).delete(remove::<E>))
}

pub async fn list<E: Entity>(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedQuery(page): ValidatedQuery<PageParams>,
    ValidatedQuery(filter): ValidatedQuery<E::Filter>,
) -> ApiResult<Vec<E>> {
    let page = page.resolve(&state.config.api)?;
    let result = state.entities::<E>().list(&ctx.scope, &filter, page).await?;
    Ok(ApiResponse::paginated(result))
}

pub async fn create<E: Entity>(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedJson(input): ValidatedJson<E::Create>,
) -> ApiResult<E> {
    let entity = state.entities::<E>().create(&ctx.scope, ctx.session.user_id, input).await?;
    Ok(ApiResponse::created(entity))
}

pub async fn show<E: Entity>(State(state): State<AppState>, ctx: TenantContext, ResourceId(id): ResourceId) -> ApiResult<E> {
    let entity = state.entities::<E>().get_by_id(&ctx.scope, id).await?;
    Ok(ApiResponse::success(entity))
}

pub async fn update<E: Entity>(
    State(state): State<AppState>,
    ctx: TenantContext,
    ResourceId(id): ResourceId,
    ValidatedJson(input): ValidatedJson<E::Update>,
) -> ApiResult<E> {
    let entity = state.entities::<E>().update(&ctx.scope, id, input).await?;
    Ok(ApiResponse::success(entity))
}

pub async fn remove<E: Entity>(State(state): State<AppState>, ctx: TenantContext, ResourceId(id): ResourceId) -> ApiResult<()> {
    state.entities::<E>().delete(&ctx.scope, id).await?;
    Ok(ApiResponse::empty())
}
