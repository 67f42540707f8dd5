use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::app::AppState;
use crate::auth::session::require_auth;
use crate::auth::{Credentials, Session};
use crate::error::ApiError;
use crate::tenant::TenantScope;

/// Outcome of session resolution, stored in request extensions.
#[derive(Debug, Clone)]
pub struct ResolvedSession(pub Option<Session>);

/// Resolves the caller's session once per request. Anonymous requests pass
/// through; routes that need a principal use [`AuthSession`] or
/// [`TenantContext`].
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = Credentials::from_headers(request.headers(), &state.config.security);
    let session = state.sessions.resolve_session(&credentials).await?;
    request.extensions_mut().insert(ResolvedSession(session));
    Ok(next.run(request).await)
}

fn resolved(parts: &Parts) -> Option<Session> {
    parts
        .extensions
        .get::<ResolvedSession>()
        .and_then(|resolved| resolved.0.clone())
}

/// An authenticated caller, with or without a school.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthSession(require_auth(resolved(parts))?))
    }
}

/// An authenticated caller acting inside their active school.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub session: Session,
    pub scope: TenantScope,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = require_auth(resolved(parts))?;
        let scope = session.require_tenant()?;
        Ok(TenantContext { session, scope })
    }
}
