// handlers/auth.rs - Session endpoints
//
// GET  /auth/session   current principal
// POST /auth/refresh   refresh credential -> new access cookie
// POST /auth/logout    clears both cookies

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::cookies::{expired_cookie, session_cookie};
use crate::auth::{Credentials, Session, TokenKind};
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::AuthSession;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(session))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub async fn session(AuthSession(session): AuthSession) -> ApiResult<Session> {
    Ok(ApiResponse::success(session))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refreshed {
    pub access_token: String,
    pub expires_in: i64,
}

/// The refresh cookie wins over a token in the body.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let security = &state.config.security;
    let token = Credentials::from_headers(&headers, security)
        .refresh_token
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| ApiError::unauthorized("Refresh token required"))?;

    let (user, access_token) = state.sessions.refresh(&token).await?;
    let ttl = state.tokens.ttl(TokenKind::Access);
    tracing::info!(user_id = %user.id, "access credential refreshed");

    let cookie = session_cookie(&security.access_cookie, &access_token, ttl, security);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::success(Refreshed { access_token, expires_in: ttl.num_seconds() }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let security = &state.config.security;
    (
        AppendHeaders([
            (header::SET_COOKIE, expired_cookie(&security.access_cookie, security)),
            (header::SET_COOKIE, expired_cookie(&security.refresh_cookie, security)),
        ]),
        ApiResponse::empty(),
    )
}
