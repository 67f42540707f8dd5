// app.rs - Shared state and router assembly
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{SessionResolver, TokenService};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::{Directory, Store};
use crate::handlers;
use crate::middleware::session::session_middleware;
use crate::services::{Entity, EntityService, MessageService, SchoolService, TimetableService};

/// Request-independent state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub directory: Arc<dyn Directory>,
    pub sessions: Arc<SessionResolver>,
    pub tokens: TokenService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, directory: Arc<dyn Directory>) -> Self {
        let tokens = TokenService::new(&config.security);
        let sessions = Arc::new(SessionResolver::new(tokens.clone(), directory.clone()));
        Self {
            store,
            directory,
            sessions,
            tokens,
            config: Arc::new(config),
        }
    }

    pub fn entities<E: Entity>(&self) -> EntityService<E> {
        EntityService::new(self.store.clone())
    }

    pub fn timetables(&self) -> TimetableService {
        TimetableService::new(self.store.clone(), self.config.timetable.conflict_policy)
    }

    pub fn messages(&self) -> MessageService {
        MessageService::new(self.store.clone(), self.directory.clone())
    }

    pub fn schools(&self) -> SchoolService {
        SchoolService::new(self.directory.clone())
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    let mut router = handlers::routes()
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors);

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
