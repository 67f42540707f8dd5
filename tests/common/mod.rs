#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use schoolhub_api::app::{app, AppState};
use schoolhub_api::auth::{TokenKind, TokenService};
use schoolhub_api::config::AppConfig;
use schoolhub_api::database::models::{system_roles, NewSchool, NewUser, User};
use schoolhub_api::database::{Directory, MemoryStore};

/// The full router over an in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub tokens: TokenService,
}

/// A user acting with a bearer credential, optionally inside a school.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,
    pub school_id: Option<Uuid>,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.bytes).context("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<String> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::development())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new(&config.security);
        let state = AppState::new(config, store.clone(), store.clone());
        Self { router: app(state), store, tokens }
    }

    pub async fn user(&self, email: &str) -> Result<Actor> {
        let user = self
            .store
            .create_user(NewUser { email: email.to_string(), full_name: email.to_string() })
            .await?;
        let token = self.tokens.issue(user.id, &user.email, TokenKind::Access)?;
        Ok(Actor { user, school_id: None, token })
    }

    /// A new user who owns a new school.
    pub async fn admin(&self, email: &str) -> Result<Actor> {
        let mut actor = self.user(email).await?;
        let slug = format!("school-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let (school, _) = self
            .store
            .bootstrap_school(actor.user.id, NewSchool { name: format!("School of {}", email), slug })
            .await?;
        actor.school_id = Some(school.id);
        Ok(actor)
    }

    /// A new user with a teacher membership in `school`.
    pub async fn member_of(&self, school: &Actor, email: &str) -> Result<Actor> {
        let school_id = school.school_id.context("actor has no school")?;
        let mut actor = self.user(email).await?;
        self.store.grant_membership(actor.user.id, school_id, system_roles::TEACHER, true).await;
        actor.school_id = Some(school_id);
        Ok(actor)
    }

    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        Ok(TestResponse { status, headers, bytes })
    }

    pub async fn get(&self, actor: &Actor, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.send(Method::GET, path, Some(&actor.token), None).await?;
        Ok((res.status, res.json()?))
    }

    pub async fn post(&self, actor: &Actor, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.send(Method::POST, path, Some(&actor.token), Some(body)).await?;
        Ok((res.status, res.json()?))
    }

    pub async fn put(&self, actor: &Actor, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.send(Method::PUT, path, Some(&actor.token), Some(body)).await?;
        Ok((res.status, res.json()?))
    }

    pub async fn delete(&self, actor: &Actor, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.send(Method::DELETE, path, Some(&actor.token), None).await?;
        Ok((res.status, res.json()?))
    }

    /// Creates a record and returns its id, failing the test on anything but 201.
    pub async fn create(&self, actor: &Actor, path: &str, body: Value) -> Result<String> {
        let (status, body) = self.post(actor, path, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "POST {} returned {}: {}", path, status, body);
        body["data"]["id"].as_str().map(str::to_string).context("created record has no id")
    }
}

pub fn level(code: &str) -> Value {
    json!({ "name": format!("Level {}", code), "code": code })
}

pub fn teacher(number: &str) -> Value {
    json!({
        "employeeNumber": number,
        "firstName": "Grace",
        "lastName": format!("Hopper {}", number),
        "email": format!("{}@school.test", number.to_lowercase()),
    })
}

pub fn student(number: &str) -> Value {
    json!({ "studentNumber": number, "firstName": "Ada", "lastName": format!("Lovelace {}", number) })
}
