mod common;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new();
    let res = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn anonymous_requests_are_unauthorized() -> Result<()> {
    let app = TestApp::new();
    let res = app.send(Method::GET, "/levels", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let body = res.json()?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["error"], "Authentication required");
    Ok(())
}

#[tokio::test]
async fn invalid_token_is_treated_as_anonymous() -> Result<()> {
    let app = TestApp::new();
    let res = app.send(Method::GET, "/auth/session", Some("not-a-jwt"), None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tenant_routes_require_a_membership() -> Result<()> {
    let app = TestApp::new();
    let loner = app.user("loner@school.test").await?;

    let (status, body) = app.get(&loner, "/students").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Tenant context required");
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn session_reports_the_active_school() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin("admin@school.test").await?;

    let (status, body) = app.get(&admin, "/auth/session").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "admin@school.test");
    assert_eq!(body["data"]["tenantId"], json!(admin.school_id));
    Ok(())
}

#[tokio::test]
async fn bootstrap_creates_school_once() -> Result<()> {
    let app = TestApp::new();
    let founder = app.user("founder@school.test").await?;

    let (status, body) = app
        .post(&founder, "/schools", json!({ "name": "Riverside Primary", "slug": "riverside" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["school"]["slug"], "riverside");

    // The same credential now resolves into the new school.
    let (status, body) = app.get(&founder, "/schools/current").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Riverside Primary");

    let (status, body) = app
        .post(&founder, "/schools", json!({ "name": "Second", "slug": "second" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_MEMBER");
    Ok(())
}

#[tokio::test]
async fn bootstrap_validates_slug() -> Result<()> {
    let app = TestApp::new();
    let founder = app.user("slugs@school.test").await?;

    let (status, body) = app
        .post(&founder, "/schools", json!({ "name": "Bad", "slug": "Not A Slug" }))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "slug");
    Ok(())
}

#[tokio::test]
async fn refresh_issues_a_new_access_cookie() -> Result<()> {
    let app = TestApp::new();
    let pair = {
        let actor = app.admin("refresh@school.test").await?;
        app.tokens.issue_pair(&actor.user)?
    };

    let res = app
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refreshToken": pair.refresh_token })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let cookie = res.header(header::SET_COOKIE).unwrap_or_default();
    assert!(cookie.starts_with("access_token="), "{}", cookie);
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=900"));

    let body = res.json()?;
    assert_eq!(body["data"]["expiresIn"], 900);
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_access_tokens() -> Result<()> {
    let app = TestApp::new();
    let actor = app.admin("wrongkind@school.test").await?;

    let res = app
        .send(Method::POST, "/auth/refresh", None, Some(json!({ "refreshToken": actor.token })))
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_cookie_wins_over_body() -> Result<()> {
    let app = TestApp::new();
    let actor = app.admin("refresh-cookie@school.test").await?;
    let pair = app.tokens.issue_pair(&actor.user)?;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/auth/refresh")
        .header(header::COOKIE, format!("refresh_token={}", pair.refresh_token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(json!({ "refreshToken": actor.token }).to_string()))?;
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_expires_both_cookies() -> Result<()> {
    let app = TestApp::new();
    let res = app.send(Method::POST, "/auth/logout", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);

    let cookies: Vec<String> = res
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin("cookie@school.test").await?;

    let request = axum::http::Request::builder()
        .uri("/auth/session")
        .header(header::COOKIE, format!("theme=dark; access_token={}", admin.token))
        .body(axum::body::Body::empty())?;
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
