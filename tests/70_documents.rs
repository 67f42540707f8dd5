mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{student, TestApp};

fn document(title: &str, owner_type: &str, owner_id: Option<&str>) -> Value {
    json!({
        "title": title,
        "fileName": format!("{}.pdf", title.to_lowercase().replace(' ', "-")),
        "mimeType": "application/pdf",
        "sizeBytes": 2048,
        "storageKey": format!("docs/{}", Uuid::new_v4()),
        "ownerType": owner_type,
        "ownerId": owner_id,
    })
}

#[tokio::test]
async fn owner_id_must_match_owner_type() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin("docs-owner@school.test").await?;

    let stray = Uuid::new_v4().to_string();
    let (status, body) = app.post(&admin, "/documents", document("Policy", "SCHOOL", Some(&stray))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "ownerId");

    let (status, body) = app.post(&admin, "/documents", document("Report", "STUDENT", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "ownerId");

    let (status, body) = app.post(&admin, "/documents", document("Policy", "SCHOOL", None)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["ownerType"], "SCHOOL");
    assert_eq!(body["data"]["uploadedBy"], admin.user.id.to_string());
    Ok(())
}

#[tokio::test]
async fn unknown_or_foreign_owner_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let alpha = app.admin("docs-alpha@school.test").await?;
    let beta = app.admin("docs-beta@school.test").await?;

    let missing = Uuid::new_v4().to_string();
    let (status, body) = app.post(&alpha, "/documents", document("Report", "STUDENT", Some(&missing))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Student with id {} not found", missing));

    let foreign = app.create(&beta, "/students", student("S1")).await?;
    let (status, _) = app.post(&alpha, "/documents", document("Report", "STUDENT", Some(&foreign))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post(&alpha, "/documents", document("Contract", "TEACHER", Some(&foreign))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn documents_filter_by_owner() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin("docs-filter@school.test").await?;
    let first = app.create(&admin, "/students", student("S1")).await?;
    let second = app.create(&admin, "/students", student("S2")).await?;

    app.create(&admin, "/documents", document("First report", "STUDENT", Some(&first))).await?;
    app.create(&admin, "/documents", document("Second report", "STUDENT", Some(&second))).await?;
    app.create(&admin, "/documents", document("Handbook", "SCHOOL", None)).await?;

    let (status, body) = app.get(&admin, &format!("/documents?ownerType=STUDENT&ownerId={}", first)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["title"], "First report");

    let (_, body) = app.get(&admin, "/documents?ownerType=SCHOOL").await?;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["title"], "Handbook");

    let (_, body) = app.get(&admin, "/documents?ownerType=STUDENT").await?;
    assert_eq!(body["pagination"]["total"], 2);

    let (status, body) = app.delete(&admin, &format!("/students/{}", first)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "HAS_DEPENDENTS");
    Ok(())
}
