mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn messages_are_private_to_their_parties() -> Result<()> {
    let app = TestApp::new();
    let alice = app.admin("alice@school.test").await?;
    let bob = app.member_of(&alice, "bob@school.test").await?;
    let eve = app.member_of(&alice, "eve@school.test").await?;

    let (status, body) = app
        .post(
            &alice,
            "/messages",
            json!({ "recipientId": bob.user.id, "subject": "Timetable", "body": "See you Monday" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["data"]["senderId"], json!(alice.user.id));

    let (_, inbox) = app.get(&bob, "/messages").await?;
    assert_eq!(inbox["pagination"]["total"], 1);
    let (_, sent) = app.get(&alice, "/messages?box=sent").await?;
    assert_eq!(sent["pagination"]["total"], 1);
    let (_, empty) = app.get(&alice, "/messages?box=inbox").await?;
    assert_eq!(empty["pagination"]["total"], 0);

    let (status, body) = app.get(&eve, &format!("/messages/{}", id)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app.put(&alice, &format!("/messages/{}/read", id), json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.put(&bob, &format!("/messages/{}/read", id), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["readAt"].is_string());

    let (status, _) = app.delete(&eve, &format!("/messages/{}", id)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&bob, &format!("/messages/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn recipients_must_belong_to_the_school() -> Result<()> {
    let app = TestApp::new();
    let alice = app.admin("sender@school.test").await?;
    let stranger = app.admin("stranger@school.test").await?;

    let (status, body) = app
        .post(
            &alice,
            "/messages",
            json!({ "recipientId": stranger.user.id, "subject": "Hi", "body": "Hello" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "recipientId");
    Ok(())
}
