mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{level, teacher, Actor, TestApp};
use schoolhub_api::config::{AppConfig, ConflictPolicy};

struct School {
    admin: Actor,
    timetable: String,
    class_a: String,
    class_b: String,
    teacher: String,
    other_teacher: String,
    subject: String,
    room: String,
}

async fn school(app: &TestApp, email: &str) -> Result<School> {
    let admin = app.admin(email).await?;
    let level_id = app.create(&admin, "/levels", level("G1")).await?;
    let class_a = app
        .create(&admin, "/classes", json!({ "name": "1A", "levelId": level_id, "academicYear": "2024-2025" }))
        .await?;
    let class_b = app
        .create(&admin, "/classes", json!({ "name": "1B", "levelId": level_id, "academicYear": "2024-2025" }))
        .await?;
    let teacher_id = app.create(&admin, "/teachers", teacher("T1")).await?;
    let other_teacher = app.create(&admin, "/teachers", teacher("T2")).await?;
    let subject = app.create(&admin, "/subjects", json!({ "name": "Maths", "code": "MATH" })).await?;
    let room = app.create(&admin, "/rooms", json!({ "name": "R101" })).await?;
    let timetable = app
        .create(
            &admin,
            "/timetables",
            json!({ "name": "2024-2025", "validFrom": "2024-09-01", "validTo": "2025-06-30" }),
        )
        .await?;

    Ok(School { admin, timetable, class_a, class_b, teacher: teacher_id, other_teacher, subject, room })
}

fn slot(s: &School, class: &str, teacher: &str, start: &str, end: &str) -> Value {
    json!({
        "timetableId": s.timetable,
        "classId": class,
        "teacherId": teacher,
        "subjectId": s.subject,
        "roomId": s.room,
        "dayOfWeek": "MON",
        "startTime": start,
        "endTime": end,
    })
}

#[tokio::test]
async fn overlapping_slot_is_stored_with_its_conflicts() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "advisory@school.test").await?;

    let (status, first) = app
        .post(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "08:00:00", "09:00:00"))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["conflicts"], json!([]));
    let first_id = first["data"]["id"].clone();

    let (status, body) = app
        .post(&s.admin, "/timetable-slots", slot(&s, &s.class_b, &s.teacher, "08:30:00", "09:30:00"))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let dimensions: Vec<&str> = body["conflicts"]
        .as_array()
        .map(|c| c.iter().filter_map(|c| c["dimension"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(dimensions, vec!["TEACHER", "ROOM"]);
    assert_eq!(body["conflicts"][0]["slot"]["id"], first_id);
    Ok(())
}

#[tokio::test]
async fn touching_slots_do_not_conflict() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "touching@school.test").await?;

    app.create(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "08:00:00", "09:00:00"))
        .await?;
    let (status, body) = app
        .post(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "09:00:00", "10:00:00"))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["conflicts"], json!([]));
    Ok(())
}

#[tokio::test]
async fn reject_policy_refuses_conflicting_slots() -> Result<()> {
    let mut config = AppConfig::development();
    config.timetable.conflict_policy = ConflictPolicy::Reject;
    let app = TestApp::with_config(config);
    let s = school(&app, "reject@school.test").await?;

    app.create(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "08:00:00", "09:00:00"))
        .await?;
    let (status, body) = app
        .post(&s.admin, "/timetable-slots", slot(&s, &s.class_b, &s.other_teacher, "08:30:00", "09:30:00"))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SLOT_CONFLICT");
    assert_eq!(body["details"]["conflicts"][0]["dimension"], "ROOM");

    let (_, list) = app.get(&s.admin, "/timetable-slots").await?;
    assert_eq!(list["pagination"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn slot_times_must_be_ordered() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "order@school.test").await?;

    let (status, body) = app
        .post(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "10:00:00", "09:00:00"))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "endTime");
    Ok(())
}

#[tokio::test]
async fn conflict_check_excludes_the_edited_slot() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "check@school.test").await?;

    let id = app
        .create(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "08:00:00", "09:00:00"))
        .await?;

    let mut candidate = slot(&s, &s.class_a, &s.teacher, "08:15:00", "08:45:00");
    if let Some(fields) = candidate.as_object_mut() {
        fields.remove("timetableId");
    }
    let path = format!("/timetables/{}/conflicts", s.timetable);

    let (status, body) = app.post(&s.admin, &path, candidate.clone()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let (status, body) = app
        .post(&s.admin, &format!("{}?excludeSlotId={}", path, id), candidate)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn schedule_applies_exceptions() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "schedule@school.test").await?;

    let first = app
        .create(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "08:00:00", "09:00:00"))
        .await?;
    let second = app
        .create(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "09:00:00", "10:00:00"))
        .await?;

    // 2024-09-02 is a Monday
    app.create(
        &s.admin,
        "/timetable-exceptions",
        json!({ "slotId": first, "date": "2024-09-02", "kind": "CANCELLED", "reason": "Staff training" }),
    )
    .await?;
    app.create(
        &s.admin,
        "/timetable-exceptions",
        json!({ "slotId": second, "date": "2024-09-02", "kind": "SUBSTITUTION", "substituteTeacherId": s.other_teacher }),
    )
    .await?;

    let (status, body) = app
        .get(&s.admin, &format!("/timetables/{}/schedule?date=2024-09-02", s.timetable))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dayOfWeek"], "MONDAY");
    let lessons = &body["data"]["lessons"];
    assert_eq!(lessons[0]["status"], "CANCELLED");
    assert_eq!(lessons[0]["reason"], "Staff training");
    assert_eq!(lessons[1]["status"], "SUBSTITUTED");
    assert_eq!(lessons[1]["teacherId"], json!(s.other_teacher));

    // The following Monday is untouched.
    let (_, body) = app
        .get(&s.admin, &format!("/timetables/{}/schedule?date=2024-09-09", s.timetable))
        .await?;
    assert_eq!(body["data"]["lessons"][0]["status"], "SCHEDULED");
    Ok(())
}

#[tokio::test]
async fn exception_date_must_match_the_slot_weekday() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "weekday@school.test").await?;
    let slot_id = app
        .create(&s.admin, "/timetable-slots", slot(&s, &s.class_a, &s.teacher, "08:00:00", "09:00:00"))
        .await?;

    // 2024-09-03 is a Tuesday
    let (status, body) = app
        .post(
            &s.admin,
            "/timetable-exceptions",
            json!({ "slotId": slot_id, "date": "2024-09-03", "kind": "CANCELLED" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "date");

    let (status, body) = app
        .post(
            &s.admin,
            "/timetable-exceptions",
            json!({ "slotId": slot_id, "date": "2024-09-02", "kind": "SUBSTITUTION" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "substituteTeacherId");
    Ok(())
}

#[tokio::test]
async fn slots_list_in_calendar_order() -> Result<()> {
    let app = TestApp::new();
    let s = school(&app, "weekdays@school.test").await?;

    for (day, start) in [("FRIDAY", "08:00:00"), ("MONDAY", "10:00:00"), ("WEDNESDAY", "08:00:00"), ("MONDAY", "08:00:00")] {
        let mut body = slot(&s, &s.class_a, &s.teacher, start, "09:00:00");
        body["dayOfWeek"] = json!(day);
        if start == "10:00:00" {
            body["endTime"] = json!("11:00:00");
        }
        let (status, _) = app.post(&s.admin, "/timetable-slots", body).await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.get(&s.admin, "/timetable-slots").await?;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<(String, String)> = body["data"]
        .as_array()
        .map(|slots| {
            slots
                .iter()
                .map(|slot| {
                    (
                        slot["dayOfWeek"].as_str().unwrap_or_default().to_string(),
                        slot["startTime"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(
        order,
        vec![
            ("MONDAY".to_string(), "08:00:00".to_string()),
            ("MONDAY".to_string(), "10:00:00".to_string()),
            ("WEDNESDAY".to_string(), "08:00:00".to_string()),
            ("FRIDAY".to_string(), "08:00:00".to_string()),
        ]
    );
    Ok(())
}
