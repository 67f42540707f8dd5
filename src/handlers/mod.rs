// handlers/mod.rs - Route table
//
// Public:  /health, /auth/*
// Session: /schools (bootstrap)
// Tenant:  every resource route; TenantContext rejects callers without a school

pub mod attendance;
pub mod auth;
pub mod exports;
pub mod health;
pub mod messages;
pub mod resource;
pub mod schools;
pub mod students;
pub mod timetables;

use axum::Router;

use crate::app::AppState;
use crate::models::{Class, Document, Grade, Level, Room, Subject, Teacher};
use resource::crud_routes;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(schools::routes())
        .merge(crud_routes::<Level>("/levels"))
        .merge(crud_routes::<Class>("/classes"))
        .merge(students::routes())
        .merge(crud_routes::<Teacher>("/teachers"))
        .merge(crud_routes::<Subject>("/subjects"))
        .merge(crud_routes::<Room>("/rooms"))
        .merge(crud_routes::<Grade>("/grades"))
        .merge(attendance::routes())
        .merge(timetables::routes())
        .merge(messages::routes())
        .merge(crud_routes::<Document>("/documents"))
        .merge(exports::routes())
}
