// handlers/timetables.rs - Timetables, weekly slots and dated exceptions
//
// Slot writes run the conflict detector; the conflicts found are returned
// next to the stored slot as `conflicts`.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::resource::{crud_routes, list, remove, show, ResourceId};
use crate::app::AppState;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::TenantContext;
use crate::models::timetable::{
    CreateTimetableException, CreateTimetableSlot, UpdateTimetableException, UpdateTimetableSlot,
};
use crate::models::{Timetable, TimetableException, TimetableSlot};
use crate::services::conflicts::{CandidateSlot, SlotConflict};
use crate::services::timetable::{DaySchedule, SlotWrite};
use crate::validation::{ValidatedJson, ValidatedQuery};

pub fn routes() -> Router<AppState> {
    crud_routes::<Timetable>("/timetables")
        .route("/timetables/:id/conflicts", post(check_conflicts))
        .route("/timetables/:id/schedule", get(schedule))
        .route(
            "/timetable-slots",
            get(list::<TimetableSlot>).post(create_slot),
        )
        .route(
            "/timetable-slots/:id",
            get(show::<TimetableSlot>).put(update_slot).delete(remove::<TimetableSlot>),
        )
        .route(
            "/timetable-exceptions",
            get(list::<TimetableException>).post(create_exception),
        )
        .route(
            "/timetable-exceptions/:id",
            get(show::<TimetableException>)
                .put(update_exception)
                .delete(remove::<TimetableException>),
        )
}

fn slot_response(write: SlotWrite, created: bool) -> ApiResponse<TimetableSlot> {
    let response = if created {
        ApiResponse::created(write.slot)
    } else {
        ApiResponse::success(write.slot)
    };
    response.with_meta("conflicts", write.conflicts)
}

pub async fn create_slot(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedJson(input): ValidatedJson<CreateTimetableSlot>,
) -> ApiResult<TimetableSlot> {
    let write = state.timetables().create_slot(&ctx.scope, ctx.session.user_id, input).await?;
    Ok(slot_response(write, true))
}

pub async fn update_slot(
    State(state): State<AppState>,
    ctx: TenantContext,
    ResourceId(id): ResourceId,
    ValidatedJson(input): ValidatedJson<UpdateTimetableSlot>,
) -> ApiResult<TimetableSlot> {
    let write = state.timetables().update_slot(&ctx.scope, id, input).await?;
    Ok(slot_response(write, false))
}

pub async fn create_exception(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedJson(input): ValidatedJson<CreateTimetableException>,
) -> ApiResult<TimetableException> {
    let exception = state.timetables().create_exception(&ctx.scope, ctx.session.user_id, input).await?;
    Ok(ApiResponse::created(exception))
}

pub async fn update_exception(
    State(state): State<AppState>,
    ctx: TenantContext,
    ResourceId(id): ResourceId,
    ValidatedJson(input): ValidatedJson<UpdateTimetableException>,
) -> ApiResult<TimetableException> {
    let exception = state.timetables().update_exception(&ctx.scope, id, input).await?;
    Ok(ApiResponse::success(exception))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConflictQuery {
    /// Slot being edited; it never conflicts with itself.
    pub exclude_slot_id: Option<Uuid>,
}

/// POST /timetables/:id/conflicts - checks a candidate without storing it.
pub async fn check_conflicts(
    State(state): State<AppState>,
    ctx: TenantContext,
    ResourceId(id): ResourceId,
    ValidatedQuery(query): ValidatedQuery<ConflictQuery>,
    ValidatedJson(candidate): ValidatedJson<CandidateSlot>,
) -> ApiResult<Vec<SlotConflict>> {
    let conflicts = state
        .timetables()
        .check_candidate(&ctx.scope, id, candidate, query.exclude_slot_id)
        .await?;
    Ok(ApiResponse::success(conflicts))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleQuery {
    pub date: NaiveDate,
}

/// GET /timetables/:id/schedule?date=YYYY-MM-DD
pub async fn schedule(
    State(state): State<AppState>,
    ctx: TenantContext,
    ResourceId(id): ResourceId,
    ValidatedQuery(query): ValidatedQuery<ScheduleQuery>,
) -> ApiResult<DaySchedule> {
    let schedule = state.timetables().schedule(&ctx.scope, id, query.date).await?;
    Ok(ApiResponse::success(schedule))
}
