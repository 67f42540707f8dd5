// handlers/attendance.rs - Attendance routes beyond plain CRUD
use axum::extract::State;
use axum::routing::post;
use axum::Router;

use super::resource::crud_routes;
use crate::app::AppState;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::TenantContext;
use crate::models::Attendance;
use crate::services::bulk::{mark_register, AttendanceRegister};
use crate::services::BulkReport;
use crate::validation::ValidatedJson;

pub fn routes() -> Router<AppState> {
    crud_routes::<Attendance>("/attendance").route("/attendance/bulk", post(bulk))
}

/// POST /attendance/bulk - marks a class register for one date.
pub async fn bulk(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedJson(register): ValidatedJson<AttendanceRegister>,
) -> ApiResult<BulkReport<Attendance>> {
    let report = mark_register(state.store.clone(), &ctx.scope, ctx.session.user_id, register).await?;
    Ok(ApiResponse::success(report))
}
