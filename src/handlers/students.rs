// handlers/students.rs - Student routes beyond plain CRUD
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

use super::resource::{crud_routes, ResourceId};
use crate::app::AppState;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::session::TenantContext;
use crate::models::Student;
use crate::services::bulk::{import_students, StudentImport};
use crate::services::grades::{grade_summary, GradeSummary, SummaryParams};
use crate::services::BulkReport;
use crate::validation::{ValidatedJson, ValidatedQuery};

pub fn routes() -> Router<AppState> {
    crud_routes::<Student>("/students")
        .route("/students/import", post(import))
        .route("/students/:id/grade-summary", get(summary))
}

/// POST /students/import - valid rows are stored even when others fail.
pub async fn import(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedJson(input): ValidatedJson<StudentImport>,
) -> ApiResult<BulkReport<Student>> {
    let report = import_students(state.store.clone(), &ctx.scope, ctx.session.user_id, input).await?;
    Ok(ApiResponse::success(report))
}

pub async fn summary(
    State(state): State<AppState>,
    ctx: TenantContext,
    ResourceId(id): ResourceId,
    ValidatedQuery(params): ValidatedQuery<SummaryParams>,
) -> ApiResult<GradeSummary> {
    let summary = grade_summary(state.store.clone(), &ctx.scope, id, &params).await?;
    Ok(ApiResponse::success(summary))
}
