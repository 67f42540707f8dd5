// handlers/exports.rs - File downloads of tenant data
//
// GET /exports/students|grades|attendance?format=CSV|EXCEL&<resource filters>

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::session::TenantContext;
use crate::models::attendance::AttendanceFilter;
use crate::models::grade::GradeFilter;
use crate::models::student::StudentFilter;
use crate::services::export::{attendance_table, grades_table, students_table, today, ExportFile, ExportParams, Table};
use crate::validation::ValidatedQuery;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/exports/students", get(students))
        .route("/exports/grades", get(grades))
        .route("/exports/attendance", get(attendance))
}

fn attachment(table: &Table, params: &ExportParams) -> Response {
    let file = ExportFile::render(table, params.format, today());
    tracing::info!(file = %file.filename, rows = table.rows.len(), "export rendered");
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, file.content_disposition()),
        ],
        file.body,
    )
        .into_response()
}

pub async fn students(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedQuery(params): ValidatedQuery<ExportParams>,
    ValidatedQuery(filter): ValidatedQuery<StudentFilter>,
) -> Result<Response, ApiError> {
    let table = students_table(state.store.clone(), &ctx.scope, &filter).await?;
    Ok(attachment(&table, &params))
}

pub async fn grades(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedQuery(params): ValidatedQuery<ExportParams>,
    ValidatedQuery(filter): ValidatedQuery<GradeFilter>,
) -> Result<Response, ApiError> {
    let table = grades_table(state.store.clone(), &ctx.scope, &filter).await?;
    Ok(attachment(&table, &params))
}

pub async fn attendance(
    State(state): State<AppState>,
    ctx: TenantContext,
    ValidatedQuery(params): ValidatedQuery<ExportParams>,
    ValidatedQuery(filter): ValidatedQuery<AttendanceFilter>,
) -> Result<Response, ApiError> {
    let table = attendance_table(state.store.clone(), &ctx.scope, &filter).await?;
    Ok(attachment(&table, &params))
}
