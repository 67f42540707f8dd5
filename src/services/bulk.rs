//! Batch writes that report per row instead of failing as a whole.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::{Condition, SelectQuery, Store};
use crate::models::attendance::CreateAttendance;
use crate::models::{Attendance, AttendanceStatus, Class, Student};
use crate::services::entity::{BulkReport, Entity, EntityService, Stamp};
use crate::services::error::ServiceResult;
use crate::tenant::TenantScope;

#[derive(Debug, Deserialize, Validate)]
pub struct StudentImport {
    /// Raw rows; each one is validated on its own.
    #[validate(length(min = 1, max = 1000))]
    pub students: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEntry {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// A class register for one day.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRegister {
    pub class_id: Uuid,
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 500), nested)]
    pub records: Vec<RegisterEntry>,
}

pub async fn import_students(
    store: Arc<dyn Store>,
    scope: &TenantScope,
    actor: Uuid,
    import: StudentImport,
) -> ServiceResult<BulkReport<Student>> {
    EntityService::<Student>::new(store).create_many(scope, actor, import.students).await
}

/// Marks every listed student for the day. Existing records for the same
/// student and date are overwritten. Students outside the class fail their row.
pub async fn mark_register(
    store: Arc<dyn Store>,
    scope: &TenantScope,
    actor: Uuid,
    register: AttendanceRegister,
) -> ServiceResult<BulkReport<Attendance>> {
    let classes = EntityService::<Class>::new(store.clone());
    let students = EntityService::<Student>::new(store.clone());
    let attendance = EntityService::<Attendance>::new(store);

    classes.get_by_id(scope, register.class_id).await?;

    let mut report = BulkReport::default();
    for (index, entry) in register.records.into_iter().enumerate() {
        let row = index + 1;
        let student = match students.get_by_id(scope, entry.student_id).await {
            Ok(student) => student,
            Err(err) => {
                report.failed_with(row, err)?;
                continue;
            }
        };
        if student.class_id != Some(register.class_id) {
            report.failed(
                row,
                Some("studentId".to_string()),
                "VALIDATION_ERROR",
                "Student is not enrolled in this class",
            );
            continue;
        }

        let existing = attendance
            .select(
                scope,
                &SelectQuery {
                    conditions: vec![
                        Condition::eq("studentId", entry.student_id),
                        Condition::eq("date", register.date),
                    ],
                    limit: Some(1),
                    ..SelectQuery::default()
                },
            )
            .await?
            .into_iter()
            .next();

        let result = match existing {
            Some(mut record) => {
                record.status = entry.status;
                record.note = entry.note;
                record.class_id = register.class_id;
                record.updated_at = Utc::now();
                attendance.replace(scope, record).await
            }
            None => {
                let input = CreateAttendance {
                    student_id: entry.student_id,
                    class_id: register.class_id,
                    date: register.date,
                    status: entry.status,
                    note: entry.note,
                };
                attendance.insert(scope, Attendance::from_create(input, &Stamp::new(*scope, actor))).await
            }
        };
        match result {
            Ok(record) => report.succeeded(record),
            Err(err) => report.failed_with(row, err)?,
        }
    }

    tracing::info!(
        class_id = %register.class_id,
        date = %register.date,
        marked = report.imported,
        failed = report.failed,
        "attendance register saved"
    );
    Ok(report)
}
