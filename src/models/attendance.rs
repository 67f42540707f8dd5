use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{merge, nullable};
use crate::database::{Condition, FieldValue, Order};
use crate::services::entity::{Entity, ListFilter, Reference, Stamp};
use crate::validation::field_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

/// One student's presence in one class on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendance {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendance {
    pub status: Option<AttendanceStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "date_range"))]
pub struct AttendanceFilter {
    pub class_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn date_range(filter: &AttendanceFilter) -> Result<(), ValidationError> {
    match (filter.from, filter.to) {
        (Some(from), Some(to)) if from > to => Err(field_error("to", "date_range", "'to' must not be before 'from'")),
        _ => Ok(()),
    }
}

impl ListFilter for AttendanceFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(class_id) = self.class_id {
            conditions.push(Condition::eq("classId", class_id));
        }
        if let Some(student_id) = self.student_id {
            conditions.push(Condition::eq("studentId", student_id));
        }
        if let Some(status) = &self.status {
            conditions.push(Condition::Eq("status", FieldValue::variant(status)));
        }
        if let Some(date) = self.date {
            conditions.push(Condition::eq("date", date));
        }
        if let Some(from) = self.from {
            conditions.push(Condition::Gte("date", from.into()));
        }
        if let Some(to) = self.to {
            conditions.push(Condition::Lte("date", to.into()));
        }
        conditions
    }
}

impl Entity for Attendance {
    const RESOURCE: &'static str = "Attendance";
    const TABLE: &'static str = "attendance_records";

    type Create = CreateAttendance;
    type Update = UpdateAttendance;
    type Filter = AttendanceFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateAttendance, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            student_id: input.student_id,
            class_id: input.class_id,
            date: input.date,
            status: input.status,
            note: input.note,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateAttendance, now: DateTime<Utc>) {
        merge(&mut self.status, input.status);
        merge(&mut self.note, input.note);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::new("Student", "students", self.student_id),
            Reference::new("Class", "classes", self.class_id),
        ]
    }

    fn default_order() -> Vec<Order> {
        vec![Order::desc("date"), Order::asc("createdAt")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inverted_range_is_rejected_on_to() {
        let err = crate::validation::validate::<AttendanceFilter>(json!({"from": "2024-03-10", "to": "2024-03-01"}))
            .unwrap_err();
        assert_eq!(err.issues[0].field.as_deref(), Some("to"));
    }

    #[test]
    fn range_becomes_bounds() {
        let filter: AttendanceFilter =
            crate::validation::validate(json!({"from": "2024-03-01", "to": "2024-03-10"})).unwrap();
        assert_eq!(filter.conditions().len(), 2);
    }
}
