use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, nullable, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, FieldValue, Order};
use crate::services::entity::{Entity, ListFilter, Reference, Stamp};
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
    Transferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub class_id: Option<Uuid>,
    pub enrollment_date: NaiveDate,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50))]
    pub student_number: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(email)]
    pub email: Option<String>,
    pub class_id: Option<Uuid>,
    pub enrollment_date: Option<NaiveDate>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 50))]
    pub student_number: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<Gender>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(email)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub class_id: Option<Option<Uuid>>,
    pub enrollment_date: Option<NaiveDate>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    pub class_id: Option<Uuid>,
    pub status: Option<StudentStatus>,
    pub search: Option<String>,
}

impl ListFilter for StudentFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(class_id) = self.class_id {
            conditions.push(Condition::eq("classId", class_id));
        }
        if let Some(status) = &self.status {
            conditions.push(Condition::Eq("status", FieldValue::variant(status)));
        }
        if let Some(term) = search_term(&self.search) {
            conditions.push(Condition::Search(vec!["firstName", "lastName", "studentNumber", "email"], term));
        }
        conditions
    }
}

impl Entity for Student {
    const RESOURCE: &'static str = "Student";
    const TABLE: &'static str = "students";

    type Create = CreateStudent;
    type Update = UpdateStudent;
    type Filter = StudentFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateStudent, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            student_number: input.student_number,
            first_name: input.first_name,
            last_name: input.last_name,
            date_of_birth: input.date_of_birth,
            gender: input.gender,
            email: input.email.map(|e| e.to_lowercase()),
            class_id: input.class_id,
            enrollment_date: input.enrollment_date.unwrap_or_else(|| stamp.now.date_naive()),
            status: input.status.unwrap_or(StudentStatus::Active),
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateStudent, now: DateTime<Utc>) {
        merge(&mut self.student_number, input.student_number);
        merge(&mut self.first_name, input.first_name);
        merge(&mut self.last_name, input.last_name);
        merge(&mut self.date_of_birth, input.date_of_birth);
        merge(&mut self.gender, input.gender);
        merge(&mut self.email, input.email.map(|e| e.map(|e| e.to_lowercase())));
        merge(&mut self.class_id, input.class_id);
        merge(&mut self.enrollment_date, input.enrollment_date);
        merge(&mut self.status, input.status);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        Reference::optional("Class", "classes", self.class_id).into_iter().collect()
    }

    fn check(&self) -> ServiceResult<()> {
        if let Some(born) = self.date_of_birth {
            if born >= self.enrollment_date {
                return Err(ServiceError::validation(
                    "dateOfBirth",
                    "Date of birth must be before the enrollment date",
                ));
            }
        }
        Ok(())
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("lastName"), Order::asc("firstName")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantScope;
    use serde_json::json;

    fn stamp() -> Stamp {
        Stamp::new(TenantScope::assume(Uuid::new_v4()), Uuid::new_v4())
    }

    #[test]
    fn create_defaults_status_and_enrollment() {
        let input: CreateStudent = crate::validation::validate(json!({
            "studentNumber": " S-001 ",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "Ada@Example.com"
        }))
        .unwrap();
        let stamp = stamp();
        let student = Student::from_create(input, &stamp);
        assert_eq!(student.student_number, "S-001");
        assert_eq!(student.status, StudentStatus::Active);
        assert_eq!(student.enrollment_date, stamp.now.date_naive());
        assert_eq!(student.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn invalid_email_is_a_schema_error() {
        let err = crate::validation::validate::<CreateStudent>(json!({
            "studentNumber": "S-1", "firstName": "A", "lastName": "B", "email": "nope"
        }))
        .unwrap_err();
        assert_eq!(err.issues[0].field.as_deref(), Some("email"));
    }

    #[test]
    fn null_clears_class_on_update() {
        let input: CreateStudent = crate::validation::validate(json!({
            "studentNumber": "S-1", "firstName": "A", "lastName": "B", "classId": Uuid::new_v4()
        }))
        .unwrap();
        let mut student = Student::from_create(input, &stamp());
        let patch: UpdateStudent = crate::validation::validate(json!({"classId": null})).unwrap();
        student.apply_update(patch, Utc::now());
        assert_eq!(student.class_id, None);
        assert!(student.references().is_empty());
    }

    #[test]
    fn birth_after_enrollment_is_rejected() {
        let input: CreateStudent = crate::validation::validate(json!({
            "studentNumber": "S-1", "firstName": "A", "lastName": "B",
            "dateOfBirth": "2020-01-01", "enrollmentDate": "2019-09-01"
        }))
        .unwrap();
        let student = Student::from_create(input, &stamp());
        assert!(matches!(student.check(), Err(ServiceError::Validation { .. })));
    }

    #[test]
    fn filter_builds_conditions() {
        let filter = StudentFilter { class_id: None, status: Some(StudentStatus::Graduated), search: Some("  ".into()) };
        assert_eq!(filter.conditions(), vec![Condition::Eq("status", FieldValue::Text("GRADUATED".into()))]);
    }
}
