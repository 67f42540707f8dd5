use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, nullable, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, FieldValue, Order};
use crate::services::entity::{Entity, ListFilter, Stamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeacherStatus {
    Active,
    OnLeave,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: TeacherStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Teacher {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeacher {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50))]
    pub employee_number: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email)]
    pub email: String,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, max = 30))]
    pub phone: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<TeacherStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeacher {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 50))]
    pub employee_number: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub hire_date: Option<Option<NaiveDate>>,
    pub status: Option<TeacherStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct TeacherFilter {
    pub status: Option<TeacherStatus>,
    pub search: Option<String>,
}

impl ListFilter for TeacherFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(status) = &self.status {
            conditions.push(Condition::Eq("status", FieldValue::variant(status)));
        }
        if let Some(term) = search_term(&self.search) {
            conditions.push(Condition::Search(vec!["firstName", "lastName", "employeeNumber", "email"], term));
        }
        conditions
    }
}

impl Entity for Teacher {
    const RESOURCE: &'static str = "Teacher";
    const TABLE: &'static str = "teachers";

    type Create = CreateTeacher;
    type Update = UpdateTeacher;
    type Filter = TeacherFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateTeacher, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            employee_number: input.employee_number,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email.to_lowercase(),
            phone: input.phone,
            hire_date: input.hire_date,
            status: input.status.unwrap_or(TeacherStatus::Active),
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateTeacher, now: DateTime<Utc>) {
        merge(&mut self.employee_number, input.employee_number);
        merge(&mut self.first_name, input.first_name);
        merge(&mut self.last_name, input.last_name);
        merge(&mut self.email, input.email.map(|e| e.to_lowercase()));
        merge(&mut self.phone, input.phone);
        merge(&mut self.hire_date, input.hire_date);
        merge(&mut self.status, input.status);
        self.updated_at = now;
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("lastName"), Order::asc("firstName")]
    }
}
