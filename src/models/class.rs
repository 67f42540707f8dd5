use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, nullable, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, Order};
use crate::services::entity::{Entity, ListFilter, Reference, Stamp};
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub level_id: Uuid,
    pub academic_year: String,
    pub capacity: Option<i32>,
    pub homeroom_teacher_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub level_id: Uuid,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 4, max = 20))]
    pub academic_year: String,
    #[validate(range(min = 1, max = 1000))]
    pub capacity: Option<i32>,
    pub homeroom_teacher_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClass {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub level_id: Option<Uuid>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 4, max = 20))]
    pub academic_year: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub capacity: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub homeroom_teacher_id: Option<Option<Uuid>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClassFilter {
    pub level_id: Option<Uuid>,
    pub academic_year: Option<String>,
    pub homeroom_teacher_id: Option<Uuid>,
    pub search: Option<String>,
}

impl ListFilter for ClassFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(level_id) = self.level_id {
            conditions.push(Condition::eq("levelId", level_id));
        }
        if let Some(year) = &self.academic_year {
            conditions.push(Condition::eq("academicYear", year.as_str()));
        }
        if let Some(teacher_id) = self.homeroom_teacher_id {
            conditions.push(Condition::eq("homeroomTeacherId", teacher_id));
        }
        if let Some(term) = search_term(&self.search) {
            conditions.push(Condition::Search(vec!["name"], term));
        }
        conditions
    }
}

impl Entity for Class {
    const RESOURCE: &'static str = "Class";
    const TABLE: &'static str = "classes";

    type Create = CreateClass;
    type Update = UpdateClass;
    type Filter = ClassFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateClass, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            name: input.name,
            level_id: input.level_id,
            academic_year: input.academic_year,
            capacity: input.capacity,
            homeroom_teacher_id: input.homeroom_teacher_id,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateClass, now: DateTime<Utc>) {
        merge(&mut self.name, input.name);
        merge(&mut self.level_id, input.level_id);
        merge(&mut self.academic_year, input.academic_year);
        merge(&mut self.capacity, input.capacity);
        merge(&mut self.homeroom_teacher_id, input.homeroom_teacher_id);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new("Level", "levels", self.level_id)];
        refs.extend(Reference::optional("Teacher", "teachers", self.homeroom_teacher_id));
        refs
    }

    fn check(&self) -> ServiceResult<()> {
        match self.capacity {
            Some(c) if c < 1 => Err(ServiceError::validation("capacity", "Capacity must be at least 1")),
            _ => Ok(()),
        }
    }

    fn default_order() -> Vec<Order> {
        vec![Order::desc("academicYear"), Order::asc("name")]
    }
}
