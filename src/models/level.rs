use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, nullable, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, Order};
use crate::services::entity::{Entity, ListFilter, Stamp};

/// A grade level (e.g. "Grade 5"); classes belong to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLevel {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLevel {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct LevelFilter {
    pub search: Option<String>,
}

impl ListFilter for LevelFilter {
    fn conditions(&self) -> Vec<Condition> {
        search_term(&self.search)
            .map(|term| vec![Condition::Search(vec!["name", "code"], term)])
            .unwrap_or_default()
    }
}

impl Entity for Level {
    const RESOURCE: &'static str = "Level";
    const TABLE: &'static str = "levels";

    type Create = CreateLevel;
    type Update = UpdateLevel;
    type Filter = LevelFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateLevel, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            name: input.name,
            code: input.code,
            description: input.description,
            position: input.position.unwrap_or(0),
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateLevel, now: DateTime<Utc>) {
        merge(&mut self.name, input.name);
        merge(&mut self.code, input.code);
        merge(&mut self.description, input.description);
        merge(&mut self.position, input.position);
        self.updated_at = now;
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("position"), Order::asc("name")]
    }
}
