use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, nullable, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, Order};
use crate::services::entity::{Entity, ListFilter, Stamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub building: Option<String>,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 100))]
    pub building: Option<String>,
    #[validate(range(min = 1, max = 5000))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoom {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub building: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub capacity: Option<Option<i32>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RoomFilter {
    pub building: Option<String>,
    pub search: Option<String>,
}

impl ListFilter for RoomFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(building) = &self.building {
            conditions.push(Condition::eq("building", building.as_str()));
        }
        if let Some(term) = search_term(&self.search) {
            conditions.push(Condition::Search(vec!["name", "building"], term));
        }
        conditions
    }
}

impl Entity for Room {
    const RESOURCE: &'static str = "Room";
    const TABLE: &'static str = "rooms";

    type Create = CreateRoom;
    type Update = UpdateRoom;
    type Filter = RoomFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateRoom, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            name: input.name,
            building: input.building,
            capacity: input.capacity,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateRoom, now: DateTime<Utc>) {
        merge(&mut self.name, input.name);
        merge(&mut self.building, input.building);
        merge(&mut self.capacity, input.capacity);
        self.updated_at = now;
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("name")]
    }
}
