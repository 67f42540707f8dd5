use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::trimmed;
use crate::database::{Condition, Order};
use crate::services::entity::{Entity, ListFilter, NoChanges, Stamp};

/// A direct message between two members of the same school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    pub recipient_id: Uuid,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    #[default]
    Inbox,
    Sent,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct MessageFilter {
    #[serde(rename = "box", default)]
    pub mailbox: Mailbox,
}

impl ListFilter for MessageFilter {
    /// Mailbox conditions depend on the caller and are added by the message service.
    fn conditions(&self) -> Vec<Condition> {
        Vec::new()
    }
}

impl Entity for Message {
    const RESOURCE: &'static str = "Message";
    const TABLE: &'static str = "messages";

    type Create = CreateMessage;
    type Update = NoChanges;
    type Filter = MessageFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateMessage, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            sender_id: stamp.actor,
            recipient_id: input.recipient_id,
            subject: input.subject,
            body: input.body,
            read_at: None,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, _input: NoChanges, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn default_order() -> Vec<Order> {
        vec![Order::desc("createdAt")]
    }
}
