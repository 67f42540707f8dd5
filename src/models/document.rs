use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, FieldValue, Order};
use crate::services::entity::{Entity, ListFilter, Reference, Stamp};
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    Student,
    Teacher,
    School,
}

/// Metadata of an uploaded file. The bytes live in object storage under
/// `storage_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub owner_type: OwnerType,
    pub owner_id: Option<Uuid>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocument {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 100))]
    pub mime_type: String,
    #[validate(range(min = 0))]
    pub size_bytes: i64,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 500))]
    pub storage_key: String,
    pub owner_type: OwnerType,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocument {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 255))]
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub owner_type: Option<OwnerType>,
    pub owner_id: Option<Uuid>,
    pub search: Option<String>,
}

impl ListFilter for DocumentFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(owner_type) = &self.owner_type {
            conditions.push(Condition::Eq("ownerType", FieldValue::variant(owner_type)));
        }
        if let Some(owner_id) = self.owner_id {
            conditions.push(Condition::eq("ownerId", owner_id));
        }
        if let Some(term) = search_term(&self.search) {
            conditions.push(Condition::Search(vec!["title", "fileName"], term));
        }
        conditions
    }
}

impl Entity for Document {
    const RESOURCE: &'static str = "Document";
    const TABLE: &'static str = "documents";

    type Create = CreateDocument;
    type Update = UpdateDocument;
    type Filter = DocumentFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateDocument, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            title: input.title,
            file_name: input.file_name,
            mime_type: input.mime_type,
            size_bytes: input.size_bytes,
            storage_key: input.storage_key,
            owner_type: input.owner_type,
            owner_id: input.owner_id,
            uploaded_by: stamp.actor,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateDocument, now: DateTime<Utc>) {
        merge(&mut self.title, input.title);
        merge(&mut self.file_name, input.file_name);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        match self.owner_type {
            OwnerType::Student => Reference::optional("Student", "students", self.owner_id).into_iter().collect(),
            OwnerType::Teacher => Reference::optional("Teacher", "teachers", self.owner_id).into_iter().collect(),
            OwnerType::School => Vec::new(),
        }
    }

    fn check(&self) -> ServiceResult<()> {
        match (self.owner_type, self.owner_id) {
            (OwnerType::School, Some(_)) => {
                Err(ServiceError::validation("ownerId", "School documents cannot have an owner id"))
            }
            (OwnerType::Student | OwnerType::Teacher, None) => {
                Err(ServiceError::validation("ownerId", "An owner id is required for this owner type"))
            }
            _ => Ok(()),
        }
    }

    fn default_order() -> Vec<Order> {
        vec![Order::desc("createdAt")]
    }
}
