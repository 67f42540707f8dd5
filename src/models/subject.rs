use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, numeric_6_2, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, Order};
use crate::services::entity::{Entity, ListFilter, Stamp};
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub code: String,
    /// Weight of the subject in overall averages.
    pub coefficient: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubject {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(custom(function = "numeric_6_2"))]
    pub coefficient: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubject {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(custom(function = "numeric_6_2"))]
    pub coefficient: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubjectFilter {
    pub search: Option<String>,
}

impl ListFilter for SubjectFilter {
    fn conditions(&self) -> Vec<Condition> {
        search_term(&self.search)
            .map(|term| vec![Condition::Search(vec!["name", "code"], term)])
            .unwrap_or_default()
    }
}

impl Entity for Subject {
    const RESOURCE: &'static str = "Subject";
    const TABLE: &'static str = "subjects";

    type Create = CreateSubject;
    type Update = UpdateSubject;
    type Filter = SubjectFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateSubject, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            name: input.name,
            code: input.code,
            coefficient: input.coefficient.unwrap_or(Decimal::ONE),
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateSubject, now: DateTime<Utc>) {
        merge(&mut self.name, input.name);
        merge(&mut self.code, input.code);
        merge(&mut self.coefficient, input.coefficient);
        self.updated_at = now;
    }

    fn check(&self) -> ServiceResult<()> {
        if self.coefficient <= Decimal::ZERO {
            return Err(ServiceError::validation("coefficient", "Coefficient must be greater than zero"));
        }
        Ok(())
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("name")]
    }
}
