//! One generic service instantiated per resource type.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::{schema, Condition, Order, Row, SelectQuery, Store};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::pagination::{PageRequest, Paginated};
use crate::tenant::TenantScope;
use crate::validation;

/// Who is writing, for which school, and when.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub tenant: TenantScope,
    pub actor: Uuid,
    pub now: DateTime<Utc>,
}

impl Stamp {
    pub fn new(tenant: TenantScope, actor: Uuid) -> Self {
        Self { tenant, actor, now: Utc::now() }
    }
}

/// A record id this entity points at, checked inside the caller's school.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub resource: &'static str,
    pub table: &'static str,
    pub id: Uuid,
}

impl Reference {
    pub fn new(resource: &'static str, table: &'static str, id: Uuid) -> Self {
        Self { resource, table, id }
    }

    pub fn optional(resource: &'static str, table: &'static str, id: Option<Uuid>) -> Option<Self> {
        id.map(|id| Self::new(resource, table, id))
    }
}

/// Update payload of resources that cannot be edited through the API.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct NoChanges {}

/// List filter parsed from the query string.
pub trait ListFilter: DeserializeOwned + Validate + Default + Send + Sync {
    fn conditions(&self) -> Vec<Condition>;
}

/// A tenant-scoped resource stored as one row of `TABLE`.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const RESOURCE: &'static str;
    const TABLE: &'static str;

    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;
    type Filter: ListFilter + 'static;

    fn id(&self) -> Uuid;

    fn from_create(input: Self::Create, stamp: &Stamp) -> Self;

    /// Merges a partial update; absent fields keep their stored value.
    fn apply_update(&mut self, input: Self::Update, now: DateTime<Utc>);

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Cross-field rules on the merged record.
    fn check(&self) -> ServiceResult<()> {
        Ok(())
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("createdAt")]
    }
}

/// Per-row outcome of a bulk create.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based position in the submitted batch.
    pub row: usize,
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReport<T> {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowFailure>,
    pub items: Vec<T>,
}

impl<T> Default for BulkReport<T> {
    fn default() -> Self {
        Self { imported: 0, failed: 0, errors: Vec::new(), items: Vec::new() }
    }
}

impl<T> BulkReport<T> {
    pub fn succeeded(&mut self, item: T) {
        self.imported += 1;
        self.items.push(item);
    }

    pub fn failed(&mut self, row: usize, field: Option<String>, code: impl Into<String>, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RowFailure { row, field, code: code.into(), message: message.into() });
    }

    /// Records a row-level service failure. Internal failures abort the batch.
    pub fn failed_with(&mut self, row: usize, err: ServiceError) -> ServiceResult<()> {
        match err {
            ServiceError::Internal(_) => return Err(err),
            ServiceError::Validation { message, code, field, .. } => self.failed(row, field, code, message),
            ServiceError::Conflict { message, code, .. } => self.failed(row, None, code, message),
            ServiceError::NotFound { resource, id } => {
                self.failed(row, None, "NOT_FOUND", format!("{} with id {} not found", resource, id))
            }
            ServiceError::Forbidden(message) => self.failed(row, None, "FORBIDDEN", message),
            ServiceError::Unauthorized(message) => self.failed(row, None, "UNAUTHORIZED", message),
        }
        Ok(())
    }
}

pub struct EntityService<E: Entity> {
    store: Arc<dyn Store>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, _entity: PhantomData }
    }

    pub async fn create(&self, scope: &TenantScope, actor: Uuid, input: E::Create) -> ServiceResult<E> {
        self.insert(scope, E::from_create(input, &Stamp::new(*scope, actor))).await
    }

    /// Stores an already-built entity. Uniqueness is left to the store's
    /// constraints; a collision surfaces as `Conflict`.
    pub async fn insert(&self, scope: &TenantScope, entity: E) -> ServiceResult<E> {
        entity.check()?;
        verify_references(self.store.as_ref(), scope, &entity.references()).await?;

        let stored = self.store.insert(scope, E::TABLE, to_row(&entity)?).await?;
        let entity: E = from_row(stored)?;
        tracing::info!(resource = E::RESOURCE, id = %entity.id(), tenant = %scope, "created");
        Ok(entity)
    }

    pub async fn find(&self, scope: &TenantScope, id: Uuid) -> ServiceResult<Option<E>> {
        tracing::debug!(resource = E::RESOURCE, %id, tenant = %scope, "lookup");
        self.store.fetch(scope, E::TABLE, id).await?.map(from_row).transpose()
    }

    /// Records of other schools are indistinguishable from missing ones.
    pub async fn get_by_id(&self, scope: &TenantScope, id: Uuid) -> ServiceResult<E> {
        self.find(scope, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(E::RESOURCE, id))
    }

    pub async fn list(&self, scope: &TenantScope, filter: &E::Filter, page: PageRequest) -> ServiceResult<Paginated<E>> {
        let conditions = filter.conditions();
        let total = self.store.count(scope, E::TABLE, &conditions).await?;
        let query = SelectQuery {
            conditions,
            order: E::default_order(),
            limit: Some(page.limit),
            offset: page.offset(),
        };
        let items = self.select(scope, &query).await?;
        Ok(Paginated::new(items, page, total))
    }

    /// Every matching record, unpaged.
    pub async fn list_all(&self, scope: &TenantScope, filter: &E::Filter) -> ServiceResult<Vec<E>> {
        let query = SelectQuery {
            conditions: filter.conditions(),
            order: E::default_order(),
            ..SelectQuery::default()
        };
        self.select(scope, &query).await
    }

    pub async fn select(&self, scope: &TenantScope, query: &SelectQuery) -> ServiceResult<Vec<E>> {
        self.store
            .select(scope, E::TABLE, query)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    pub async fn count(&self, scope: &TenantScope, conditions: &[Condition]) -> ServiceResult<u64> {
        Ok(self.store.count(scope, E::TABLE, conditions).await?)
    }

    pub async fn update(&self, scope: &TenantScope, id: Uuid, input: E::Update) -> ServiceResult<E> {
        let mut entity = self.get_by_id(scope, id).await?;
        entity.apply_update(input, Utc::now());
        self.replace(scope, entity).await
    }

    /// Writes back a modified entity, re-running its rules and reference checks.
    pub async fn replace(&self, scope: &TenantScope, entity: E) -> ServiceResult<E> {
        entity.check()?;
        verify_references(self.store.as_ref(), scope, &entity.references()).await?;

        let id = entity.id();
        let stored = self
            .store
            .update(scope, E::TABLE, id, to_row(&entity)?)
            .await?
            .ok_or_else(|| ServiceError::not_found(E::RESOURCE, id))?;
        tracing::info!(resource = E::RESOURCE, %id, tenant = %scope, "updated");
        from_row(stored)
    }

    /// Refuses while child records still point at the row.
    pub async fn delete(&self, scope: &TenantScope, id: Uuid) -> ServiceResult<()> {
        self.get_by_id(scope, id).await?;
        self.guard_dependents(scope, id).await?;

        if !self.store.delete(scope, E::TABLE, id).await? {
            return Err(ServiceError::not_found(E::RESOURCE, id));
        }
        tracing::info!(resource = E::RESOURCE, %id, tenant = %scope, "deleted");
        Ok(())
    }

    async fn guard_dependents(&self, scope: &TenantScope, id: Uuid) -> ServiceResult<()> {
        let Some(def) = schema::table(E::TABLE) else {
            return Ok(());
        };

        let mut blocking = Vec::new();
        for dep in def.dependents {
            let count = self.store.count(scope, dep.table, &[Condition::eq(dep.column, id)]).await?;
            if count > 0 {
                blocking.push((dep.resource, count));
            }
        }
        if blocking.is_empty() {
            return Ok(());
        }

        let summary: Vec<String> = blocking.iter().map(|(r, c)| format!("{} {}", c, r)).collect();
        Err(ServiceError::conflict_with(
            "HAS_DEPENDENTS",
            format!("Cannot delete {}: still referenced by {}", E::RESOURCE, summary.join(", ")),
            Some(json!({
                "dependents": blocking
                    .iter()
                    .map(|(resource, count)| json!({"resource": resource, "count": count}))
                    .collect::<Vec<_>>()
            })),
        ))
    }

    /// Validates and creates each raw row independently; one bad row never
    /// aborts the others.
    pub async fn create_many(&self, scope: &TenantScope, actor: Uuid, rows: Vec<Value>) -> ServiceResult<BulkReport<E>> {
        let mut report = BulkReport::default();
        for (index, raw) in rows.into_iter().enumerate() {
            let row = index + 1;
            let input = match validation::validate::<E::Create>(raw) {
                Ok(input) => input,
                Err(schema) => {
                    let (field, message) = schema.summary();
                    report.failed(row, field, "VALIDATION_ERROR", message);
                    continue;
                }
            };
            match self.create(scope, actor, input).await {
                Ok(entity) => report.succeeded(entity),
                Err(err) => report.failed_with(row, err)?,
            }
        }
        tracing::info!(
            resource = E::RESOURCE,
            imported = report.imported,
            failed = report.failed,
            tenant = %scope,
            "bulk create finished"
        );
        Ok(report)
    }
}

/// Fails with `NotFound` for the first referenced id that does not exist in `scope`.
pub async fn verify_references(store: &dyn Store, scope: &TenantScope, references: &[Reference]) -> ServiceResult<()> {
    for reference in references {
        if store.fetch(scope, reference.table, reference.id).await?.is_none() {
            return Err(ServiceError::not_found(reference.resource, reference.id));
        }
    }
    Ok(())
}

pub fn to_row<T: Serialize>(value: &T) -> ServiceResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(ServiceError::internal(format!("entity serialized to non-object: {}", other))),
        Err(e) => Err(ServiceError::internal(format!("failed to serialize entity: {}", e))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> ServiceResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| ServiceError::internal(format!("failed to decode stored row: {}", e)))
}
