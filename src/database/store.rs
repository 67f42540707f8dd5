use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Membership, NewSchool, NewUser, School, User};
use crate::tenant::TenantScope;

/// A stored record as JSON, keyed by API (camelCase) field names.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint {constraint} violated on {table}")]
    UniqueViolation { table: String, constraint: String },

    #[error("foreign key constraint {constraint} violated on {table}")]
    ForeignKeyViolation { table: String, constraint: String },

    /// Numeric overflow or text too long for its column.
    #[error("value out of range on {table}: {detail}")]
    ValueOutOfRange { table: String, detail: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Typed value used in query conditions so the SQL side can bind native types.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl FieldValue {
    /// Text value holding the serde representation of an enum variant.
    pub fn variant<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::String(s)) => FieldValue::Text(s),
            Ok(other) => FieldValue::Text(other.to_string()),
            Err(_) => FieldValue::Text(String::new()),
        }
    }

    /// The JSON form this value takes inside a stored row.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Date(d) => serde_json::to_value(d).unwrap_or(Value::Null),
            FieldValue::Time(t) => serde_json::to_value(t).unwrap_or(Value::Null),
        }
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A filter predicate over API field names.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, FieldValue),
    Gte(&'static str, FieldValue),
    Lte(&'static str, FieldValue),
    /// Case-insensitive substring match across any of the fields.
    Search(Vec<&'static str>, String),
}

impl Condition {
    pub fn eq(field: &'static str, value: impl Into<FieldValue>) -> Self {
        Condition::Eq(field, value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: &'static str,
    pub direction: SortDirection,
    /// Sort text values by their position in this list instead of
    /// lexically (weekday names, for instance).
    pub ranking: Option<&'static [&'static str]>,
}

impl Order {
    pub fn asc(field: &'static str) -> Self {
        Self { field, direction: SortDirection::Asc, ranking: None }
    }

    pub fn desc(field: &'static str) -> Self {
        Self { field, direction: SortDirection::Desc, ranking: None }
    }

    pub fn ranked(field: &'static str, ranking: &'static [&'static str]) -> Self {
        Self { field, direction: SortDirection::Asc, ranking: Some(ranking) }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub conditions: Vec<Condition>,
    pub order: Vec<Order>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Tenant-scoped record storage. Implementations must restrict every read and
/// write to rows whose `tenantId` equals the scope, and must stamp the scope's
/// tenant onto inserted rows.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, scope: &TenantScope, table: &'static str, row: Row) -> Result<Row, StoreError>;

    async fn fetch(&self, scope: &TenantScope, table: &'static str, id: Uuid) -> Result<Option<Row>, StoreError>;

    async fn select(&self, scope: &TenantScope, table: &'static str, query: &SelectQuery) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, scope: &TenantScope, table: &'static str, conditions: &[Condition]) -> Result<u64, StoreError>;

    /// Replaces the stored row; `None` when no row with this id exists in scope.
    async fn update(&self, scope: &TenantScope, table: &'static str, id: Uuid, row: Row) -> Result<Option<Row>, StoreError>;

    async fn delete(&self, scope: &TenantScope, table: &'static str, id: Uuid) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Users, schools and memberships: the identity data that sits above tenants.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// First active membership of the user, oldest first.
    async fn active_membership(&self, user_id: Uuid) -> Result<Option<Membership>, StoreError>;

    /// Active membership of the user inside the given school.
    async fn membership_in(&self, scope: &TenantScope, user_id: Uuid) -> Result<Option<Membership>, StoreError>;

    async fn find_school(&self, scope: &TenantScope) -> Result<Option<School>, StoreError>;

    /// Creates a school and an active admin membership for its owner.
    async fn bootstrap_school(&self, owner: Uuid, school: NewSchool) -> Result<(School, Membership), StoreError>;
}
