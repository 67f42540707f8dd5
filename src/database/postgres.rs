use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Postgres, Row as _};
use uuid::Uuid;

use crate::database::columns::columns_to_row;
use crate::database::models::{system_roles, Membership, NewSchool, NewUser, School, User};
use crate::database::query_builder::{QueryBuilder, SqlParam, SqlStatement};
use crate::database::store::{Condition, Directory, FieldValue, Row, SelectQuery, Store, StoreError};
use crate::tenant::TenantScope;

/// Production store backed by a shared Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(&self, table: &str, stmt: &SqlStatement) -> Result<Vec<Row>, StoreError> {
        let mut q = sqlx::query(&stmt.query);
        for p in stmt.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(|e| map_sqlx_error(table, e))?;
        rows.into_iter().map(|r| decode_row(&r)).collect()
    }

    async fn fetch_optional_row(&self, table: &str, stmt: &SqlStatement) -> Result<Option<Row>, StoreError> {
        let mut q = sqlx::query(&stmt.query);
        for p in stmt.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_optional(&self.pool).await.map_err(|e| map_sqlx_error(table, e))?;
        row.map(|r| decode_row(&r)).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, scope: &TenantScope, table: &'static str, row: Row) -> Result<Row, StoreError> {
        let stmt = QueryBuilder::new(table, scope)?.insert(&row)?;
        self.fetch_optional_row(table, &stmt)
            .await?
            .ok_or_else(|| StoreError::InvalidRow(format!("insert into {} returned no row", table)))
    }

    async fn fetch(&self, scope: &TenantScope, table: &'static str, id: Uuid) -> Result<Option<Row>, StoreError> {
        let stmt = QueryBuilder::new(table, scope)?.fetch(id)?;
        self.fetch_optional_row(table, &stmt).await
    }

    async fn select(&self, scope: &TenantScope, table: &'static str, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let stmt = QueryBuilder::new(table, scope)?.select(query)?;
        self.fetch_rows(table, &stmt).await
    }

    async fn count(&self, scope: &TenantScope, table: &'static str, conditions: &[Condition]) -> Result<u64, StoreError> {
        let stmt = QueryBuilder::new(table, scope)?.count(conditions)?;
        let mut q = sqlx::query(&stmt.query);
        for p in stmt.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await.map_err(|e| map_sqlx_error(table, e))?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn update(&self, scope: &TenantScope, table: &'static str, id: Uuid, row: Row) -> Result<Option<Row>, StoreError> {
        let stmt = QueryBuilder::new(table, scope)?.update(id, &row)?;
        self.fetch_optional_row(table, &stmt).await
    }

    async fn delete(&self, scope: &TenantScope, table: &'static str, id: Uuid) -> Result<bool, StoreError> {
        let stmt = QueryBuilder::new(table, scope)?.delete(id)?;
        let mut q = sqlx::query(&stmt.query);
        for p in stmt.params.iter() {
            q = bind_param(q, p);
        }
        let result = q.execute(&self.pool).await.map_err(|e| map_sqlx_error(table, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, full_name, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, created_at FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, full_name) VALUES ($1, $2, $3) \
             RETURNING id, email, full_name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.full_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("users", e))
    }

    async fn active_membership(&self, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT id, user_id, school_id, role_id, is_active, created_at FROM memberships \
             WHERE user_id = $1 AND is_active = true ORDER BY created_at ASC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn membership_in(&self, scope: &TenantScope, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT id, user_id, school_id, role_id, is_active, created_at FROM memberships \
             WHERE school_id = $1 AND user_id = $2 AND is_active = true",
        )
        .bind(scope.tenant_id())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn find_school(&self, scope: &TenantScope) -> Result<Option<School>, StoreError> {
        let school = sqlx::query_as::<_, School>("SELECT id, name, slug, created_at FROM schools WHERE id = $1")
            .bind(scope.tenant_id())
            .fetch_optional(&self.pool)
            .await?;
        Ok(school)
    }

    async fn bootstrap_school(&self, owner: Uuid, school: NewSchool) -> Result<(School, Membership), StoreError> {
        let mut tx = self.pool.begin().await?;

        let school = sqlx::query_as::<_, School>(
            "INSERT INTO schools (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&school.name)
        .bind(&school.slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("schools", e))?;

        let membership = sqlx::query_as::<_, Membership>(
            "INSERT INTO memberships (id, user_id, school_id, role_id, is_active) VALUES ($1, $2, $3, $4, true) \
             RETURNING id, user_id, school_id, role_id, is_active, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(school.id)
        .bind(system_roles::ADMIN)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("memberships", e))?;

        tx.commit().await?;
        Ok((school, membership))
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    p: &SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match p {
        SqlParam::Value(FieldValue::Uuid(u)) => q.bind(*u),
        SqlParam::Value(FieldValue::Text(s)) => q.bind(s.clone()),
        SqlParam::Value(FieldValue::Int(i)) => q.bind(*i),
        SqlParam::Value(FieldValue::Bool(b)) => q.bind(*b),
        SqlParam::Value(FieldValue::Date(d)) => q.bind(*d),
        SqlParam::Value(FieldValue::Time(t)) => q.bind(*t),
        SqlParam::Json(v) => q.bind(v.clone()), // JSONB
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Row, StoreError> {
    let value: Value = row.try_get("row")?;
    match value {
        Value::Object(columns) => Ok(columns_to_row(columns)),
        other => Err(StoreError::InvalidRow(format!("unexpected row format: {}", other))),
    }
}

/// Constraint violations become typed errors so callers can answer 409
/// instead of 500 when two writers race on the same unique key.
fn map_sqlx_error(table: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or_default().to_string();
        match db.code().as_deref() {
            Some("23505") => {
                return StoreError::UniqueViolation { table: table.to_string(), constraint };
            }
            Some("23503") => {
                return StoreError::ForeignKeyViolation { table: table.to_string(), constraint };
            }
            // numeric_value_out_of_range, string_data_right_truncation
            Some("22003") | Some("22001") => {
                return StoreError::ValueOutOfRange { table: table.to_string(), detail: db.message().to_string() };
            }
            _ => {}
        }
    }
    StoreError::Sqlx(err)
}
