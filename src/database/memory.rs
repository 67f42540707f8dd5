use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{system_roles, Membership, NewSchool, NewUser, School, User};
use crate::database::columns::to_column;
use crate::database::schema;
use crate::database::store::{Condition, Directory, Row, SelectQuery, SortDirection, Store, StoreError};
use crate::tenant::TenantScope;

/// In-process store used by tests and local demos. It enforces the same named
/// unique keys as the SQL schema so conflict handling behaves identically.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<&'static str, Vec<Row>>,
    users: Vec<User>,
    schools: Vec<School>,
    memberships: Vec<Membership>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a membership directly, bypassing the bootstrap flow.
    pub async fn grant_membership(&self, user_id: Uuid, school_id: Uuid, role_id: Uuid, is_active: bool) -> Membership {
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id,
            school_id,
            role_id,
            is_active,
            created_at: Utc::now(),
        };
        self.state.write().await.memberships.push(membership.clone());
        membership
    }
}

fn tenant_matches(row: &Row, scope: &TenantScope) -> bool {
    row.get("tenantId").and_then(Value::as_str) == Some(scope.tenant_id().to_string().as_str())
}

fn id_matches(row: &Row, id: Uuid) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id.to_string().as_str())
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn rank_of(row: &Row, field: &str, ranking: &[&str]) -> usize {
    row.get(field)
        .and_then(Value::as_str)
        .and_then(|value| ranking.iter().position(|r| *r == value))
        .unwrap_or(ranking.len())
}

fn matches(row: &Row, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(field, value) => row.get(*field).cloned().unwrap_or(Value::Null) == value.to_json(),
        Condition::Gte(field, value) => compare_json(row.get(*field), Some(&value.to_json())) != Ordering::Less,
        Condition::Lte(field, value) => compare_json(row.get(*field), Some(&value.to_json())) != Ordering::Greater,
        Condition::Search(fields, term) => {
            let needle = term.to_lowercase();
            fields.iter().any(|f| {
                row.get(*f)
                    .and_then(Value::as_str)
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
    }
}

fn check_unique(table: &'static str, rows: &[Row], candidate: &Row) -> Result<(), StoreError> {
    let Some(def) = schema::table(table) else {
        return Ok(());
    };
    let candidate_id = candidate.get("id");
    for key in def.unique {
        let values: Vec<&Value> = key
            .columns
            .iter()
            .map(|c| candidate.get(*c).unwrap_or(&Value::Null))
            .collect();
        // NULLs never collide, as in SQL
        if values.iter().any(|v| v.is_null()) {
            continue;
        }
        let collides = rows.iter().any(|existing| {
            existing.get("id") != candidate_id
                && key
                    .columns
                    .iter()
                    .zip(values.iter())
                    .all(|(c, v)| existing.get(*c) == Some(*v))
        });
        if collides {
            return Err(StoreError::UniqueViolation {
                table: table.to_string(),
                constraint: key.name.to_string(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, scope: &TenantScope, table: &'static str, mut row: Row) -> Result<Row, StoreError> {
        if !row.get("id").map(Value::is_string).unwrap_or(false) {
            return Err(StoreError::InvalidRow(format!("row for {} has no id", table)));
        }
        row.insert("tenantId".to_string(), Value::String(scope.tenant_id().to_string()));

        let mut state = self.state.write().await;
        let rows = state.tables.entry(table).or_default();
        check_unique(table, rows, &row)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn fetch(&self, scope: &TenantScope, table: &'static str, id: Uuid) -> Result<Option<Row>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| tenant_matches(r, scope) && id_matches(r, id)))
            .cloned())
    }

    async fn select(&self, scope: &TenantScope, table: &'static str, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let state = self.state.read().await;
        let mut rows: Vec<Row> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| tenant_matches(r, scope) && query.conditions.iter().all(|c| matches(r, c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Stable sort: ties keep insertion order
        rows.sort_by(|a, b| {
            for o in &query.order {
                let ord = match o.ranking {
                    Some(ranking) => rank_of(a, o.field, ranking).cmp(&rank_of(b, o.field, ranking)),
                    None => compare_json(a.get(o.field), b.get(o.field)),
                };
                let ord = match o.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let iter = rows.into_iter().skip(query.offset as usize);
        Ok(match query.limit {
            Some(limit) => iter.take(limit as usize).collect(),
            None => iter.collect(),
        })
    }

    async fn count(&self, scope: &TenantScope, table: &'static str, conditions: &[Condition]) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| tenant_matches(r, scope) && conditions.iter().all(|c| matches(r, c)))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn update(&self, scope: &TenantScope, table: &'static str, id: Uuid, mut row: Row) -> Result<Option<Row>, StoreError> {
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.insert("tenantId".to_string(), Value::String(scope.tenant_id().to_string()));

        let mut state = self.state.write().await;
        let rows = state.tables.entry(table).or_default();
        let Some(index) = rows.iter().position(|r| tenant_matches(r, scope) && id_matches(r, id)) else {
            return Ok(None);
        };
        check_unique(table, rows, &row)?;
        rows[index] = row.clone();
        Ok(Some(row))
    }

    async fn delete(&self, scope: &TenantScope, table: &'static str, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let restricting = schema::table(table)
            .into_iter()
            .flat_map(|def| def.dependents.iter())
            .filter(|dep| dep.is_foreign_key())
            .find(|dep| {
                state.tables.get(dep.table).is_some_and(|rows| {
                    rows.iter().any(|r| {
                        tenant_matches(r, scope)
                            && r.get(dep.column).and_then(Value::as_str) == Some(id.to_string().as_str())
                    })
                })
            });
        if let Some(dep) = restricting {
            return Err(StoreError::ForeignKeyViolation {
                table: table.to_string(),
                constraint: format!("{}_{}_fkey", dep.table, to_column(dep.column)),
            });
        }
        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| !(tenant_matches(r, scope) && id_matches(r, id)));
        Ok(rows.len() < before)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::UniqueViolation {
                table: "users".to_string(),
                constraint: "users_email_key".to_string(),
            });
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            full_name: user.full_name,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn active_membership(&self, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active)
            .min_by_key(|m| m.created_at)
            .cloned())
    }

    async fn membership_in(&self, scope: &TenantScope, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.school_id == scope.tenant_id() && m.is_active)
            .cloned())
    }

    async fn find_school(&self, scope: &TenantScope) -> Result<Option<School>, StoreError> {
        let state = self.state.read().await;
        Ok(state.schools.iter().find(|s| s.id == scope.tenant_id()).cloned())
    }

    async fn bootstrap_school(&self, owner: Uuid, school: NewSchool) -> Result<(School, Membership), StoreError> {
        let mut state = self.state.write().await;
        if state.schools.iter().any(|s| s.slug == school.slug) {
            return Err(StoreError::UniqueViolation {
                table: "schools".to_string(),
                constraint: "schools_slug_key".to_string(),
            });
        }
        let now = Utc::now();
        let school = School {
            id: Uuid::new_v4(),
            name: school.name,
            slug: school.slug,
            created_at: now,
        };
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: owner,
            school_id: school.id,
            role_id: system_roles::ADMIN,
            is_active: true,
            created_at: now,
        };
        state.schools.push(school.clone());
        state.memberships.push(membership.clone());
        Ok((school, membership))
    }
}
