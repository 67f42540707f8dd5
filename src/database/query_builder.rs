use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::columns::{is_valid_identifier, row_to_columns, to_column};
use crate::database::store::{Condition, FieldValue, Order, SelectQuery, StoreError};
use crate::tenant::TenantScope;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Value(FieldValue),
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct SqlStatement {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Builds tenant-scoped SQL for one table. `$1` is always the tenant id and
/// every statement filters on it.
pub struct QueryBuilder {
    table: &'static str,
    tenant_id: Uuid,
}

impl QueryBuilder {
    pub fn new(table: &'static str, scope: &TenantScope) -> Result<Self, StoreError> {
        if !is_valid_identifier(table) {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        Ok(Self { table, tenant_id: scope.tenant_id() })
    }

    pub fn select(&self, query: &SelectQuery) -> Result<SqlStatement, StoreError> {
        let (where_clause, params) = self.where_clause(&query.conditions, &[])?;
        let order_clause = Self::order_clause(&query.order)?;
        let limit_clause = match query.limit {
            Some(limit) => format!("LIMIT {} OFFSET {}", limit, query.offset),
            None if query.offset > 0 => format!("OFFSET {}", query.offset),
            None => String::new(),
        };

        let sql = [
            "SELECT row_to_json(t) AS row".to_string(),
            format!("FROM \"{}\" AS t", self.table),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlStatement { query: sql, params })
    }

    pub fn count(&self, conditions: &[Condition]) -> Result<SqlStatement, StoreError> {
        let (where_clause, params) = self.where_clause(conditions, &[])?;
        Ok(SqlStatement {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table, where_clause),
            params,
        })
    }

    pub fn fetch(&self, id: Uuid) -> Result<SqlStatement, StoreError> {
        let (where_clause, params) = self.where_clause(&[], &[("id", FieldValue::Uuid(id))])?;
        Ok(SqlStatement {
            query: format!("SELECT row_to_json(t) AS row FROM \"{}\" AS t WHERE {}", self.table, where_clause),
            params,
        })
    }

    /// The row's `tenantId` is overwritten with the builder's tenant.
    pub fn insert(&self, row: &Map<String, Value>) -> Result<SqlStatement, StoreError> {
        let columns = self.scoped_columns(row)?;
        Ok(SqlStatement {
            query: format!(
                "WITH inserted AS (INSERT INTO \"{table}\" SELECT * FROM jsonb_populate_record(NULL::\"{table}\", $1) RETURNING *) \
                 SELECT row_to_json(inserted) AS row FROM inserted",
                table = self.table
            ),
            params: vec![SqlParam::Json(Value::Object(columns))],
        })
    }

    pub fn update(&self, id: Uuid, row: &Map<String, Value>) -> Result<SqlStatement, StoreError> {
        let columns = self.scoped_columns(row)?;
        let assigned: Vec<String> = columns
            .keys()
            .filter(|c| c.as_str() != "id" && c.as_str() != "tenant_id")
            .map(|c| format!("\"{}\"", c))
            .collect();
        if assigned.is_empty() {
            return Err(StoreError::InvalidRow("update has no columns".to_string()));
        }
        let list = assigned.join(", ");

        Ok(SqlStatement {
            query: format!(
                "WITH updated AS (UPDATE \"{table}\" SET ({list}) = (SELECT {list} FROM jsonb_populate_record(NULL::\"{table}\", $3)) \
                 WHERE \"tenant_id\" = $1 AND \"id\" = $2 RETURNING *) \
                 SELECT row_to_json(updated) AS row FROM updated",
                table = self.table,
                list = list
            ),
            params: vec![
                SqlParam::Value(FieldValue::Uuid(self.tenant_id)),
                SqlParam::Value(FieldValue::Uuid(id)),
                SqlParam::Json(Value::Object(columns)),
            ],
        })
    }

    pub fn delete(&self, id: Uuid) -> Result<SqlStatement, StoreError> {
        let (where_clause, params) = self.where_clause(&[], &[("id", FieldValue::Uuid(id))])?;
        Ok(SqlStatement {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.table, where_clause),
            params,
        })
    }

    fn scoped_columns(&self, row: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
        let mut columns = row_to_columns(row);
        for name in columns.keys() {
            if !is_valid_identifier(name) {
                return Err(StoreError::InvalidRow(format!("invalid column name: {}", name)));
            }
        }
        columns.insert("tenant_id".to_string(), Value::String(self.tenant_id.to_string()));
        Ok(columns)
    }

    fn where_clause(
        &self,
        conditions: &[Condition],
        extra: &[(&str, FieldValue)],
    ) -> Result<(String, Vec<SqlParam>), StoreError> {
        let mut filter = FilterWhere::new();
        let mut parts = vec![format!("\"tenant_id\" = {}", filter.param(FieldValue::Uuid(self.tenant_id)))];
        for (column, value) in extra {
            parts.push(format!("\"{}\" = {}", column, filter.param(value.clone())));
        }
        for condition in conditions {
            parts.push(filter.condition(condition)?);
        }
        Ok((parts.join(" AND "), filter.params))
    }

    fn order_clause(order: &[Order]) -> Result<String, StoreError> {
        if order.is_empty() {
            return Ok("ORDER BY \"id\" ASC".to_string());
        }
        let mut parts = Vec::with_capacity(order.len() + 1);
        for o in order {
            let column = quoted_column(o.field)?;
            let key = match o.ranking {
                Some(ranking) => ranked_key(&column, ranking)?,
                None => format!("\"{}\"", column),
            };
            parts.push(format!("{} {}", key, o.direction.to_sql()));
        }
        // Tie-break so pages never overlap
        parts.push("\"id\" ASC".to_string());
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

/// `CASE` expression mapping each ranked value to its position; unknown
/// values sort last.
fn ranked_key(column: &str, ranking: &[&str]) -> Result<String, StoreError> {
    let mut arms = String::new();
    for (position, value) in ranking.iter().enumerate() {
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::InvalidRow(format!("invalid ranking value: {}", value)));
        }
        arms.push_str(&format!(" WHEN '{}' THEN {}", value, position));
    }
    Ok(format!("CASE \"{}\"{} ELSE {} END", column, arms, ranking.len()))
}

fn quoted_column(field: &str) -> Result<String, StoreError> {
    let column = to_column(field);
    if !is_valid_identifier(&column) {
        return Err(StoreError::InvalidRow(format!("invalid column name: {}", field)));
    }
    Ok(column)
}

struct FilterWhere {
    params: Vec<SqlParam>,
}

impl FilterWhere {
    fn new() -> Self {
        Self { params: vec![] }
    }

    fn param(&mut self, value: FieldValue) -> String {
        self.params.push(SqlParam::Value(value));
        format!("${}", self.params.len())
    }

    fn condition(&mut self, condition: &Condition) -> Result<String, StoreError> {
        match condition {
            Condition::Eq(field, value) => Ok(format!("\"{}\" = {}", quoted_column(field)?, self.param(value.clone()))),
            Condition::Gte(field, value) => Ok(format!("\"{}\" >= {}", quoted_column(field)?, self.param(value.clone()))),
            Condition::Lte(field, value) => Ok(format!("\"{}\" <= {}", quoted_column(field)?, self.param(value.clone()))),
            Condition::Search(fields, term) => {
                if fields.is_empty() {
                    return Ok("1=1".to_string());
                }
                let placeholder = self.param(FieldValue::Text(format!("%{}%", escape_like(term))));
                let parts = fields
                    .iter()
                    .map(|f| Ok(format!("\"{}\" ILIKE {}", quoted_column(f)?, placeholder)))
                    .collect::<Result<Vec<_>, StoreError>>()?;
                Ok(format!("({})", parts.join(" OR ")))
            }
        }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
