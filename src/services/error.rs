use serde_json::Value;
use std::fmt::Display;
use thiserror::Error;

use crate::database::schema;
use crate::database::StoreError;

/// Domain failures raised by services. Carries no transport concerns; the
/// HTTP mapping lives in `crate::error`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        code: &'static str,
        field: Option<String>,
        details: Option<Value>,
    },

    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Conflict {
        message: String,
        code: &'static str,
        details: Option<Value>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            code: "VALIDATION_ERROR",
            field: Some(field.into()),
            details: None,
        }
    }

    pub fn not_found(resource: &'static str, id: impl Display) -> Self {
        ServiceError::NotFound { resource, id: id.to_string() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ServiceError::Unauthorized(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict { message: message.into(), code: "CONFLICT", details: None }
    }

    pub fn conflict_with(code: &'static str, message: impl Into<String>, details: Option<Value>) -> Self {
        ServiceError::Conflict { message: message.into(), code, details }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { table, constraint } => {
                let message = schema::unique_key(&table, &constraint)
                    .map(|k| k.message.to_string())
                    .unwrap_or_else(|| "A record with the same unique values already exists".to_string());
                tracing::debug!(%table, %constraint, "unique constraint violation mapped to conflict");
                ServiceError::conflict(message)
            }
            StoreError::ForeignKeyViolation { table, constraint } => {
                tracing::debug!(%table, %constraint, "foreign key violation mapped to conflict");
                ServiceError::conflict_with(
                    "REFERENCE_CONFLICT",
                    "The record is still referenced by, or references, other records",
                    None,
                )
            }
            StoreError::ValueOutOfRange { table, detail } => {
                tracing::debug!(%table, %detail, "out-of-range value mapped to validation error");
                ServiceError::Validation {
                    message: "A value is out of range for its field".to_string(),
                    code: "VALIDATION_ERROR",
                    field: None,
                    details: None,
                }
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}
