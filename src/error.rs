// HTTP API error mapping
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::services::error::ServiceError;
use crate::validation::SchemaError;

/// Transport-level error. Every failure a handler can produce ends up here and
/// leaves as `{ success: false, error, code, ... }`.
#[derive(Debug)]
pub enum ApiError {
    // 422 Unprocessable Entity (payload failed its declared shape)
    Schema(SchemaError),

    // Domain validation, carries its own status
    Validation {
        status: StatusCode,
        message: String,
        code: String,
        field: Option<String>,
        details: Option<Value>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict {
        message: String,
        code: String,
        details: Option<Value>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),

    // 500 Internal Server Error; the message is logged, never returned
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Validation { status, .. } => *status,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code clients branch on.
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::Schema(_) => "VALIDATION_ERROR",
            ApiError::Validation { code, .. } => code,
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { code, .. } => code,
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-safe message.
    pub fn message(&self) -> String {
        match self {
            ApiError::Schema(_) => "Validation failed".to_string(),
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
            ApiError::Conflict { message, .. } => message.clone(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code(),
        });

        match self {
            ApiError::Schema(schema) => {
                body["details"] = json!(schema.issues);
            }
            ApiError::Validation { field, details, .. } => {
                body["field"] = json!(field);
                if let Some(details) = details {
                    body["details"] = details.clone();
                }
            }
            ApiError::Conflict { details: Some(details), .. } => {
                body["details"] = details.clone();
            }
            _ => {}
        }

        body
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::Schema(err)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { message, code, field, details } => ApiError::Validation {
                status: StatusCode::BAD_REQUEST,
                message,
                code: code.to_string(),
                field,
                details,
            },
            ServiceError::NotFound { resource, id } => {
                ApiError::NotFound(format!("{} with id {} not found", resource, id))
            }
            ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ServiceError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            ServiceError::Conflict { message, code, details } => ApiError::Conflict {
                message,
                code: code.to_string(),
                details,
            },
            ServiceError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Schema(schema) => write!(f, "validation failed: {}", schema),
            ApiError::Internal(msg) => write!(f, "internal error: {}", msg),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "unhandled error while serving request");
        }
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
