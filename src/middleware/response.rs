use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::services::pagination::Paginated;

/// Wrapper for API responses that adds the `{ success, data }` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
    /// Top-level envelope members next to `data`, e.g. `pagination`.
    pub meta: Map<String, Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
            meta: Map::new(),
        }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
            meta: Map::new(),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    pub fn with_meta(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.meta.insert(key.to_string(), value);
            }
            Err(e) => tracing::error!("Failed to serialize response metadata {}: {}", key, e),
        }
        self
    }
}

impl ApiResponse<()> {
    /// `{ success: true }` with no data, as returned by deletes.
    pub fn empty() -> Self {
        Self::success(())
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn paginated(page: Paginated<T>) -> Self {
        Self::success(page.items).with_meta("pagination", page.pagination)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Internal server error",
                        "code": "INTERNAL_ERROR"
                    })),
                )
                    .into_response();
            }
        };

        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));
        if !data_value.is_null() {
            envelope.insert("data".to_string(), data_value);
        }
        envelope.extend(self.meta);

        (status, Json(Value::Object(envelope))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pagination::{PageRequest, Paginated};

    async fn body_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_wraps_data() {
        let response = ApiResponse::created(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_of(response).await, json!({"success": true, "data": {"id": 1}}));
    }

    #[tokio::test]
    async fn empty_has_no_data() {
        let body = body_of(ApiResponse::empty().into_response()).await;
        assert_eq!(body, json!({"success": true}));
    }

    #[tokio::test]
    async fn paginated_lifts_pagination_to_top_level() {
        let page = Paginated::new(vec![1, 2], PageRequest { page: 1, limit: 2 }, 3);
        let body = body_of(ApiResponse::paginated(page).into_response()).await;
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(body["pagination"]["totalPages"], 2);
    }
}
