use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Success envelope: `{ "status": "success", "message", "data" }`.
#[derive(Debug)]
pub struct ResponseEntity<T: Serialize> {
    pub message: String,
    pub data: T,
    pub status_code: StatusCode,
}

impl<T: Serialize> ResponseEntity<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    pub fn with_status(status_code: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
            status_code,
        }
    }
}

impl<T: Serialize> IntoResponse for ResponseEntity<T> {
    fn into_response(self) -> Response {
        let data = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return crate::error::ApiError::internal_server_error("Failed to serialize response data")
                    .into_response();
            }
        };

        let envelope = json!({
            "status": "success",
            "message": self.message,
            "data": data,
        });

        (self.status_code, Json(envelope)).into_response()
    }
}
