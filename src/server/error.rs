//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// One validation failure, in the `{"detail": [...]}` shape AG-UI clients expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDetail {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Vec<ValidationDetail>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: Vec::new(),
        }
    }

    /// 422 for a request body that cannot be decoded.
    pub fn unprocessable(err: &serde_json::Error) -> Self {
        let kind = match err.classify() {
            serde_json::error::Category::Syntax | serde_json::error::Category::Eof => "json_invalid",
            serde_json::error::Category::Data => "value_error",
            serde_json::error::Category::Io => "io_error",
        };
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
            detail: vec![ValidationDetail {
                loc: vec!["body".to_string()],
                msg: err.to_string(),
                kind: kind.to_string(),
            }],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.detail.is_empty() {
            tracing::debug!(status = %self.status, error = %self.message, "rejecting request body");
            return (self.status, Json(json!({ "detail": self.detail }))).into_response();
        }
        let body = Json(json!({
            "error": {
                "code": self.status.as_u16(),
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}
