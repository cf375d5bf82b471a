//! Common API types and utilities

use axum::{
    http::{Method, Uri},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::shared::error::ApiError;

/// Success response with optional message
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// `?userId=` query for subject-scoped reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectQuery {
    pub user_id: String,
}

/// Liveness probe
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

/// Fallback for unknown routes
pub async fn not_found_handler(uri: Uri) -> ApiError {
    debug!(path = %uri.path(), "Unknown route");
    ApiError::not_found("Not found")
}

/// Fallback for known routes hit with an unsupported method
pub async fn method_not_allowed_handler(method: Method, uri: Uri) -> ApiError {
    debug!(method = %method, path = %uri.path(), "Method not allowed");
    ApiError::MethodNotAllowed
}
