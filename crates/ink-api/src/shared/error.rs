//! API Error Types

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ink_common::OperationClass;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::backend::CollaboratorError;

const INTERNAL_MESSAGE: &str = "Internal server error";
const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

#[derive(Error, Debug)]
pub enum ApiError {
    /// Message is produced by this layer and safe to show to clients.
    #[error("{message}")]
    Validation { message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{message}")]
    NotFound { message: String },

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Too many requests")]
    RateLimited { class: OperationClass },

    /// External call failed; detail stays in the logs.
    #[error("{context}: {source}")]
    Collaborator {
        context: &'static str,
        #[source]
        source: CollaboratorError,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// `map_err` adapter for collaborator calls.
    pub fn collaborator(context: &'static str) -> impl Fn(CollaboratorError) -> ApiError {
        move |source| ApiError::Collaborator { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Auth(e) if e.is_unauthenticated() => StatusCode::UNAUTHORIZED,
            ApiError::Auth(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Collaborator { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Auth(e) if e.is_unauthenticated() => "UNAUTHORIZED",
            ApiError::Auth(_) => "FORBIDDEN",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Collaborator { .. } => "INTERNAL_ERROR",
        }
    }

    /// Text shown to the client.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Auth(e) if e.is_unauthenticated() => UNAUTHORIZED_MESSAGE.to_string(),
            ApiError::Collaborator { .. } => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Collaborator { context, source } => {
                error!(context = %context, error = %source, "Collaborator call failed");
            }
            ApiError::Auth(e) => {
                warn!(kind = e.kind(), detail = %e, "Request not authorized");
            }
            _ => {}
        }

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.public_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(AuthError::MissingCredential).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::InvalidCredential).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::ForbiddenSubject).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(AuthError::AccessEnded).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            ApiError::RateLimited { class: OperationClass::Expensive }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_auth_kinds_share_public_message() {
        let unavailable = ApiError::from(AuthError::VerificationUnavailable("dns failure".to_string()));
        let invalid = ApiError::from(AuthError::InvalidCredential);
        assert_eq!(unavailable.public_message(), "Unauthorized");
        assert_eq!(invalid.public_message(), "Unauthorized");
    }

    #[test]
    fn test_collaborator_detail_not_public() {
        let err = ApiError::collaborator("insert entry")(CollaboratorError::Rejected {
            status: 409,
            message: "duplicate key value violates unique constraint \"entries_pkey\"".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("entries_pkey"));
    }

    #[test]
    fn test_forbidden_messages() {
        assert_eq!(ApiError::from(AuthError::ForbiddenSubject).public_message(), "User ID mismatch");
        assert_eq!(ApiError::from(AuthError::AccessEnded).public_message(), "Access has ended");
    }
}
