//! Request authorization
//!
//! - [`TokenVerifier`]: bearer credential -> [`Principal`](ink_common::Principal)
//! - [`RequestGuard`]: verifier + ownership + active access + rate limit,
//!   applied in that order according to a [`GuardPolicy`]

use std::fmt;
use thiserror::Error;

pub mod guard;
pub mod verifier;

pub use guard::{GuardPolicy, RequestGuard};
pub use verifier::TokenVerifier;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request was not authorized.
///
/// The 401 kinds are distinguished only in logs; clients see one message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingCredential,

    #[error("credential rejected by auth provider")]
    InvalidCredential,

    #[error("auth provider unavailable: {0}")]
    VerificationUnavailable(String),

    #[error("User ID mismatch")]
    ForbiddenSubject,

    #[error("Access has ended")]
    AccessEnded,
}

impl AuthError {
    /// True for the kinds answered with 401 rather than 403.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredential
                | AuthError::InvalidCredential
                | AuthError::VerificationUnavailable(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::InvalidCredential => "INVALID_CREDENTIAL",
            AuthError::VerificationUnavailable(_) => "VERIFICATION_UNAVAILABLE",
            AuthError::ForbiddenSubject => "FORBIDDEN_SUBJECT",
            AuthError::AccessEnded => "ACCESS_ENDED",
        }
    }
}

/// Credential taken from an `Authorization: Bearer <token>` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Parse the raw header value. No network call is made.
    pub fn from_header(header: Option<&str>) -> Result<Self, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(BearerToken::from_header(Some("Bearer abc.def")).unwrap().as_str(), "abc.def");
        assert_eq!(BearerToken::from_header(Some("Bearer  padded ")).unwrap().as_str(), "padded");
    }

    #[test]
    fn test_bearer_rejects_missing_and_malformed() {
        for header in [None, Some(""), Some("Bearer "), Some("Bearer    "), Some("Basic dXNlcjpwYXNz"), Some("bearer abc"), Some("abc")] {
            assert_eq!(BearerToken::from_header(header), Err(AuthError::MissingCredential), "{:?}", header);
        }
    }

    #[test]
    fn test_bearer_debug_redacts() {
        let token = BearerToken::from_header(Some("Bearer secret-token")).unwrap();
        assert!(!format!("{:?}", token).contains("secret"));
    }

    #[test]
    fn test_unauthenticated_kinds() {
        assert!(AuthError::MissingCredential.is_unauthenticated());
        assert!(AuthError::VerificationUnavailable("timeout".to_string()).is_unauthenticated());
        assert!(!AuthError::ForbiddenSubject.is_unauthenticated());
        assert!(!AuthError::AccessEnded.is_unauthenticated());
    }
}
