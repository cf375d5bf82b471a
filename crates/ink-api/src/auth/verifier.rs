//! Bearer token verification against the auth provider.
//!
//! Every request re-verifies; nothing is cached.

use ink_common::Principal;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{AuthError, BearerToken};
use crate::backend::{AuthProvider, CollaboratorError};

#[derive(Clone)]
pub struct TokenVerifier {
    provider: Arc<dyn AuthProvider>,
}

impl TokenVerifier {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }

    pub async fn verify(&self, token: &BearerToken) -> Result<Principal, AuthError> {
        match self.provider.get_user(token.as_str()).await {
            Ok(principal) => {
                debug!(principal_id = %principal.id, "Token verified");
                Ok(principal)
            }
            Err(CollaboratorError::Rejected { status, .. }) => {
                warn!(status, "Auth provider rejected token");
                Err(AuthError::InvalidCredential)
            }
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                Err(AuthError::VerificationUnavailable(e.to_string()))
            }
        }
    }

    /// Parse the raw `Authorization` header and verify it.
    pub async fn verify_header(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let token = BearerToken::from_header(header)?;
        self.verify(&token).await
    }
}
