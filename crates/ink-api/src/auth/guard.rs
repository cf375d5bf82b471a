//! Guard chain shared by all authenticated handlers.
//!
//! Checks run in a fixed order: verify, ownership, active access, rate
//! limit. A request refused by an earlier check never consumes a rate-limit
//! slot.

use chrono::DateTime;
use ink_common::{OperationClass, Principal};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{AuthError, BearerToken, TokenVerifier};
use crate::backend::{CollaboratorError, Database, Query, PROFILES_TABLE};
use crate::rate_limit::{Clock, RateLimiter};
use crate::shared::error::ApiError;

/// Which checks a handler requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPolicy<'a> {
    /// Valid credential only
    Authenticated,
    /// Valid credential, active access, rate limit
    Throttled(OperationClass),
    /// Valid credential owning the claimed subject id
    Owner(&'a str),
    /// Owner + active access + rate limit
    OwnerThrottled(&'a str, OperationClass),
}

impl<'a> GuardPolicy<'a> {
    pub fn subject(&self) -> Option<&'a str> {
        match *self {
            GuardPolicy::Owner(subject) | GuardPolicy::OwnerThrottled(subject, _) => Some(subject),
            GuardPolicy::Authenticated | GuardPolicy::Throttled(_) => None,
        }
    }

    pub fn throttle(&self) -> Option<OperationClass> {
        match *self {
            GuardPolicy::Throttled(class) | GuardPolicy::OwnerThrottled(_, class) => Some(class),
            GuardPolicy::Authenticated | GuardPolicy::Owner(_) => None,
        }
    }
}

/// Reject a principal acting on someone else's subject id.
pub fn authorize_subject(principal: &Principal, claimed_subject_id: &str) -> Result<(), AuthError> {
    if principal.owns(claimed_subject_id) {
        Ok(())
    } else {
        warn!(
            principal_id = %principal.id,
            claimed_subject_id = %claimed_subject_id,
            "Subject mismatch"
        );
        Err(AuthError::ForbiddenSubject)
    }
}

pub struct RequestGuard {
    verifier: TokenVerifier,
    database: Arc<dyn Database>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl RequestGuard {
    pub fn new(
        verifier: TokenVerifier,
        database: Arc<dyn Database>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { verifier, database, rate_limiter, clock }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Verify the token and require that it belongs to `claimed_subject_id`.
    pub async fn authorize(&self, token: &BearerToken, claimed_subject_id: &str) -> Result<Principal, AuthError> {
        let principal = self.verifier.verify(token).await?;
        authorize_subject(&principal, claimed_subject_id)?;
        Ok(principal)
    }

    /// Run every check `policy` asks for and return the caller.
    pub async fn check(&self, token: &BearerToken, policy: GuardPolicy<'_>) -> Result<Principal, ApiError> {
        let principal = match policy.subject() {
            Some(subject) => self.authorize(token, subject).await?,
            None => self.verifier.verify(token).await?,
        };

        if let Some(class) = policy.throttle() {
            self.ensure_active(&principal).await?;

            if !self.rate_limiter.try_consume(&principal.id, class) {
                warn!(principal_id = %principal.id, class = %class, "Rate limited");
                return Err(ApiError::RateLimited { class });
            }
        }

        Ok(principal)
    }

    /// Refuse principals whose profile carries a past `access_ends_at`.
    /// A missing profile row counts as active.
    async fn ensure_active(&self, principal: &Principal) -> Result<(), ApiError> {
        let query = Query::new().eq("id", &principal.id).limit(1);
        let rows = self.database
            .select(PROFILES_TABLE, &query)
            .await
            .map_err(ApiError::collaborator("load profile"))?;

        let ends_at = match rows.first().and_then(|row| row.get("access_ends_at")) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw).map_err(|e| {
                ApiError::collaborator("load profile")(CollaboratorError::Malformed(format!(
                    "access_ends_at {:?}: {}",
                    raw, e
                )))
            })?,
            Some(other) => {
                return Err(ApiError::collaborator("load profile")(CollaboratorError::Malformed(
                    format!("access_ends_at has unexpected type: {}", other),
                )));
            }
        };

        let now = self.clock.now_millis() as i64;
        if ends_at.timestamp_millis() <= now {
            warn!(principal_id = %principal.id, ends_at = %ends_at, "Access has ended");
            return Err(AuthError::AccessEnded.into());
        }

        debug!(principal_id = %principal.id, "Access active");
        Ok(())
    }
}
