//! Account API
//!
//! Invite-code signup and account deletion. Neither runs in a transaction:
//! signup compensates by deleting what it created, deletion removes child
//! rows before the auth user so that retries converge.

use axum::{
    extract::State,
    routing::{delete, post},
    Json, Router,
};
use ink_common::Principal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::auth::GuardPolicy;
use crate::backend::{
    Filter, Query, ENTRIES_TABLE, INTENTIONS_TABLE, INVITE_CODES_TABLE, PROFILES_TABLE, SETTINGS_TABLE,
};
use crate::shared::api_common::{method_not_allowed_handler, SuccessResponse};
use crate::shared::error::{ApiError, Result};
use crate::shared::extract::{AppJson, Bearer};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;
const INVALID_INVITE: &str = "Invalid or already used invite code";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    pub user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub invite_code: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("invite_code", &self.invite_code)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user_id: String,
}

fn validate_signup(req: &SignupRequest) -> Result<()> {
    let email = req.email.trim();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid_email {
        return Err(ApiError::validation("Invalid email address"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation("Password must be at least 8 characters"));
    }
    if req.invite_code.trim().is_empty() {
        return Err(ApiError::validation("Invite code is required"));
    }
    Ok(())
}

/// Delete a partially created account. Failures are logged only.
async fn rollback_signup(state: &AppState, user: &Principal, profile_created: bool) {
    if profile_created {
        if let Err(e) = state.database.delete(PROFILES_TABLE, &[Filter::eq("id", &user.id)]).await {
            error!(user_id = %user.id, error = %e, "Signup rollback: failed to delete profile");
        }
    }
    if let Err(e) = state.auth.delete_user(&user.id).await {
        error!(user_id = %user.id, error = %e, "Signup rollback: failed to delete auth user");
    }
}

pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<Json<SignupResponse>> {
    validate_signup(&req)?;
    let email = req.email.trim();
    let code = req.invite_code.trim();

    let unused = Query::new().eq("code", code).eq("used", false).limit(1);
    let invites = state.database
        .select(INVITE_CODES_TABLE, &unused)
        .await
        .map_err(ApiError::collaborator("look up invite code"))?;
    if invites.is_empty() {
        warn!("Signup with invalid or used invite code");
        return Err(ApiError::validation(INVALID_INVITE));
    }

    let user = state.auth
        .create_user(email, &req.password)
        .await
        .map_err(|e| {
            if e.is_rejection() {
                warn!(error = %e, "Auth provider refused signup");
                ApiError::validation("Unable to create account")
            } else {
                ApiError::collaborator("create user")(e)
            }
        })?;

    let profile = json!({ "id": user.id, "email": email });
    if let Err(e) = state.database.insert(PROFILES_TABLE, profile).await {
        rollback_signup(&state, &user, false).await;
        return Err(ApiError::collaborator("insert profile")(e));
    }

    let claim = json!({ "used": true, "used_by": user.id, "used_at": state.now_rfc3339() });
    let claim_filters = [Filter::eq("code", code), Filter::eq("used", false)];
    match state.database.update(INVITE_CODES_TABLE, &claim_filters, claim).await {
        Ok(claimed) if claimed.is_empty() => {
            warn!(user_id = %user.id, "Invite code consumed concurrently, rolling back signup");
            rollback_signup(&state, &user, true).await;
            return Err(ApiError::validation(INVALID_INVITE));
        }
        Ok(_) => {}
        Err(e) => {
            // The account stands; the code may remain claimable.
            error!(user_id = %user.id, error = %e, "Failed to mark invite code as used");
        }
    }

    info!(user_id = %user.id, "Account created");
    Ok(Json(SignupResponse { success: true, user_id: user.id }))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<DeleteAccountRequest>,
) -> Result<Json<SuccessResponse>> {
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    let by_user = [Filter::eq("user_id", &principal.id)];
    for table in [ENTRIES_TABLE, INTENTIONS_TABLE, SETTINGS_TABLE] {
        state.database
            .delete(table, &by_user)
            .await
            .map_err(ApiError::collaborator("delete account rows"))?;
    }
    state.database
        .delete(PROFILES_TABLE, &[Filter::eq("id", &principal.id)])
        .await
        .map_err(ApiError::collaborator("delete profile"))?;

    state.auth
        .delete_user(&principal.id)
        .await
        .map_err(ApiError::collaborator("delete auth user"))?;

    info!(user_id = %principal.id, "Account deleted");
    Ok(Json(SuccessResponse::with_message("Account deleted")))
}

pub fn account_router() -> Router<AppState> {
    Router::new()
        .route("/api/account", delete(delete_account).fallback(method_not_allowed_handler))
        .route("/api/signup", post(signup).fallback(method_not_allowed_handler))
}
