//! Inkwell API
//!
//! Authenticated HTTP layer for the journaling app:
//! - Bearer verification against the hosted auth provider
//! - Ownership checks on client-supplied subject ids
//! - Per-user cooldowns for language-model routes
//! - Handlers for entries, intentions, settings, assistant and account
//!
//! ## Module Organization
//!
//! Each resource module contains an `api` submodule with its handlers and
//! router. Collaborators (`backend`, `llm`) sit behind traits so handlers
//! can be exercised without network access.

// Resources
pub mod entry;
pub mod intention;
pub mod settings;
pub mod assistant;
pub mod account;

// Authentication, authorization and throttling
pub mod auth;
pub mod rate_limit;

// Collaborators
pub mod backend;
pub mod llm;

// Shared infrastructure
pub mod shared;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, Request},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info_span;
use uuid::Uuid;

pub use auth::{AuthError, BearerToken, GuardPolicy, RequestGuard, TokenVerifier};
pub use backend::{AuthProvider, CollaboratorError, Database, Filter, Query, SupabaseClient};
pub use llm::{AnthropicClient, LanguageModel};
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use shared::error::{ApiError, Result};
pub use state::AppState;

use shared::api_common::{health_handler, method_not_allowed_handler, not_found_handler};

/// Slack on top of the base64-encoded image cap for the rest of a JSON body.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assemble every route with fallbacks, body limit and request tracing.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.limits.max_image_bytes / 3 * 4 + BODY_OVERHEAD_BYTES;

    Router::new()
        .merge(entry::entries_router())
        .merge(intention::intentions_router())
        .merge(settings::settings_router())
        .merge(assistant::assistant_router())
        .merge(account::account_router())
        .route("/health", get(health_handler).fallback(method_not_allowed_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            info_span!(
                "http_request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
        .with_state(state)
}
