//! Journal Entries API
//!
//! Rows are forwarded as opaque JSON; only `user_id`, `id`, `prompt_id`,
//! `text` and the timestamps are touched here.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::GuardPolicy;
use crate::backend::{Filter, Query, ENTRIES_TABLE};
use crate::shared::api_common::{method_not_allowed_handler, SuccessResponse};
use crate::shared::error::{ApiError, Result};
use crate::shared::extract::{AppJson, AppQuery, Bearer};
use crate::shared::validation::{check_id, check_text};
use crate::state::AppState;

const ENTRY_TEXT: &str = "Entry text";
const DEFAULT_LIST_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesQuery {
    pub user_id: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub user_id: String,
    #[serde(default)]
    pub prompt_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    pub user_id: String,
    pub entry_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntryRequest {
    pub user_id: String,
    pub entry_id: String,
}

fn owned_entry(user_id: &str, entry_id: &str) -> [Filter; 2] {
    [Filter::eq("user_id", user_id), Filter::eq("id", entry_id)]
}

/// Newest first
pub async fn list_entries(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppQuery(query): AppQuery<ListEntriesQuery>,
) -> Result<Json<Vec<Value>>> {
    let principal = state.guard.check(&token, GuardPolicy::Owner(&query.user_id)).await?;

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let select = Query::new()
        .eq("user_id", &principal.id)
        .order_desc("created_at")
        .limit(limit);

    let rows = state.database
        .select(ENTRIES_TABLE, &select)
        .await
        .map_err(ApiError::collaborator("list entries"))?;

    Ok(Json(rows))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<CreateEntryRequest>,
) -> Result<Json<Value>> {
    check_text(ENTRY_TEXT, &req.text, state.limits.max_entry_length)?;
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    let row = json!({
        "user_id": principal.id,
        "prompt_id": req.prompt_id,
        "text": req.text,
    });
    let created = state.database
        .insert(ENTRIES_TABLE, row)
        .await
        .map_err(ApiError::collaborator("insert entry"))?;

    info!(user_id = %principal.id, "Entry created");
    Ok(Json(created))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<UpdateEntryRequest>,
) -> Result<Json<Value>> {
    check_id("Entry ID", &req.entry_id)?;
    check_text(ENTRY_TEXT, &req.text, state.limits.max_entry_length)?;
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    let patch = json!({
        "text": req.text,
        "updated_at": state.now_rfc3339(),
    });
    let updated = state.database
        .update(ENTRIES_TABLE, &owned_entry(&principal.id, &req.entry_id), patch)
        .await
        .map_err(ApiError::collaborator("update entry"))?;

    updated
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Entry not found"))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<DeleteEntryRequest>,
) -> Result<Json<SuccessResponse>> {
    check_id("Entry ID", &req.entry_id)?;
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    state.database
        .delete(ENTRIES_TABLE, &owned_entry(&principal.id, &req.entry_id))
        .await
        .map_err(ApiError::collaborator("delete entry"))?;

    info!(user_id = %principal.id, entry_id = %req.entry_id, "Entry deleted");
    Ok(Json(SuccessResponse::ok()))
}

pub fn entries_router() -> Router<AppState> {
    Router::new().route(
        "/api/entries",
        get(list_entries)
            .post(create_entry)
            .put(update_entry)
            .delete(delete_entry)
            .fallback(method_not_allowed_handler),
    )
}
