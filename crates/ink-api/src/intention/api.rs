//! Intentions API

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::GuardPolicy;
use crate::backend::{Filter, Query, INTENTIONS_TABLE};
use crate::shared::api_common::{method_not_allowed_handler, SubjectQuery, SuccessResponse};
use crate::shared::error::{ApiError, Result};
use crate::shared::extract::{AppJson, AppQuery, Bearer};
use crate::shared::validation::{check_id, check_text};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentionRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteIntentionRequest {
    pub user_id: String,
    pub intention_id: String,
}

pub async fn list_intentions(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppQuery(query): AppQuery<SubjectQuery>,
) -> Result<Json<Vec<Value>>> {
    let principal = state.guard.check(&token, GuardPolicy::Owner(&query.user_id)).await?;

    let rows = state.database
        .select(INTENTIONS_TABLE, &Query::new().eq("user_id", &principal.id).order_asc("created_at"))
        .await
        .map_err(ApiError::collaborator("list intentions"))?;

    Ok(Json(rows))
}

pub async fn create_intention(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<CreateIntentionRequest>,
) -> Result<Json<Value>> {
    check_text("Intention text", &req.text, state.limits.max_intention_length)?;
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    let created = state.database
        .insert(INTENTIONS_TABLE, json!({ "user_id": principal.id, "text": req.text }))
        .await
        .map_err(ApiError::collaborator("insert intention"))?;

    info!(user_id = %principal.id, "Intention created");
    Ok(Json(created))
}

pub async fn delete_intention(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<DeleteIntentionRequest>,
) -> Result<Json<SuccessResponse>> {
    check_id("Intention ID", &req.intention_id)?;
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    let filters = [Filter::eq("user_id", &principal.id), Filter::eq("id", &req.intention_id)];
    state.database
        .delete(INTENTIONS_TABLE, &filters)
        .await
        .map_err(ApiError::collaborator("delete intention"))?;

    Ok(Json(SuccessResponse::ok()))
}

pub fn intentions_router() -> Router<AppState> {
    Router::new().route(
        "/api/intentions",
        get(list_intentions)
            .post(create_intention)
            .delete(delete_intention)
            .fallback(method_not_allowed_handler),
    )
}
