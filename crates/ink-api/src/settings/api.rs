//! User Settings API
//!
//! One row per user, keyed by `user_id`. Field contents are opaque.

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::GuardPolicy;
use crate::backend::{Query, SETTINGS_TABLE};
use crate::shared::api_common::{method_not_allowed_handler, SubjectQuery};
use crate::shared::error::{ApiError, Result};
use crate::shared::extract::{AppJson, AppQuery, Bearer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub user_id: String,
    pub settings: Value,
}

/// Returns the settings row, or `null` when the user has none yet.
pub async fn get_settings(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppQuery(query): AppQuery<SubjectQuery>,
) -> Result<Json<Value>> {
    let principal = state.guard.check(&token, GuardPolicy::Owner(&query.user_id)).await?;

    let rows = state.database
        .select(SETTINGS_TABLE, &Query::new().eq("user_id", &principal.id).limit(1))
        .await
        .map_err(ApiError::collaborator("load settings"))?;

    Ok(Json(rows.into_iter().next().unwrap_or(Value::Null)))
}

pub async fn put_settings(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<UpdateSettingsRequest>,
) -> Result<Json<Value>> {
    let mut settings: Map<String, Value> = match req.settings {
        Value::Object(map) => map,
        _ => return Err(ApiError::validation("Settings must be an object")),
    };
    let principal = state.guard.check(&token, GuardPolicy::Owner(&req.user_id)).await?;

    // The row key always comes from the verified principal.
    settings.insert("user_id".to_string(), Value::String(principal.id.clone()));

    let saved = state.database
        .upsert(SETTINGS_TABLE, Value::Object(settings), "user_id")
        .await
        .map_err(ApiError::collaborator("save settings"))?;

    Ok(Json(saved))
}

pub fn settings_router() -> Router<AppState> {
    Router::new().route(
        "/api/settings",
        get(get_settings)
            .put(put_settings)
            .fallback(method_not_allowed_handler),
    )
}
