//! Assistant API
//!
//! Chat, entry analysis and handwriting transcription. Every route here
//! calls the language model, so every route is throttled.

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ink_common::OperationClass;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::GuardPolicy;
use crate::llm::prompts::{analysis_request, chat_request, transcription_request, AnalysisKind, ChatTurn};
use crate::llm::{Analysis, Role};
use crate::shared::api_common::method_not_allowed_handler;
use crate::shared::error::{ApiError, Result};
use crate::shared::extract::{AppJson, Bearer};
use crate::state::AppState;

const SUPPORTED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: String,
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub user_id: String,
    pub kind: AnalysisKind,
    pub entries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub kind: AnalysisKind,
    pub text: String,
    pub structured: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    pub image: String,
    pub media_type: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

fn validate_chat(messages: &[ChatTurn], max_messages: usize, max_length: usize) -> Result<()> {
    let (first, last) = match (messages.first(), messages.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ApiError::validation("Messages are required")),
    };
    if messages.len() > max_messages {
        return Err(ApiError::validation("Too many messages"));
    }
    for turn in messages {
        if turn.content.trim().is_empty() {
            return Err(ApiError::validation("Message is required"));
        }
        if turn.content.chars().count() > max_length {
            return Err(ApiError::validation("Message too long"));
        }
    }
    if first.role != Role::User {
        return Err(ApiError::validation("First message must be from the user"));
    }
    if last.role != Role::User {
        return Err(ApiError::validation("Last message must be from the user"));
    }
    Ok(())
}

fn validate_entries(entries: &[String], max_chars: usize) -> Result<()> {
    if entries.iter().all(|entry| entry.trim().is_empty()) {
        return Err(ApiError::validation("Entries are required"));
    }
    let total: usize = entries.iter().map(|entry| entry.chars().count()).sum();
    if total > max_chars {
        return Err(ApiError::validation("Entries too long to analyze"));
    }
    Ok(())
}

/// Strip an optional `data:<type>;base64,` prefix.
fn strip_data_url(image: &str) -> &str {
    match image.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((_, payload)) => payload,
        None => image,
    }
}

/// Check the media type and decoded size; returns the bare base64 payload.
fn validate_image<'a>(image: &'a str, media_type: &str, max_bytes: usize) -> Result<&'a str> {
    if !SUPPORTED_MEDIA_TYPES.contains(&media_type) {
        return Err(ApiError::validation("Unsupported image type"));
    }

    let payload = strip_data_url(image).trim();
    if payload.is_empty() {
        return Err(ApiError::validation("Image is required"));
    }
    // Reject oversized payloads before allocating the decode buffer.
    if payload.len() / 4 * 3 > max_bytes + 3 {
        return Err(ApiError::validation("Image too large"));
    }

    let decoded = STANDARD
        .decode(payload)
        .map_err(|_| ApiError::validation("Invalid image data"))?;
    if decoded.len() > max_bytes {
        return Err(ApiError::validation("Image too large"));
    }
    Ok(payload)
}

pub async fn chat(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    validate_chat(&req.messages, state.limits.max_chat_messages, state.limits.max_chat_message_length)?;
    let principal = state.guard
        .check(&token, GuardPolicy::OwnerThrottled(&req.user_id, OperationClass::Interactive))
        .await?;

    let reply = state.llm
        .complete(chat_request(&req.messages, state.budget.default))
        .await
        .map_err(ApiError::collaborator("chat completion"))?;

    info!(user_id = %principal.id, turns = req.messages.len(), "Chat reply generated");
    Ok(Json(ChatResponse { reply }))
}

pub async fn analyze(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    validate_entries(&req.entries, state.limits.max_analyze_chars)?;
    let class = req.kind.operation_class();
    let principal = state.guard
        .check(&token, GuardPolicy::OwnerThrottled(&req.user_id, class))
        .await?;

    let max_tokens = match req.kind {
        AnalysisKind::Chart => state.budget.chart,
        AnalysisKind::Summary | AnalysisKind::Themes => state.budget.default,
    };
    let raw = state.llm
        .complete(analysis_request(req.kind, &req.entries, max_tokens))
        .await
        .map_err(ApiError::collaborator("analysis completion"))?;

    let analysis = Analysis::from_completion(raw);
    info!(
        user_id = %principal.id,
        kind = ?req.kind,
        structured = analysis.structured.is_some(),
        "Analysis generated"
    );

    Ok(Json(AnalyzeResponse {
        kind: req.kind,
        text: analysis.text,
        structured: analysis.structured,
    }))
}

pub async fn transcribe(
    State(state): State<AppState>,
    Bearer(token): Bearer,
    AppJson(req): AppJson<TranscribeRequest>,
) -> Result<Json<TranscribeResponse>> {
    let payload = validate_image(&req.image, &req.media_type, state.limits.max_image_bytes)?;
    let principal = state.guard
        .check(&token, GuardPolicy::Throttled(OperationClass::Interactive))
        .await?;

    let text = state.llm
        .complete(transcription_request(&req.media_type, payload, state.budget.default))
        .await
        .map_err(ApiError::collaborator("transcription"))?;

    info!(user_id = %principal.id, "Page transcribed");
    Ok(Json(TranscribeResponse { text }))
}

pub fn assistant_router() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat).fallback(method_not_allowed_handler))
        .route("/api/analyze", post(analyze).fallback(method_not_allowed_handler))
        .route("/api/transcribe", post(transcribe).fallback(method_not_allowed_handler))
}
