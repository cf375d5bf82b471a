//! Language model provider
//!
//! Requests are provider-neutral: a token budget, an optional system prompt
//! and a role-tagged message list. Responses are free-form text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::CollaboratorError;

pub mod anthropic;
pub mod extract;
pub mod prompts;

pub use anthropic::AnthropicClient;
pub use extract::{extract_structured, Analysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Inline base64 image.
    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: vec![ContentBlock::text(text)] }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: vec![ContentBlock::text(text)] }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub max_tokens: u32,
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion and return the concatenated response text.
    async fn complete(&self, request: LlmRequest) -> Result<String, CollaboratorError>;
}
