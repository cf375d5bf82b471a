use serde::{Deserialize, Serialize};
use std::fmt;

pub mod logging;

// ============================================================================
// Identity
// ============================================================================

/// The authenticated identity resolved from a bearer credential.
///
/// Produced by the auth provider on every request and dropped when the
/// request completes. Never persisted by the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// True when this principal is the owner of `subject_id`.
    pub fn owns(&self, subject_id: &str) -> bool {
        self.id == subject_id
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Category of rate-limited action. Each class has its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationClass {
    /// Conversational and lightweight model calls (chat, transcription, summaries)
    Interactive,
    /// Higher-cost model calls such as chart generation
    Expensive,
}

impl OperationClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Interactive => "INTERACTIVE",
            OperationClass::Expensive => "EXPENSIVE",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
