//! Inkwell Configuration System
//!
//! TOML-based configuration with environment variable overrides. Everything
//! here is read once at start-up and treated as immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub backend: BackendConfig,
    pub llm: LlmConfig,
    pub limits: LimitsConfig,
    pub rate_limit: RateLimitConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Hosted database + auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service-role key. Used as `apikey` and as the bearer for data calls.
    pub service_key: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            timeout_ms: 10_000,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Language model provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_version: String,
    pub model: String,
    /// Token budget for chat, summaries and transcription
    pub max_tokens: u32,
    /// Token budget for chart generation
    pub chart_max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            api_version: "2023-06-01".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
            max_tokens: 1024,
            chart_max_tokens: 2048,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Input size limits enforced before any external call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max characters in a journal entry
    pub max_entry_length: usize,
    /// Max characters in an intention
    pub max_intention_length: usize,
    /// Max messages in one chat request
    pub max_chat_messages: usize,
    /// Max characters in a single chat message
    pub max_chat_message_length: usize,
    /// Max combined characters of entries sent for analysis
    pub max_analyze_chars: usize,
    /// Max decoded size of an uploaded page image
    pub max_image_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_entry_length: 10_000,
            max_intention_length: 500,
            max_chat_messages: 40,
            max_chat_message_length: 4_000,
            max_analyze_chars: 50_000,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Cooldown windows for throttled operation classes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub interactive_cooldown_ms: u64,
    pub expensive_cooldown_ms: u64,
    /// Table size that triggers a stale-entry sweep
    pub sweep_threshold: usize,
    /// Entries older than this are removed by a sweep
    pub stale_after_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            interactive_cooldown_ms: 2_000,
            expensive_cooldown_ms: 10_000,
            sweep_threshold: 1_000,
            stale_after_ms: 60_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check that required secrets are present and limits are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("backend.url is required".to_string()));
        }
        if self.backend.service_key.trim().is_empty() {
            return Err(ConfigError::ValidationError("backend.service_key is required".to_string()));
        }
        if self.llm.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError("llm.api_key is required".to_string()));
        }
        if self.llm.max_tokens == 0 || self.llm.chart_max_tokens == 0 {
            return Err(ConfigError::ValidationError("llm token budgets must be > 0".to_string()));
        }

        let limits = &self.limits;
        let sizes = [
            ("limits.max_entry_length", limits.max_entry_length),
            ("limits.max_intention_length", limits.max_intention_length),
            ("limits.max_chat_messages", limits.max_chat_messages),
            ("limits.max_chat_message_length", limits.max_chat_message_length),
            ("limits.max_analyze_chars", limits.max_analyze_chars),
            ("limits.max_image_bytes", limits.max_image_bytes),
            ("rate_limit.sweep_threshold", self.rate_limit.sweep_threshold),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValidationError(format!("{} must be > 0", name)));
        }

        // A sweep must never drop an entry that is still cooling down.
        let rl = &self.rate_limit;
        let longest = rl.interactive_cooldown_ms.max(rl.expensive_cooldown_ms);
        if rl.stale_after_ms < longest {
            return Err(ConfigError::ValidationError(format!(
                "rate_limit.stale_after_ms ({}) must be >= the longest cooldown ({})",
                rl.stale_after_ms, longest
            )));
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Inkwell Configuration
# Environment variables (INKWELL_*) override these settings

[http]
port = 8080
host = "0.0.0.0"
cors_origins = ["http://localhost:5173"]

[backend]
url = "https://your-project.supabase.co"
service_key = ""
timeout_ms = 10000

[llm]
base_url = "https://api.anthropic.com"
api_key = ""
api_version = "2023-06-01"
model = "claude-3-5-sonnet-latest"
max_tokens = 1024
chart_max_tokens = 2048
timeout_ms = 60000

[limits]
max_entry_length = 10000
max_intention_length = 500
max_chat_messages = 40
max_chat_message_length = 4000
max_analyze_chars = 50000
max_image_bytes = 5242880

[rate_limit]
interactive_cooldown_ms = 2000
expensive_cooldown_ms = 10000
sweep_threshold = 1000
stale_after_ms = 60000
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.backend.url = "https://example.supabase.co".to_string();
        config.backend.service_key = "service".to_string();
        config.llm.api_key = "sk-test".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.limits.max_entry_length, 10_000);
        assert_eq!(config.rate_limit.expensive_cooldown_ms, 10_000);
        assert_eq!(config.rate_limit.sweep_threshold, 1_000);
        assert_eq!(config.rate_limit.stale_after_ms, 60_000);
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.backend.url, "https://your-project.supabase.co");
        assert_eq!(config.limits.max_image_bytes, 5_242_880);
        assert_eq!(config.rate_limit.interactive_cooldown_ms, 2_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[limits]\nmax_entry_length = 42\n").unwrap();
        assert_eq!(config.limits.max_entry_length, 42);
        assert_eq!(config.limits.max_intention_length, 500);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 9999\n[llm]\nmodel = \"test-model\"").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.http.port, 9999);
        assert_eq!(config.llm.model, "test-model");
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nport = ").unwrap();
        assert!(matches!(AppConfig::from_file(file.path()), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_secrets() {
        let mut config = valid_config();
        config.llm.api_key = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = valid_config();
        config.backend.service_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = valid_config();
        config.limits.max_intention_length = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("limits.max_intention_length"));
    }

    #[test]
    fn test_validate_rejects_stale_horizon_shorter_than_cooldown() {
        let mut config = valid_config();
        config.rate_limit.expensive_cooldown_ms = 120_000;
        assert!(config.validate().is_err());
    }
}
