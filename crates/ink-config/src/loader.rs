//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "inkwell.toml",
    "./config/config.toml",
    "/etc/inkwell/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides.
    ///
    /// The result is not validated; call [`AppConfig::validate`] before use.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured config file does not exist");
        }

        if let Ok(path) = env::var("INKWELL_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(val) = lookup(key) {
        match val.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(key, value = %val, "Ignoring unparseable environment override"),
        }
    }
}

fn set_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut String) {
    if let Some(val) = lookup(key) {
        *target = val;
    }
}

/// Apply `INKWELL_*` overrides using `lookup` as the variable source.
pub(crate) fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    // HTTP
    parse_into(&lookup, "INKWELL_HTTP_PORT", &mut config.http.port);
    set_string(&lookup, "INKWELL_HTTP_HOST", &mut config.http.host);
    if let Some(val) = lookup("INKWELL_CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Backend
    set_string(&lookup, "INKWELL_BACKEND_URL", &mut config.backend.url);
    set_string(&lookup, "INKWELL_BACKEND_SERVICE_KEY", &mut config.backend.service_key);
    parse_into(&lookup, "INKWELL_BACKEND_TIMEOUT_MS", &mut config.backend.timeout_ms);

    // LLM
    set_string(&lookup, "INKWELL_LLM_BASE_URL", &mut config.llm.base_url);
    set_string(&lookup, "INKWELL_LLM_API_KEY", &mut config.llm.api_key);
    set_string(&lookup, "INKWELL_LLM_MODEL", &mut config.llm.model);
    parse_into(&lookup, "INKWELL_LLM_MAX_TOKENS", &mut config.llm.max_tokens);
    parse_into(&lookup, "INKWELL_LLM_CHART_MAX_TOKENS", &mut config.llm.chart_max_tokens);
    parse_into(&lookup, "INKWELL_LLM_TIMEOUT_MS", &mut config.llm.timeout_ms);

    // Limits
    parse_into(&lookup, "INKWELL_MAX_ENTRY_LENGTH", &mut config.limits.max_entry_length);
    parse_into(&lookup, "INKWELL_MAX_INTENTION_LENGTH", &mut config.limits.max_intention_length);
    parse_into(&lookup, "INKWELL_MAX_CHAT_MESSAGES", &mut config.limits.max_chat_messages);
    parse_into(&lookup, "INKWELL_MAX_CHAT_MESSAGE_LENGTH", &mut config.limits.max_chat_message_length);
    parse_into(&lookup, "INKWELL_MAX_ANALYZE_CHARS", &mut config.limits.max_analyze_chars);
    parse_into(&lookup, "INKWELL_MAX_IMAGE_BYTES", &mut config.limits.max_image_bytes);

    // Rate limiting
    parse_into(&lookup, "INKWELL_INTERACTIVE_COOLDOWN_MS", &mut config.rate_limit.interactive_cooldown_ms);
    parse_into(&lookup, "INKWELL_EXPENSIVE_COOLDOWN_MS", &mut config.rate_limit.expensive_cooldown_ms);
    parse_into(&lookup, "INKWELL_RATE_LIMIT_SWEEP_THRESHOLD", &mut config.rate_limit.sweep_threshold);
    parse_into(&lookup, "INKWELL_RATE_LIMIT_STALE_AFTER_MS", &mut config.rate_limit.stale_after_ms);
}
