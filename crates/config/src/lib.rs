//! Configuration loading, validation, and management for ArchTalk.
//!
//! Loads configuration from `~/.archtalk/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod knowledge;

pub use knowledge::compile_knowledge;

/// The root configuration structure.
///
/// Maps directly to `~/.archtalk/config.toml`. Scalar settings come first so
/// the file round-trips through TOML with tables at the end.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Verbose logging
    #[serde(default)]
    pub debug_mode: bool,

    /// Conversation inactivity timeout in milliseconds
    #[serde(default = "default_response_timeout")]
    pub response_timeout: u64,

    /// Base instruction prepended to every NPC prompt
    #[serde(default = "default_prompt")]
    pub default_prompt: String,

    /// Model used in direct mode
    #[serde(default = "default_engine")]
    pub chatgpt_engine: String,

    /// Bearer credential for direct mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Shortest chat line (in characters) accepted as a turn
    #[serde(default = "default_min_char_length")]
    pub min_char_length: usize,

    /// Maximum reply length in tokens (direct mode)
    #[serde(default = "default_max_response_length")]
    pub max_response_length: u32,

    /// Minimum gap between two accepted messages, in milliseconds
    #[serde(default = "default_chat_cooldown")]
    pub chat_cooldown: u64,

    /// How long archived lines are kept, as a game duration (`7d`, `1w 2h`)
    #[serde(default = "default_memory_duration")]
    pub npc_memory_duration: String,

    /// Split long replies into several chat lines
    #[serde(default)]
    pub split_long_messages: bool,

    /// Route requests through the local gateway instead of the completion API
    #[serde(default = "default_true")]
    pub use_mcp: bool,

    /// Phrase that ends a conversation (case-insensitive, exact)
    #[serde(default = "default_end_phrase")]
    pub conversation_end_phrase: String,

    /// Language replies are generated in; other locales get translated
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Stored user/assistant pairs per conversation before the oldest is evicted
    #[serde(default = "default_max_pairs")]
    pub max_conversation_pairs: usize,

    /// Delay before a reply is shown, in milliseconds
    #[serde(default = "default_reply_delay")]
    pub reply_delay_ms: u64,

    /// HTTP client timeout for provider calls, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Server knowledge: a string, a list, or a nested table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<toml::Value>,

    /// Gateway ("MCP") configuration
    #[serde(default)]
    pub mcp: GatewayConfig,

    /// Per-NPC prompts, keyed by NPC name
    #[serde(default)]
    pub npcs: HashMap<String, String>,
}

fn default_response_timeout() -> u64 {
    60_000
}
fn default_prompt() -> String {
    "Hello!".into()
}
fn default_engine() -> String {
    "gpt-3.5-turbo-1106".into()
}
fn default_min_char_length() -> usize {
    10
}
fn default_max_response_length() -> u32 {
    200
}
fn default_chat_cooldown() -> u64 {
    3_000
}
fn default_memory_duration() -> String {
    "7d".into()
}
fn default_true() -> bool {
    true
}
fn default_end_phrase() -> String {
    "cancel".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_max_pairs() -> usize {
    10
}
fn default_reply_delay() -> u64 {
    1_000
}
fn default_http_timeout() -> u64 {
    60
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("debug_mode", &self.debug_mode)
            .field("response_timeout", &self.response_timeout)
            .field("default_prompt", &self.default_prompt)
            .field("chatgpt_engine", &self.chatgpt_engine)
            .field("api_key", &redact(&self.api_key))
            .field("min_char_length", &self.min_char_length)
            .field("max_response_length", &self.max_response_length)
            .field("chat_cooldown", &self.chat_cooldown)
            .field("npc_memory_duration", &self.npc_memory_duration)
            .field("split_long_messages", &self.split_long_messages)
            .field("use_mcp", &self.use_mcp)
            .field("conversation_end_phrase", &self.conversation_end_phrase)
            .field("default_language", &self.default_language)
            .field("max_conversation_pairs", &self.max_conversation_pairs)
            .field("reply_delay_ms", &self.reply_delay_ms)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("knowledge", &self.knowledge.is_some())
            .field("mcp", &self.mcp)
            .field("npcs", &self.npcs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_gateway_provider")]
    pub provider: String,

    #[serde(default = "default_gateway_model")]
    pub model: String,

    #[serde(default = "default_gateway_max_tokens")]
    pub max_tokens: u32,
}

fn default_server_url() -> String {
    "http://localhost:3000/query".into()
}
fn default_gateway_provider() -> String {
    "openai".into()
}
fn default_gateway_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_gateway_max_tokens() -> u32 {
    200
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            provider: default_gateway_provider(),
            model: default_gateway_model(),
            max_tokens: default_gateway_max_tokens(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.archtalk/config.toml).
    ///
    /// Environment overrides:
    /// - `ARCHTALK_API_KEY`, then `OPENAI_API_KEY` (when no key is configured)
    /// - `ARCHTALK_GATEWAY_URL`
    /// - `ARCHTALK_USE_GATEWAY` (`true`/`false`/`1`/`0`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("ARCHTALK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.trim().is_empty());
        }

        if let Ok(url) = std::env::var("ARCHTALK_GATEWAY_URL") {
            config.mcp.server_url = url;
        }

        if let Ok(flag) = std::env::var("ARCHTALK_USE_GATEWAY") {
            config.use_mcp = parse_flag(&flag).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "ARCHTALK_USE_GATEWAY must be true/false, got '{flag}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".archtalk")
    }

    /// Get the data directory (archives live here).
    pub fn data_dir() -> PathBuf {
        Self::config_dir().join("data")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_conversation_pairs == 0 {
            return Err(ConfigError::ValidationError(
                "max_conversation_pairs must be at least 1".into(),
            ));
        }

        if self.conversation_end_phrase.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversation_end_phrase must not be blank".into(),
            ));
        }

        if self.use_mcp && self.mcp.server_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mcp.server_url is required when use_mcp = true".into(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http_timeout_secs must be greater than 0".into(),
            ));
        }

        parse_game_duration(&self.npc_memory_duration)?;
        Ok(())
    }

    /// Check if a direct-mode credential is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn conversation_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.chat_cooldown)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Archive retention derived from `npc_memory_duration`.
    pub fn memory_retention(&self) -> Result<Duration, ConfigError> {
        parse_game_duration(&self.npc_memory_duration)
    }

    /// Flattened knowledge text (empty when none is configured).
    pub fn knowledge_text(&self) -> String {
        compile_knowledge(self.knowledge.as_ref())
    }

    /// Prompt for a configured NPC: the default prompt followed by the
    /// NPC-specific one. `None` when the NPC has no entry.
    pub fn npc_prompt(&self, npc_name: &str) -> Option<String> {
        let specific = self.npcs.get(npc_name)?;
        if specific.is_empty() {
            Some(self.default_prompt.clone())
        } else {
            Some(format!("{} {}", self.default_prompt, specific))
        }
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            response_timeout: default_response_timeout(),
            default_prompt: default_prompt(),
            chatgpt_engine: default_engine(),
            api_key: None,
            min_char_length: default_min_char_length(),
            max_response_length: default_max_response_length(),
            chat_cooldown: default_chat_cooldown(),
            npc_memory_duration: default_memory_duration(),
            split_long_messages: false,
            use_mcp: true,
            conversation_end_phrase: default_end_phrase(),
            default_language: default_language(),
            max_conversation_pairs: default_max_pairs(),
            reply_delay_ms: default_reply_delay(),
            http_timeout_secs: default_http_timeout(),
            knowledge: None,
            mcp: GatewayConfig::default(),
            npcs: HashMap::new(),
        }
    }
}

/// Parse a game duration such as `7d`, `1w 2h` or `30m`.
///
/// A game day lasts 20 real minutes and a game week 7 game days. Hours and
/// minutes are real time.
pub fn parse_game_duration(input: &str) -> Result<Duration, ConfigError> {
    let pattern = Regex::new(r"^(?:(\d+)w)?\s*(?:(\d+)d)?\s*(?:(\d+)h)?\s*(?:(\d+)m)?$")
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    let invalid = || ConfigError::ValidationError(format!("Invalid duration format: {input}"));
    let caps = pattern.captures(input.trim()).ok_or_else(invalid)?;

    let group = |i: usize| -> Result<u64, ConfigError> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u64>().map_err(|_| invalid()),
            None => Ok(0),
        }
    };

    let weeks = group(1)?;
    let days = group(2)?;
    let hours = group(3)?;
    let minutes = group(4)?;

    let total_minutes = weeks
        .checked_mul(7 * 20)
        .and_then(|w| days.checked_mul(20).and_then(|d| w.checked_add(d)))
        .and_then(|t| hours.checked_mul(60).and_then(|h| t.checked_add(h)))
        .and_then(|t| t.checked_add(minutes))
        .and_then(|t| t.checked_mul(60))
        .ok_or_else(invalid)?;

    Ok(Duration::from_secs(total_minutes))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.use_mcp);
        assert_eq!(config.conversation_end_phrase, "cancel");
        assert_eq!(config.mcp.server_url, "http://localhost:3000/query");
        assert_eq!(config.conversation_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.chatgpt_engine, config.chatgpt_engine);
        assert_eq!(parsed.mcp.model, config.mcp.model);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.min_char_length, 10);
    }

    #[test]
    fn load_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "min_char_length = \"ten\"").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn parses_full_config() {
        let config = AppConfig::from_toml_str(
            r#"
use_mcp = false
api_key = "sk-test"
chat_cooldown = 500
conversation_end_phrase = "goodbye"
knowledge = "Spawn is at 0,0."

[mcp]
model = "llama3"

[npcs]
"Blacksmith Tom" = "You forge weapons and grumble about prices."
"Quiet Guard" = ""
"#,
        )
        .unwrap();
        assert!(!config.use_mcp);
        assert!(config.has_api_key());
        assert_eq!(config.cooldown(), Duration::from_millis(500));
        assert_eq!(config.mcp.model, "llama3");
        assert_eq!(config.mcp.provider, "openai");
        assert_eq!(config.knowledge_text(), "Spawn is at 0,0.");
        assert_eq!(
            config.npc_prompt("Blacksmith Tom").as_deref(),
            Some("Hello! You forge weapons and grumble about prices.")
        );
        assert_eq!(config.npc_prompt("Quiet Guard").as_deref(), Some("Hello!"));
        assert!(config.npc_prompt("Stranger").is_none());
    }

    #[test]
    fn zero_pairs_rejected() {
        let config = AppConfig {
            max_conversation_pairs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_end_phrase_rejected() {
        let config = AppConfig {
            conversation_end_phrase: "  ".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_memory_duration_rejected() {
        let err = AppConfig::from_toml_str("npc_memory_duration = \"forever\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn game_days_are_twenty_minutes() {
        assert_eq!(parse_game_duration("7d").unwrap(), Duration::from_secs(7 * 20 * 60));
        assert_eq!(
            parse_game_duration("1w").unwrap(),
            parse_game_duration("7d").unwrap()
        );
    }

    #[test]
    fn hours_and_minutes_are_real_time() {
        assert_eq!(
            parse_game_duration("2h 30m").unwrap(),
            Duration::from_secs(2 * 3600 + 30 * 60)
        );
        assert_eq!(
            parse_game_duration("1d1h").unwrap(),
            Duration::from_secs(20 * 60 + 3600)
        );
    }

    #[test]
    fn empty_duration_is_zero() {
        assert_eq!(parse_game_duration("").unwrap(), Duration::ZERO);
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
