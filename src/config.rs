//! Configuration management for Encarta
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every field has a default matching the stock chat client, so an empty file
//! (or no file at all) is a valid configuration. The API credential is never
//! part of the file; only the name of the environment variable holding it is.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Chat-completions endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Model identifier sent with every request
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// System message prepended to every request
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Estás hablando con un asistente de inteligencia artificial. ¿En qué puedo ayudarte hoy?";
/// Instruction appended to every user prompt
pub const DEFAULT_PROMPT_SUFFIX: &str = ". Limita tu respuesta a 50 palabras o menos";
/// Completion token cap
pub const DEFAULT_MAX_TOKENS: u32 = 150;
/// Environment variable holding the bearer token
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Text the recognized label is compared against
pub const DEFAULT_REFERENCE_TEXT: &str = "Valclan";

const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

/// Remote endpoint and transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Request shaping: model, prompts and token cap
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_prompt_suffix")]
    pub prompt_suffix: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: default_system_prompt(),
            prompt_suffix: default_prompt_suffix(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_prompt_suffix() -> String {
    DEFAULT_PROMPT_SUFFIX.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Text recognition screen settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionConfig {
    #[serde(default = "default_reference_text")]
    pub reference_text: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            reference_text: default_reference_text(),
        }
    }
}

fn default_reference_text() -> String {
    DEFAULT_REFERENCE_TEXT.to_string()
}

/// Speech recognition and synthesis settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechConfig {
    #[serde(default = "default_recognition_locale")]
    pub recognition_locale: String,
    #[serde(default = "default_voice_language")]
    pub voice_language: String,
    #[serde(default = "default_voice_rate")]
    pub voice_rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            recognition_locale: default_recognition_locale(),
            voice_language: default_voice_language(),
            voice_rate: default_voice_rate(),
        }
    }
}

fn default_recognition_locale() -> String {
    "es-ES".to_string()
}

fn default_voice_language() -> String {
    "es-MX".to_string()
}

fn default_voice_rate() -> f32 {
    0.55
}

/// Bearer token resolved from the environment
///
/// `Debug` and `Display` are redacted so the secret never reaches a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, for the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                path = %path.as_ref().display(),
                "Config file not found, using built-in defaults"
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        let endpoint = self.api.endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(AppError::Config(format!(
                "api.endpoint must be an http(s) URL, got '{}'",
                self.api.endpoint
            )));
        }

        if self.api.api_key_env.trim().is_empty() {
            return Err(AppError::Config(
                "api.api_key_env cannot be empty".to_string(),
            ));
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "api.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.api.request_timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "api.request_timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.api.request_timeout_seconds
            )));
        }

        if self.chat.model.trim().is_empty() {
            return Err(AppError::Config("chat.model cannot be empty".to_string()));
        }

        if self.chat.max_tokens == 0 {
            return Err(AppError::Config(
                "chat.max_tokens must be greater than 0".to_string(),
            ));
        }

        let rate = self.speech.voice_rate;
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(AppError::Config(format!(
                "speech.voice_rate must be between 0.0 and 1.0, got {}",
                rate
            )));
        }

        Ok(())
    }

    /// Resolve the API key from the process environment
    pub fn api_key(&self) -> AppResult<ApiKey> {
        self.api_key_with(|var| std::env::var(var).ok())
    }

    /// Resolve the API key through a custom lookup
    ///
    /// A blank value is treated the same as a missing one.
    pub fn api_key_with<F>(&self, lookup: F) -> AppResult<ApiKey>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let var = &self.api.api_key_env;
        match lookup(var) {
            Some(value) if !value.trim().is_empty() => Ok(ApiKey::new(value.trim())),
            _ => Err(AppError::MissingApiKey { var: var.clone() }),
        }
    }
}
