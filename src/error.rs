//! Error types for Encarta
//!
//! `ChatError` is the outcome taxonomy of a single chat request. `AppError`
//! covers configuration and startup failures.

use thiserror::Error;

/// Failure of a single chat-completion call
///
/// Every variant is terminal for the call that produced it. Nothing is retried.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Network or connection failure, including the request timeout
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// Endpoint answered with something other than 200 OK
    ///
    /// The raw body is kept for diagnostics, it is never decoded.
    #[error("Endpoint returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// Body did not match the chat-completion schema
    #[error("Failed to decode chat response: {reason}")]
    Decode { reason: String },

    /// Body decoded but carried no choices
    #[error("Chat response contained no choices")]
    EmptyResponse,

    /// Superseded by a newer request from the same session
    #[error("Request was superseded by a newer one")]
    Cancelled,
}

impl ChatError {
    /// Returns true if this outcome is a supersession rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }

    /// Returns true if this outcome should be surfaced to the user
    ///
    /// Cancellation is an internal no-op outcome. Every other variant is a
    /// genuine failure.
    pub fn is_user_visible(&self) -> bool {
        !self.is_cancelled()
    }

    /// Stable label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Transport { .. } => "transport",
            ChatError::BadStatus { .. } => "bad_status",
            ChatError::Decode { .. } => "decode",
            ChatError::EmptyResponse => "empty_response",
            ChatError::Cancelled => "cancelled",
        }
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("API key not found: environment variable {var} is unset or empty")]
    MissingApiKey { var: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
