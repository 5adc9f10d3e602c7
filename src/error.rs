//! Error types for Aria.

use std::time::Duration;

use serde::Serialize;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport and channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Channel {name} disconnected: {reason}")]
    Disconnected { name: String, reason: String },

    #[error("Failed to send {content_type} on channel {name}: {reason}")]
    SendFailed {
        name: String,
        content_type: &'static str,
        reason: String,
    },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Generative responder errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wallet-call payload construction errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid wallet address '{0}': expected 0x followed by 40 hex characters")]
    InvalidAddress(String),

    #[error("Amount {amount} cannot be encoded with {decimals} decimals")]
    AmountOverflow { amount: String, decimals: u32 },

    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(String),

    #[error("Failed to create wallet send calls for {token} transfer to {to}: {source}")]
    SendCalls {
        token: String,
        to: String,
        #[source]
        source: Box<Error>,
    },
}

/// Validation failures for user input and outbound content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("{field} must contain between {min} and {max} entries, got {actual}")]
    OutOfRange {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("{0} must be greater than zero")]
    NonPositiveNumber(&'static str),

    #[error("{field} has an invalid value: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Inbound content decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Malformed {content_type} payload: {reason}")]
    Malformed {
        content_type: String,
        reason: String,
    },

    #[error("Unsupported content type descriptor: {0}")]
    UnsupportedDescriptor(String),
}

/// Stable error codes carried in structured logs.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigError,
    ChannelError,
    LlmError,
    WalletError,
    ValidationError,
    ContentError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::ChannelError => "CHANNEL_ERROR",
            Self::LlmError => "LLM_ERROR",
            Self::WalletError => "WALLET_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ContentError => "CONTENT_ERROR",
        }
    }
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Channel(_) => ErrorCode::ChannelError,
            Self::Llm(_) => ErrorCode::LlmError,
            Self::Wallet(_) => ErrorCode::WalletError,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Content(_) => ErrorCode::ContentError,
        }
    }

    /// Domain errors are expected outcomes of user input or flaky peers and
    /// are logged at warn; everything else is logged at error.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Wallet(_) | Self::Content(_)
        )
    }
}

/// Log an error with structured context. The single reporting path for every
/// per-message error boundary.
pub fn report_error(err: &Error, context: &[(&str, &str)]) {
    let context = context
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    if err.is_domain_error() {
        tracing::warn!(
            event = "agent_error",
            code = err.code().as_str(),
            context = %context,
            "Agent error: {err}"
        );
    } else {
        tracing::error!(
            event = "unexpected_error",
            code = err.code().as_str(),
            context = %context,
            "Unexpected error: {err}"
        );
    }
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
