// src/error.rs

//! Unified error handling for the calendar pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or unknown conversation token or menu choice
    #[error("Invalid input: {0}")]
    Input(String),

    /// Browser launch, navigation or page structure failure
    #[error("Render error during {stage}: {message}")]
    Render { stage: String, message: String },

    /// Overall fetch budget exceeded
    #[error("Timed out during {stage} after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Configured egress path could not be established
    #[error("Egress error for {proxy}: {message}")]
    Egress { proxy: String, message: String },

    /// External collaborator (translation, activity log, analysis) failed
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Create a render error for a pipeline stage.
    pub fn render(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Create a timeout error for a pipeline stage.
    pub fn timeout(stage: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            stage: stage.into(),
            timeout_ms,
        }
    }

    /// Create an egress error for a proxy endpoint.
    pub fn egress(proxy: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Egress {
            proxy: proxy.into(),
            message: message.to_string(),
        }
    }

    /// Create a collaborator error.
    pub fn collaborator(collaborator: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether a caller may reasonably retry the operation (with backoff, or without egress).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Egress { .. })
    }
}
