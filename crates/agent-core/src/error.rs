//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Language model call failed (transport or API error)
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Model returned something we could not interpret
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// External call exceeded its deadline
    #[error("Timed out after {limit:?}: {what}")]
    Timeout { what: String, limit: Duration },

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool '{tool}' failed: {cause}")]
    ToolExecution { tool: String, cause: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run log sink rejected a record
    #[error("Run log sink error: {0}")]
    Sink(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Build a tool execution error
    pub fn tool(tool: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            cause: cause.to_string(),
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Timeout { .. } | Self::Io(_)
        )
    }

    /// Whether this error came from a language model call
    pub const fn is_model_failure(&self) -> bool {
        matches!(
            self,
            Self::ModelInvocation(_)
                | Self::ProviderUnavailable(_)
                | Self::MalformedResponse(_)
                | Self::RateLimited(_)
                | Self::Auth(_)
                | Self::Timeout { .. }
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::ModelInvocation(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::MalformedResponse(_) => "The AI service returned an unreadable answer.".into(),
            Self::Timeout { .. } => "The research step took too long. Please try again.".into(),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution { tool, .. } => format!("The tool '{tool}' failed."),
            Self::RateLimited(_) => "Too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::Config(msg) => format!("The agent is misconfigured: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
