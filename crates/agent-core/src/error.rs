//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Most of these never escape a [`StructuredAgent`](crate::StructuredAgent):
/// the agent folds them into its fallback result so the routing graph always
/// has something to route on.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A single completion call exceeded its time budget
    #[error("Completion timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Model output could not be parsed into a structured result
    #[error("Parse error: {0}")]
    Parse(String),

    /// Post-processing of a parsed result failed (e.g. arithmetic evaluation)
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Reference table could not be loaded
    #[error("Table error: {0}")]
    Table(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled before reaching the sink
    #[error("Run cancelled")]
    Cancelled,
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            AgentError::Timeout(_) => "The AI service took too long to answer.".into(),
            AgentError::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            AgentError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            AgentError::Table(msg) => format!("Reference data could not be loaded: {}", msg),
            AgentError::Config(msg) => format!("The service is misconfigured: {}", msg),
            AgentError::Cancelled => "The request was cancelled.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
