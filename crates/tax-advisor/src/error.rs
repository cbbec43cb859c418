//! Error Types for the Tax Advisor

use thiserror::Error;

use agent_core::AgentError;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl From<AdvisorError> for AgentError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::Agent(inner) => inner,
            AdvisorError::Config(msg) => AgentError::Config(msg),
            other => AgentError::Evaluation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_errors_become_evaluation_failures() {
        let err: AgentError = AdvisorError::DivisionByZero.into();
        assert!(matches!(err, AgentError::Evaluation(ref m) if m == "Division by zero"));
    }

    #[test]
    fn test_agent_errors_pass_through() {
        let err: AgentError = AdvisorError::Agent(AgentError::Timeout(90)).into();
        assert!(matches!(err, AgentError::Timeout(90)));
    }
}
