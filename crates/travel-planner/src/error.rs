//! Error Types for Travel Planner

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error("{service} returned {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Currency not supported: {0}")]
    UnsupportedCurrency(String),

    #[error("Invalid amount for '{field}': {reason}")]
    InvalidAmount { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlannerError {
    pub fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<PlannerError> for AgentError {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::MissingCredential(_)
            | PlannerError::Upstream { .. }
            | PlannerError::Network(_) => AgentError::ProviderUnavailable(err.to_string()),
            PlannerError::Config(msg) => AgentError::Config(msg),
            PlannerError::Serialization(e) => AgentError::Parse(e.to_string()),
            PlannerError::CityNotFound(_)
            | PlannerError::UnsupportedCurrency(_)
            | PlannerError::InvalidAmount { .. } => {
                AgentError::ToolExecution(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_are_provider_unavailable() {
        let err: AgentError = PlannerError::Upstream {
            service: "OpenWeatherMap",
            status: 503,
            message: "maintenance".into(),
        }
        .into();
        assert!(matches!(err, AgentError::ProviderUnavailable(msg) if msg.contains("503")));

        let err: AgentError = PlannerError::MissingCredential("TAVILY_API_KEY").into();
        assert_eq!(err.to_string(), "Provider unavailable: TAVILY_API_KEY is not configured");
    }

    #[test]
    fn test_domain_errors_are_tool_failures() {
        let err: AgentError = PlannerError::CityNotFound("Atlantis".into()).into();
        assert!(matches!(err, AgentError::ToolExecution(_)));
    }
}
