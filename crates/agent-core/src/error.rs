//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model backend call failed or timed out
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Capability provider failed or is not configured
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments do not satisfy the tool's declared parameters
    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Every provider of a fallback chain was exhausted
    #[error("No acceptable provider for {0}")]
    NoAcceptableProvider(String),

    /// Turn ceiling reached in the orchestration loop
    #[error("Loop did not terminate within {turns} turns")]
    LoopNotTerminating {
        turns: usize,
        partial: Option<String>,
    },

    /// Parse error (e.g., tool call parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

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
    /// Shorthand for an [`AgentError::InvalidArguments`]
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        AgentError::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::BackendUnavailable(_)
                | AgentError::ProviderUnavailable(_)
                | AgentError::Io(_)
        )
    }

    /// Partial answer carried by a turn-ceiling error, if any
    pub fn partial_answer(&self) -> Option<&str> {
        match self {
            AgentError::LoopNotTerminating { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::BackendUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::ProviderUnavailable(msg) => format!("A data provider is unavailable: {}", msg),
            AgentError::UnknownTool(name) => format!("The tool '{}' is not available.", name),
            AgentError::InvalidArguments { tool, reason } => {
                format!("Invalid input for tool '{}': {}", tool, reason)
            }
            AgentError::ToolExecution(msg) => format!("Tool error: {}", msg),
            AgentError::NoAcceptableProvider(what) => format!("No data source could answer for {}.", what),
            AgentError::LoopNotTerminating { .. } => {
                "The request took too many steps to complete. Please try a simpler query.".into()
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
