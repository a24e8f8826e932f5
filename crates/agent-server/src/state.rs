//! Application State

use std::sync::Arc;

use agent_core::Agent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orchestration loop with its adapter, tools and prompt; immutable
    /// and shared by every request
    pub agent: Arc<Agent>,

    /// Backend identifier reported by `/health` (groq, openai, ollama)
    pub backend_kind: String,
}
