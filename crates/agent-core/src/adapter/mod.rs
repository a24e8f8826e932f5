//! Model Adapters
//!
//! Uniform view of a language-model backend for the orchestration loop.
//! Two strategies exist:
//!
//! - [`StructuredAdapter`]: the backend reports tool calls natively.
//! - [`TextPatternAdapter`]: the backend only returns prose; tool calls are
//!   parsed out of the text by [`TextInvocationParser`].
//!
//! Neither adapter ever returns an error to the loop. A failed or timed-out
//! backend call becomes a fixed apologetic final answer.

mod structured;
mod text;

pub use structured::StructuredAdapter;
pub use text::{TextInvocationParser, TextPatternAdapter, TextToolMode};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AgentError;
use crate::message::{Conversation, Message};
use crate::provider::{Completion, GenerationOptions, LlmProvider, ProviderInfo};
use crate::tool::{ToolCall, ToolRegistry, ToolResult, ToolSchema};

/// Answer returned when the backend cannot be reached
pub const DEGRADED_ANSWER: &str = "I apologize, but I'm having trouble processing your request right now.";

/// Default bound on a single backend call
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Tool-calling protocol spoken by a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Structured,
    TextPattern,
}

/// What the loop does once a turn's tool calls have run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowUp {
    /// Feed the results back to the model
    Reinfer,
    /// Append the results to the assistant text and stop
    MergeAndFinish,
}

/// One inference step
#[derive(Clone, Debug)]
pub struct Generation {
    /// Assistant message to append to the conversation
    pub message: Message,

    /// Tool calls still to execute, in the order requested
    pub calls: Vec<ToolCall>,

    /// Next step after the calls have run
    pub follow_up: FollowUp,

    /// Whether this is the backend-unavailable fallback answer
    pub degraded: bool,
}

impl Generation {
    /// Final answer with no pending tool calls
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            calls: Vec::new(),
            follow_up: FollowUp::Reinfer,
            degraded: false,
        }
    }

    /// Fixed answer used when the backend is unavailable
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::answer(DEGRADED_ANSWER)
        }
    }

    pub fn is_final(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Uniform interface to a language-model backend
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Protocol this adapter speaks
    fn protocol(&self) -> Protocol;

    /// Backend description
    fn backend(&self) -> ProviderInfo;

    /// Run one inference step over the conversation
    async fn generate(&self, conversation: &Conversation, tools: &ToolRegistry) -> Generation;

    /// Fold executed tool results into a final assistant message
    fn merge(&self, message: &Message, results: &[ToolResult]) -> Message {
        merge_results(message, results)
    }
}

/// Original text followed by one `"<tool> result: <output>"` line per call
pub fn merge_results(message: &Message, results: &[ToolResult]) -> Message {
    let mut content = message.content.trim_end().to_string();
    for result in results {
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(&format!("{} result: {}", result.name, result.output));
    }
    Message::assistant(content)
}

/// Shared backend plumbing for both adapters
#[derive(Clone)]
struct Backend {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    timeout: Duration,
}

impl Backend {
    fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    /// Call the backend; `None` means it failed or timed out
    async fn complete(&self, conversation: &Conversation, tools: &[ToolSchema]) -> Option<Completion> {
        let call = self.provider.complete(conversation.messages(), tools, &self.options);

        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::BackendUnavailable(format!(
                "no response within {:?}",
                self.timeout
            ))),
        };

        match outcome {
            Ok(completion) => Some(completion),
            Err(e) => {
                tracing::error!(
                    backend = %self.provider.info().name,
                    model = %self.options.model,
                    error = %e,
                    "Model backend call failed, answering with degraded response"
                );
                None
            }
        }
    }
}
