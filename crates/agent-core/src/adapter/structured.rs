//! Adapter for backends with native function calling

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Backend, FollowUp, Generation, ModelAdapter, Protocol};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider, ProviderInfo};
use crate::tool::{CallOrigin, ToolRegistry};

/// Passes tool schemas to the backend and takes its tool calls verbatim
pub struct StructuredAdapter {
    backend: Backend,
}

impl StructuredAdapter {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            backend: Backend::new(provider, options),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.backend.timeout = timeout;
        self
    }
}

#[async_trait]
impl ModelAdapter for StructuredAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Structured
    }

    fn backend(&self) -> ProviderInfo {
        self.backend.provider.info()
    }

    async fn generate(&self, conversation: &Conversation, tools: &ToolRegistry) -> Generation {
        let schemas = tools.schemas();
        let Some(completion) = self.backend.complete(conversation, &schemas).await else {
            return Generation::degraded();
        };

        let calls: Vec<_> = completion
            .tool_calls
            .into_iter()
            .map(|mut call| {
                if call.id.is_empty() {
                    call.id = uuid::Uuid::new_v4().to_string();
                }
                call.with_origin(CallOrigin::Native)
            })
            .collect();

        if calls.is_empty() {
            return Generation::answer(completion.content);
        }

        tracing::debug!(
            tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Backend requested tools"
        );

        Generation {
            message: Message::assistant_with_calls(completion.content, calls.clone()),
            calls,
            follow_up: FollowUp::Reinfer,
            degraded: false,
        }
    }
}
