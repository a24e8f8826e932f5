//! Orchestration Loop
//!
//! State machine alternating model inference and tool execution:
//!
//! ```text
//! Start ──▶ Inferring ──(tool calls)──▶ ExecutingTools ──(reinfer)──┐
//!              │  ▲                           │                     │
//!              │  └───────────────────────────┼─────────────────────┘
//!              │ (final answer)               │ (merge and finish)
//!              ▼                              ▼
//!             Done ◀──────────────────────────┘
//! ```
//!
//! Every request gets its own [`Conversation`]; the agent itself is
//! immutable and shared across requests.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{FollowUp, ModelAdapter, Protocol};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::prompt::{Intent, PromptComposer};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Default ceiling on inference steps per request
pub const DEFAULT_MAX_TURNS: usize = 8;

/// Default bound on a single tool execution
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(45);

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum inference steps before the request is cut short
    pub max_turns: usize,

    /// Bound on each tool call
    pub tool_timeout: Duration,

    /// Run the tool calls of one turn concurrently
    pub parallel_tools: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            parallel_tools: true,
        }
    }
}

/// Orchestration states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Start,
    Inferring,
    ExecutingTools,
    Done,
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model produced a final answer
    Completed,
    /// The turn ceiling was reached first
    TurnLimit,
}

/// Everything a run produced
#[derive(Clone, Debug)]
pub struct RunOutcome {
    /// Final (or best partial) answer
    pub answer: String,

    /// Full conversation, system prompt first
    pub conversation: Conversation,

    /// Inference steps taken
    pub turns: usize,

    /// Intent the prompt composer assigned
    pub intent: Intent,

    pub termination: Termination,

    /// Names of executed tools, in execution order
    pub tools_invoked: Vec<String>,
}

/// The main Agent struct
pub struct Agent {
    adapter: Arc<dyn ModelAdapter>,
    tools: Arc<ToolRegistry>,
    composer: PromptComposer,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent. Text-pattern backends get the registry's tool
    /// guide appended to their system prompt.
    pub fn new(
        adapter: Arc<dyn ModelAdapter>,
        tools: Arc<ToolRegistry>,
        composer: PromptComposer,
        config: AgentConfig,
    ) -> Self {
        let composer = match adapter.protocol() {
            Protocol::TextPattern if !tools.is_empty() => {
                composer.with_tool_guide(tools.generate_prompt_section())
            }
            _ => composer,
        };

        Self {
            adapter,
            tools,
            composer,
            config,
        }
    }

    /// Answer a question, failing only when the turn ceiling is hit
    pub async fn ask(&self, question: &str) -> Result<String> {
        let outcome = self.run(question).await?;
        match outcome.termination {
            Termination::Completed => Ok(outcome.answer),
            Termination::TurnLimit => Err(AgentError::LoopNotTerminating {
                turns: outcome.turns,
                partial: Some(outcome.answer).filter(|a| !a.is_empty()),
            }),
        }
    }

    /// Drive the state machine for one request
    pub async fn run(&self, question: &str) -> Result<RunOutcome> {
        if question.trim().is_empty() {
            return Err(AgentError::invalid_arguments("question", "must not be empty"));
        }

        let mut conversation = Conversation::new();
        let mut state = LoopState::Start;
        let mut turns = 0;
        let mut intent = Intent::Direct;
        let mut tools_invoked = Vec::new();
        let mut pending: Vec<ToolCall> = Vec::new();
        let mut follow_up = FollowUp::Reinfer;

        loop {
            tracing::trace!(?state, turns, "Orchestration step");

            state = match state {
                LoopState::Start => {
                    intent = self.composer.classify(question);
                    tracing::info!(?intent, backend = %self.adapter.backend().name, "Handling request");
                    conversation.push(self.composer.compose(question));
                    conversation.push(Message::user(question));
                    LoopState::Inferring
                }

                LoopState::Inferring => {
                    if turns >= self.config.max_turns {
                        let answer = conversation.best_partial_answer().unwrap_or_default();
                        tracing::warn!(turns, max_turns = self.config.max_turns, "Turn ceiling reached, returning partial answer");
                        return Ok(RunOutcome {
                            answer,
                            conversation,
                            turns,
                            intent,
                            termination: Termination::TurnLimit,
                            tools_invoked,
                        });
                    }
                    turns += 1;

                    let generation = self.adapter.generate(&conversation, &self.tools).await;
                    conversation.push(generation.message);

                    if generation.calls.is_empty() {
                        LoopState::Done
                    } else {
                        pending = generation.calls;
                        follow_up = generation.follow_up;
                        LoopState::ExecutingTools
                    }
                }

                LoopState::ExecutingTools => {
                    let calls = std::mem::take(&mut pending);
                    let results = self.execute_tools(&calls).await;

                    for result in &results {
                        tools_invoked.push(result.name.clone());
                        conversation.push(Message::tool(result));
                    }

                    match follow_up {
                        FollowUp::Reinfer => LoopState::Inferring,
                        FollowUp::MergeAndFinish => {
                            tracing::warn!("Text-pattern turn ends after merging tool output; model does not see the results");
                            let assistant = conversation
                                .messages()
                                .iter()
                                .rev()
                                .find(|m| m.has_tool_calls())
                                .cloned()
                                .unwrap_or_else(|| Message::assistant(""));
                            conversation.push(self.adapter.merge(&assistant, &results));
                            LoopState::Done
                        }
                    }
                }

                LoopState::Done => {
                    let answer = conversation
                        .last()
                        .map(|m| m.content.clone())
                        .unwrap_or_default();
                    tracing::info!(turns, tools = tools_invoked.len(), "Request complete");
                    return Ok(RunOutcome {
                        answer,
                        conversation,
                        turns,
                        intent,
                        termination: Termination::Completed,
                        tools_invoked,
                    });
                }
            };
        }
    }

    /// Execute a turn's calls; results come back in request order
    async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if self.config.parallel_tools {
            join_all(calls.iter().map(|call| self.execute_tool(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute_tool(call).await);
            }
            results
        }
    }

    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, origin = ?call.origin, "Executing tool");

        match tokio::time::timeout(self.config.tool_timeout, self.tools.invoke_reported(call)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tool = %call.name, timeout = ?self.config.tool_timeout, "Tool timed out");
                ToolResult::failure(&call.name, format!("Error: tool timed out after {:?}", self.config.tool_timeout))
                    .with_id(call.id.clone())
            }
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the model adapter
    pub fn adapter(&self) -> &dyn ModelAdapter {
        self.adapter.as_ref()
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    adapter: Option<Arc<dyn ModelAdapter>>,
    tools: ToolRegistry,
    composer: PromptComposer,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            adapter: None,
            tools: ToolRegistry::new(),
            composer: PromptComposer::new("You are a helpful AI assistant."),
            config: AgentConfig::default(),
        }
    }

    pub fn adapter(mut self, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.composer = PromptComposer::new(prompt);
        self
    }

    pub fn max_turns(mut self, max: usize) -> Self {
        self.config.max_turns = max;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn parallel_tools(mut self, parallel: bool) -> Self {
        self.config.parallel_tools = parallel;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let adapter = self.adapter
            .ok_or_else(|| AgentError::Config("Model adapter is required".into()))?;

        if self.config.max_turns == 0 {
            return Err(AgentError::Config("max_turns must be at least 1".into()));
        }

        Ok(Agent::new(adapter, Arc::new(self.tools), self.composer, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Generation, StructuredAdapter, TextPatternAdapter, DEGRADED_ANSWER};
    use crate::message::Role;
    use crate::prompt::PLANNING_DIRECTIVE;
    use crate::provider::{Completion, GenerationOptions, LlmProvider, ProviderInfo};
    use crate::tool::{ParameterSchema, Tool, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend replaying a fixed script; repeats the last reply when exhausted
    struct ScriptedProvider {
        script: Mutex<VecDeque<Completion>>,
        calls: AtomicUsize,
        native: bool,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Completion>, native: bool) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                native,
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo { name: "scripted".into(), model: "test".into(), supports_tools: self.native }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _: &[Message], _: &[ToolSchema], _: &GenerationOptions) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                Ok(script.pop_front().unwrap())
            } else {
                script.front().cloned().ok_or_else(|| AgentError::BackendUnavailable("empty script".into()))
            }
        }
    }

    struct PlaceTool {
        name: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Tool for PlaceTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name.into(),
                description: "Look something up".into(),
                parameters: vec![ParameterSchema::required("place", "string", "Place name")],
                category: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolResult::success(self.name, format!("{} for {}", self.name, call.str_arg("place").unwrap_or("?"))))
        }
    }

    fn place_call(name: &str, id: &str) -> ToolCall {
        ToolCall::new(name, HashMap::from([("place".to_string(), json!("Paris"))])).with_id(id)
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(PlaceTool { name: "search_attractions", delay: Duration::from_millis(30) });
        registry.register(PlaceTool { name: "search_restaurants", delay: Duration::ZERO });
        registry
    }

    fn structured_agent(provider: Arc<ScriptedProvider>, max_turns: usize) -> Agent {
        AgentBuilder::new()
            .adapter(Arc::new(StructuredAdapter::new(provider, GenerationOptions::default())))
            .tools(registry())
            .max_turns(max_turns)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_final_answer_in_one_step() {
        let provider = ScriptedProvider::new(vec![Completion::text("Paris is sunny.", "test")], true);
        let outcome = structured_agent(provider.clone(), 5).run("Weather in Paris?").await.unwrap();

        assert_eq!(outcome.turns, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.answer, "Paris is sunny.");
        assert_eq!(outcome.conversation.roles(), vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let provider = ScriptedProvider::new(
            vec![
                Completion::tool_use(vec![place_call("search_attractions", "call-1")], "test"),
                Completion::text("Visit the Louvre.", "test"),
            ],
            true,
        );
        let outcome = structured_agent(provider, 5).run("What to see in Paris?").await.unwrap();

        assert_eq!(
            outcome.conversation.roles(),
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        let messages = outcome.conversation.messages();
        assert!(messages[2].has_tool_calls());
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call-1"));
        assert!(messages[3].content.contains("search_attractions for Paris"));
        assert_eq!(outcome.answer, "Visit the Louvre.");
        assert_eq!(outcome.tools_invoked, vec!["search_attractions"]);
    }

    #[tokio::test]
    async fn test_parallel_results_keep_request_order() {
        let provider = ScriptedProvider::new(
            vec![
                Completion::tool_use(
                    vec![place_call("search_attractions", "a"), place_call("search_restaurants", "b")],
                    "test",
                ),
                Completion::text("done", "test"),
            ],
            true,
        );
        let outcome = structured_agent(provider, 5).run("Paris food and sights").await.unwrap();

        let ids: Vec<_> = outcome
            .conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_fatal() {
        let provider = ScriptedProvider::new(
            vec![
                Completion::tool_use(vec![place_call("book_hotel", "x")], "test"),
                Completion::text("I cannot book hotels.", "test"),
            ],
            true,
        );
        let outcome = structured_agent(provider, 5).run("Book me a hotel").await.unwrap();

        let tool_msg = &outcome.conversation.messages()[3];
        assert!(tool_msg.content.contains("failed"));
        assert!(tool_msg.content.contains("Unknown tool"));
        assert_eq!(outcome.answer, "I cannot book hotels.");
    }

    #[tokio::test]
    async fn test_turn_ceiling_returns_partial_answer() {
        let provider = ScriptedProvider::new(
            vec![Completion::tool_use(vec![place_call("search_attractions", "loop")], "test")],
            true,
        );
        let agent = structured_agent(provider.clone(), 3);

        let outcome = agent.run("Plan a trip to Paris").await.unwrap();
        assert_eq!(outcome.termination, Termination::TurnLimit);
        assert_eq!(outcome.turns, 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.answer.contains("search_attractions for Paris"));

        let err = agent.ask("Plan a trip to Paris").await.unwrap_err();
        assert!(matches!(err, AgentError::LoopNotTerminating { turns: 3, .. }));
        assert!(err.partial_answer().is_some());
    }

    #[tokio::test]
    async fn test_backend_failure_yields_degraded_answer() {
        let provider = ScriptedProvider::new(Vec::new(), true);
        let answer = structured_agent(provider, 5).ask("Anything").await.unwrap();
        assert_eq!(answer, DEGRADED_ANSWER);
    }

    #[tokio::test]
    async fn test_planning_prompt_reaches_backend() {
        let provider = ScriptedProvider::new(vec![Completion::text("ok", "test")], true);
        let agent = structured_agent(provider, 5);

        let planning = agent.run("Plan a 3-day trip to Paris").await.unwrap();
        assert_eq!(planning.intent, Intent::Planning);
        assert!(planning.conversation.messages()[0].content.contains(PLANNING_DIRECTIVE));

        let direct = agent.run("What's the weather in Rome?").await.unwrap();
        assert_eq!(direct.intent, Intent::Direct);
        assert!(!direct.conversation.messages()[0].content.contains(PLANNING_DIRECTIVE));
    }

    #[tokio::test]
    async fn test_text_pattern_merges_and_finishes() {
        let provider = ScriptedProvider::new(
            vec![Completion::text(r#"Let me look. search_attractions("Paris")"#, "test")],
            false,
        );
        let agent = AgentBuilder::new()
            .adapter(Arc::new(TextPatternAdapter::new(provider.clone(), GenerationOptions::default())))
            .tools(registry())
            .build()
            .unwrap();

        let outcome = agent.run("What to see in Paris?").await.unwrap();
        assert_eq!(outcome.turns, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome.conversation.roles(),
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert!(outcome.answer.starts_with("Let me look."));
        assert!(outcome.answer.contains("search_attractions result: search_attractions for Paris"));
        assert!(outcome.conversation.messages()[0].content.contains("## Available Tools"));
    }

    #[tokio::test]
    async fn test_tool_timeout_is_a_failed_result() {
        let provider = ScriptedProvider::new(
            vec![
                Completion::tool_use(vec![place_call("search_attractions", "slow")], "test"),
                Completion::text("fallback answer", "test"),
            ],
            true,
        );
        let agent = AgentBuilder::new()
            .adapter(Arc::new(StructuredAdapter::new(provider, GenerationOptions::default())))
            .tools(registry())
            .tool_timeout(Duration::from_millis(1))
            .parallel_tools(false)
            .build()
            .unwrap();

        let outcome = agent.run("Sights in Paris").await.unwrap();
        assert!(outcome.conversation.messages()[3].content.contains("timed out"));
        assert_eq!(outcome.answer, "fallback answer");
    }

    #[tokio::test]
    async fn test_rejects_empty_question_and_bad_config() {
        let provider = ScriptedProvider::new(vec![Completion::text("ok", "test")], true);
        assert!(structured_agent(provider.clone(), 5).run("   ").await.is_err());

        let built = AgentBuilder::new()
            .adapter(Arc::new(StructuredAdapter::new(provider, GenerationOptions::default())))
            .max_turns(0)
            .build();
        assert!(matches!(built, Err(AgentError::Config(_))));
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_generation_answer_helper() {
        assert!(Generation::answer("x").is_final());
    }
}
