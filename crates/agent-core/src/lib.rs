//! # agent-core
//!
//! Tool-orchestration engine: provider-agnostic model adapters, a tool
//! registry, provider fallback chains and the loop that ties them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Agent                                │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │ Orchestration│  │    Tools     │  │  ModelAdapter          │  │
//! │  │    Loop      │──│   Registry   │  │  ├ StructuredAdapter   │  │
//! │  └──────┬───────┘  └──────┬───────┘  │  └ TextPatternAdapter  │  │
//! │         │                 │          └───────────┬────────────┘  │
//! │  ┌──────┴───────┐  ┌──────┴───────┐  ┌───────────┴────────────┐  │
//! │  │PromptComposer│  │  Fallback    │  │  LlmProvider           │  │
//! │  └──────────────┘  │  Resolver    │  │  (Strategy)            │  │
//! │                    └──────────────┘  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Groq, OpenAI, Ollama,
//! or any other backend without changing the loop.

pub mod adapter;
pub mod error;
pub mod fallback;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use adapter::{ModelAdapter, StructuredAdapter, TextPatternAdapter, TextToolMode};
pub use error::{AgentError, Result};
pub use fallback::{FallbackChain, FallbackProvider, FallbackResolver, ProviderAvailability};
pub use message::{Conversation, Message, Role};
pub use prompt::{Intent, PromptComposer};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder, AgentConfig, RunOutcome, Termination};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
