//! # agent-runtime
//!
//! Inference backends for the trip planner and the wiring that pairs each
//! backend with the right [`ModelAdapter`].
//!
//! ## Backends
//!
//! | Kind | Provider | Adapter |
//! |------|----------|---------|
//! | `groq` (default) | [`OpenAiCompatProvider`] | [`StructuredAdapter`] |
//! | `openai` | [`OpenAiCompatProvider`] | [`StructuredAdapter`] |
//! | `ollama` | [`OllamaProvider`] | [`TextPatternAdapter`] |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{build_adapter, BackendSettings};
//!
//! let adapter = build_adapter(&BackendSettings::from_env()?)?;
//! let agent = AgentBuilder::new().adapter(adapter).tools(registry).build()?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use agent_core::adapter::DEFAULT_BACKEND_TIMEOUT;
use agent_core::provider::GenerationOptions;
use agent_core::{AgentError, ModelAdapter, Result, StructuredAdapter, TextPatternAdapter, TextToolMode};

#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;
pub use openai::{OpenAiCompatConfig, OpenAiCompatProvider};

/// Inference backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Groq,
    OpenAi,
    Ollama,
}

impl BackendKind {
    /// Default model when `MODEL_NAME` is not set
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Groq => openai::DEFAULT_GROQ_MODEL,
            Self::OpenAi => openai::DEFAULT_OPENAI_MODEL,
            Self::Ollama => "gemma3:1b",
        }
    }

    /// Whether the backend returns tool calls as structured data
    pub fn native_tools(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl FromStr for BackendKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(AgentError::Config(format!(
                "Unknown LLM_PROVIDER '{}' (expected groq, openai or ollama)",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Everything needed to build the model adapter
#[derive(Clone, Debug)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub text_mode: TextToolMode,
}

impl BackendSettings {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            model: kind.default_model().into(),
            temperature: 0.3,
            timeout: DEFAULT_BACKEND_TIMEOUT,
            text_mode: TextToolMode::default(),
        }
    }

    /// Read `LLM_PROVIDER`, `MODEL_NAME`, `LLM_TIMEOUT_SECS` and `TEXT_TOOL_MODE`.
    /// For Ollama, `OLLAMA_MODEL` applies when `MODEL_NAME` is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let kind = match get("LLM_PROVIDER") {
            Some(v) => v.parse()?,
            None => BackendKind::default(),
        };
        let mut settings = Self::new(kind);

        let model = get("MODEL_NAME").or_else(|| match kind {
            BackendKind::Ollama => get("OLLAMA_MODEL"),
            _ => None,
        });
        if let Some(model) = model {
            settings.model = model;
        }
        if let Some(secs) = get("LLM_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(mode) = get("TEXT_TOOL_MODE") {
            settings.text_mode = mode.trim().parse().map_err(AgentError::Config)?;
        }

        Ok(settings)
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            ..GenerationOptions::default()
        }
    }
}

/// Build the adapter for the configured backend
pub fn build_adapter(settings: &BackendSettings) -> Result<Arc<dyn ModelAdapter>> {
    tracing::info!(backend = %settings.kind, model = %settings.model, "Configuring inference backend");

    match settings.kind {
        BackendKind::Groq | BackendKind::OpenAi => {
            let mut config = if settings.kind == BackendKind::Groq {
                OpenAiCompatConfig::groq_from_env()
            } else {
                OpenAiCompatConfig::openai_from_env()
            };
            config.model = settings.model.clone();
            config.timeout_secs = settings.timeout.as_secs().max(1);

            let provider = OpenAiCompatProvider::new(config)?;
            Ok(Arc::new(
                StructuredAdapter::new(Arc::new(provider), settings.options()).with_timeout(settings.timeout),
            ))
        }
        BackendKind::Ollama => build_text_adapter(settings),
    }
}

#[cfg(feature = "ollama")]
fn build_text_adapter(settings: &BackendSettings) -> Result<Arc<dyn ModelAdapter>> {
    let mut config = ollama::OllamaConfig::from_env();
    config.model = settings.model.clone();

    if settings.text_mode == TextToolMode::MergeAndFinish {
        tracing::warn!(
            "Text-pattern backend merges tool output into its reply without a second inference; \
             set TEXT_TOOL_MODE=loop to feed results back to the model"
        );
    }

    Ok(Arc::new(
        TextPatternAdapter::new(Arc::new(OllamaProvider::from_config(config)), settings.options())
            .with_timeout(settings.timeout)
            .with_mode(settings.text_mode),
    ))
}

#[cfg(not(feature = "ollama"))]
fn build_text_adapter(_settings: &BackendSettings) -> Result<Arc<dyn ModelAdapter>> {
    Err(AgentError::Config("agent-runtime was built without the `ollama` feature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::adapter::Protocol;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("groq".parse::<BackendKind>().unwrap(), BackendKind::Groq);
        assert_eq!(" OpenAI ".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("ollama".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert!(matches!("bedrock".parse::<BackendKind>(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_default_models() {
        assert_eq!(BackendSettings::new(BackendKind::Groq).model, "llama-3.3-70b-versatile");
        assert_eq!(BackendSettings::new(BackendKind::OpenAi).model, "o4-mini");
        assert!(!BackendKind::Ollama.native_tools());
    }

    #[test]
    fn test_structured_backend_gets_structured_adapter() {
        let adapter = build_adapter(&BackendSettings::new(BackendKind::Groq)).unwrap();
        assert_eq!(adapter.protocol(), Protocol::Structured);
        assert!(adapter.backend().supports_tools);
    }

    fn settings(pairs: &[(&str, &str)]) -> Result<BackendSettings> {
        let vars: std::collections::HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        BackendSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_ollama_model_used_when_model_name_unset() {
        let ollama = settings(&[("LLM_PROVIDER", "ollama"), ("OLLAMA_MODEL", "llama3.2:3b")]).unwrap();
        assert_eq!(ollama.model, "llama3.2:3b");

        let explicit = settings(&[("LLM_PROVIDER", "ollama"), ("OLLAMA_MODEL", "llama3.2:3b"), ("MODEL_NAME", "qwen2.5:7b")]).unwrap();
        assert_eq!(explicit.model, "qwen2.5:7b");

        let groq = settings(&[("OLLAMA_MODEL", "llama3.2:3b")]).unwrap();
        assert_eq!(groq.kind, BackendKind::Groq);
        assert_eq!(groq.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_settings_from_lookup() {
        let parsed = settings(&[("LLM_PROVIDER", "ollama"), ("TEXT_TOOL_MODE", "loop"), ("LLM_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(parsed.text_mode, TextToolMode::LoopBack);
        assert_eq!(parsed.timeout, Duration::from_secs(5));
        assert!(settings(&[("TEXT_TOOL_MODE", "sometimes")]).is_err());
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_ollama_gets_text_adapter() {
        let mut settings = BackendSettings::new(BackendKind::Ollama);
        settings.text_mode = TextToolMode::LoopBack;
        let adapter = build_adapter(&settings).unwrap();
        assert_eq!(adapter.protocol(), Protocol::TextPattern);
        assert_eq!(adapter.backend().model, "gemma3:1b");
    }
}
