//! Adapter for backends that only return prose
//!
//! The backend is told (through the system prompt) to write tool invocations
//! as `tool_name("value")`. [`TextInvocationParser`] recovers them with a
//! fixed grammar:
//!
//! ```text
//! invocation := NAME ws* "(" ARGS ")"          NAME must be a registered tool
//! ARGS       := JSON-object | text containing a quoted value
//! ```
//!
//! A quoted value is positional: it binds to `city` when the tool's first
//! parameter mentions a city, otherwise to `place`. This is a best-effort
//! compatibility shim; backends with native tool calling should go through
//! [`StructuredAdapter`](super::StructuredAdapter) instead.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use super::{Backend, FollowUp, Generation, ModelAdapter, Protocol};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationOptions, LlmProvider, ProviderInfo};
use crate::tool::{CallOrigin, ToolCall, ToolRegistry, ToolSchema};

/// Markers that announce an invocation even without a tool name match
const INVOCATION_MARKERS: &[&str] = &["```tool", "<tool_call>"];

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("quoted pattern is valid"));

/// How a text-pattern turn continues after its tools ran
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextToolMode {
    /// Merge results into the assistant text and end the turn
    #[default]
    MergeAndFinish,
    /// Feed results back to the model like the structured path
    LoopBack,
}

impl std::str::FromStr for TextToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" | "merge_and_finish" => Ok(Self::MergeAndFinish),
            "loop" | "loop_back" | "loopback" => Ok(Self::LoopBack),
            other => Err(format!("Unknown text tool mode: {}", other)),
        }
    }
}

/// Extracts tool invocations from free-form assistant text
#[derive(Clone, Copy, Debug, Default)]
pub struct TextInvocationParser;

impl TextInvocationParser {
    pub fn new() -> Self {
        Self
    }

    /// Whether the text looks like it contains a tool call
    pub fn detects(&self, text: &str, tools: &[ToolSchema]) -> bool {
        INVOCATION_MARKERS.iter().any(|m| text.contains(m))
            || tools.iter().any(|t| text.contains(t.name.as_str()))
    }

    /// Parse invocations of registered tools, ordered by position in the
    /// text; only the first invocation of each tool is kept
    pub fn parse(&self, text: &str, tools: &[ToolSchema]) -> Vec<ToolCall> {
        if !self.detects(text, tools) {
            return Vec::new();
        }

        let mut found: Vec<(usize, ToolCall)> = tools
            .iter()
            .filter(|schema| text.contains(schema.name.as_str()))
            .filter_map(|schema| first_invocation(schema, text))
            .collect();

        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, call)| call).collect()
    }
}

/// `\bname\s*\(args\)` for one tool
fn invocation_pattern(name: &str) -> Option<Regex> {
    match Regex::new(&format!(r"\b{}\s*\(([^)]*)\)", regex::escape(name))) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(tool = %name, error = %e, "Cannot build invocation pattern");
            None
        }
    }
}

/// First invocation of `schema` with a usable argument, with its offset
fn first_invocation(schema: &ToolSchema, text: &str) -> Option<(usize, ToolCall)> {
    let pattern = invocation_pattern(&schema.name)?;

    for cap in pattern.captures_iter(text) {
        let (Some(whole), Some(raw_args)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        match bind_arguments(schema, raw_args.as_str()) {
            Some(arguments) => {
                let call = ToolCall::new(schema.name.as_str(), arguments).with_origin(CallOrigin::TextPattern);
                return Some((whole.start(), call));
            }
            None => {
                tracing::debug!(tool = %schema.name, args = %raw_args.as_str(), "Invocation without a usable argument");
            }
        }
    }

    None
}

fn bind_arguments(schema: &ToolSchema, raw: &str) -> Option<HashMap<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return Some(map.into_iter().collect());
    }

    let quoted = QUOTED.captures(raw)?;
    let value = quoted.get(1).or_else(|| quoted.get(2))?.as_str();
    if value.trim().is_empty() {
        return None;
    }

    let key = match schema.parameters.first() {
        Some(first) if first.name.contains("city") => "city",
        _ => "place",
    };

    Some(HashMap::from([(key.to_string(), Value::String(value.to_string()))]))
}

/// Drives a text-only backend and parses tool calls out of its replies
pub struct TextPatternAdapter {
    backend: Backend,
    parser: TextInvocationParser,
    mode: TextToolMode,
}

impl TextPatternAdapter {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            backend: Backend::new(provider, options),
            parser: TextInvocationParser::new(),
            mode: TextToolMode::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.backend.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: TextToolMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> TextToolMode {
        self.mode
    }
}

#[async_trait]
impl ModelAdapter for TextPatternAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::TextPattern
    }

    fn backend(&self) -> ProviderInfo {
        self.backend.provider.info()
    }

    async fn generate(&self, conversation: &Conversation, tools: &ToolRegistry) -> Generation {
        let Some(completion) = self.backend.complete(conversation, &[]).await else {
            return Generation::degraded();
        };

        let schemas = tools.schemas();
        let calls = self.parser.parse(&completion.content, &schemas);

        if calls.is_empty() {
            if self.parser.detects(&completion.content, &schemas) {
                tracing::debug!("Reply mentions tools but contains no parsable invocation");
            }
            return Generation::answer(completion.content);
        }

        let follow_up = match self.mode {
            TextToolMode::MergeAndFinish => FollowUp::MergeAndFinish,
            TextToolMode::LoopBack => FollowUp::Reinfer,
        };

        Generation {
            message: Message::assistant_with_calls(completion.content, calls.clone()),
            calls,
            follow_up,
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::provider::Completion;
    use crate::tool::ParameterSchema;
    use serde_json::json;

    fn schema(name: &str, first_param: &str) -> ToolSchema {
        ToolSchema {
            name: name.into(),
            description: String::new(),
            parameters: vec![ParameterSchema::required(first_param, "string", "")],
            category: None,
        }
    }

    fn tools() -> Vec<ToolSchema> {
        vec![
            schema("get_current_weather", "city"),
            schema("search_attractions", "place"),
            schema("search_restaurants", "place"),
        ]
    }

    #[test]
    fn test_positional_place_argument() {
        let calls = TextInvocationParser::new().parse(r#"search_attractions("Paris")"#, &tools());

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search_attractions");
        assert_eq!(calls[0].arguments, HashMap::from([("place".to_string(), json!("Paris"))]));
        assert_eq!(calls[0].origin, CallOrigin::TextPattern);
    }

    #[test]
    fn test_city_parameter_binds_city() {
        let calls = TextInvocationParser::new().parse("I'll call get_current_weather('Rome') now.", &tools());
        assert_eq!(calls[0].arguments, HashMap::from([("city".to_string(), json!("Rome"))]));
    }

    #[test]
    fn test_calls_follow_text_order_and_dedupe() {
        let text = "```tool\nsearch_restaurants(\"Paris\")\nget_current_weather(\"Paris\")\nsearch_restaurants(\"Lyon\")\n```";
        let calls = TextInvocationParser::new().parse(text, &tools());

        let names: Vec<_> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["search_restaurants", "get_current_weather"]);
        assert_eq!(calls[0].str_arg("place"), Some("Paris"));
    }

    #[test]
    fn test_invocation_inside_parenthesised_prose() {
        let parser = TextInvocationParser::new();
        let text = r#"Let me check the weather (get_current_weather("Rome")) first."#;
        assert!(parser.detects(text, &tools()));

        let calls = parser.parse(text, &tools());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_current_weather");
        assert_eq!(calls[0].str_arg("city"), Some("Rome"));
    }

    #[test]
    fn test_json_object_arguments() {
        let calls = TextInvocationParser::new().parse(r#"search_attractions({"place": "Kyoto"})"#, &tools());
        assert_eq!(calls[0].str_arg("place"), Some("Kyoto"));
    }

    #[test]
    fn test_unregistered_and_unquoted_ignored() {
        let parser = TextInvocationParser::new();
        assert!(parser.parse(r#"book_flight("Paris")"#, &tools()).is_empty());
        assert!(parser.parse("search_attractions(Paris)", &tools()).is_empty());
        assert!(parser.parse(r#"search_attractions("")"#, &tools()).is_empty());
    }

    #[test]
    fn test_detection_rule() {
        let parser = TextInvocationParser::new();
        assert!(parser.detects("You could use search_attractions for that", &tools()));
        assert!(parser.detects("<tool_call>anything</tool_call>", &tools()));
        assert!(!parser.detects("Paris is lovely in spring.", &tools()));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("loop".parse::<TextToolMode>(), Ok(TextToolMode::LoopBack));
        assert_eq!("merge".parse::<TextToolMode>(), Ok(TextToolMode::MergeAndFinish));
        assert!("sometimes".parse::<TextToolMode>().is_err());
    }

    struct ProseProvider(&'static str);

    #[async_trait]
    impl LlmProvider for ProseProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo { name: "prose".into(), model: "m".into(), supports_tools: false }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _: &[Message], tools: &[ToolSchema], _: &GenerationOptions) -> Result<Completion> {
            assert!(tools.is_empty(), "text backends never receive schemas");
            Ok(Completion::text(self.0, "m"))
        }
    }

    #[tokio::test]
    async fn test_generate_parses_reply() {
        use crate::tool::{Tool, ToolResult};

        struct Attractions;

        #[async_trait]
        impl Tool for Attractions {
            fn schema(&self) -> ToolSchema {
                schema("search_attractions", "place")
            }

            async fn execute(&self, _: &ToolCall) -> Result<ToolResult> {
                Ok(ToolResult::success("search_attractions", "Louvre"))
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Attractions);

        let merge = TextPatternAdapter::new(Arc::new(ProseProvider(r#"search_attractions("Paris")"#)), GenerationOptions::default());
        let generation = merge.generate(&Conversation::new(), &registry).await;
        assert_eq!(generation.calls.len(), 1);
        assert_eq!(generation.follow_up, FollowUp::MergeAndFinish);

        let looping = TextPatternAdapter::new(Arc::new(ProseProvider(r#"search_attractions("Paris")"#)), GenerationOptions::default())
            .with_mode(TextToolMode::LoopBack);
        assert_eq!(looping.generate(&Conversation::new(), &registry).await.follow_up, FollowUp::Reinfer);

        let prose = TextPatternAdapter::new(Arc::new(ProseProvider("Paris is lovely.")), GenerationOptions::default());
        assert!(prose.generate(&Conversation::new(), &registry).await.is_final());
    }
}
