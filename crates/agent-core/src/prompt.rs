//! Prompt Composition
//!
//! Builds the system message sent ahead of the conversation. Requests that
//! look like multi-step planning get an extra directive pushing the model to
//! gather data with tools instead of answering from memory.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Keywords that mark a request as a planning task
pub const PLANNING_KEYWORDS: &[&str] = &["plan", "trip", "itinerary", "vacation", "travel"];

/// Directive appended for planning requests
pub const PLANNING_DIRECTIVE: &str = "IMPORTANT: For travel planning queries, you MUST call multiple tools \
to provide comprehensive information instead of answering directly. At minimum call the weather, \
attractions, restaurants (dining), activities, transportation and cost calculation tools before writing \
the final plan.";

/// Classified intent of the latest user turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Multi-step planning request
    Planning,
    /// Single, specific question
    Direct,
}

/// Composes the effective system instruction for a request
#[derive(Clone, Debug)]
pub struct PromptComposer {
    base: String,
    keywords: Vec<String>,
    directive: String,
    tool_guide: Option<String>,
}

impl PromptComposer {
    /// Composer with the default planning keywords and directive
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            keywords: PLANNING_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            directive: PLANNING_DIRECTIVE.into(),
            tool_guide: None,
        }
    }

    /// Replace the planning keyword set
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(|k| k.into().to_lowercase()).collect();
        self
    }

    /// Replace the planning directive
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    /// Append a tool usage guide (for backends without native tool calling)
    pub fn with_tool_guide(mut self, guide: impl Into<String>) -> Self {
        self.tool_guide = Some(guide.into());
        self
    }

    /// Case-insensitive keyword match over the latest user turn only
    pub fn classify(&self, latest_user_text: &str) -> Intent {
        let lower = latest_user_text.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            Intent::Planning
        } else {
            Intent::Direct
        }
    }

    /// Build the system message for this request
    pub fn compose(&self, latest_user_text: &str) -> Message {
        let mut content = self.base.clone();

        if let Some(guide) = &self.tool_guide {
            content.push_str("\n\n");
            content.push_str(guide);
        }

        if self.classify(latest_user_text) == Intent::Planning {
            content.push_str("\n\n");
            content.push_str(&self.directive);
        }

        Message::system(content)
    }
}
