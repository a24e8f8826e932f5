//! Place Search Tools
//!
//! One tool per [`PlaceCategory`]; each resolves through its fallback chain
//! so exactly one provider answers.

use async_trait::async_trait;

use agent_core::{
    FallbackChain, FallbackResolver, Tool, ToolSchema, ToolCall, ToolResult,
    tool::ParameterSchema,
    AgentError, Result as CoreResult,
};

use crate::model::PlaceCategory;

/// Tool searching one category of places
pub struct PlaceSearchTool {
    category: PlaceCategory,
    chain: FallbackChain,
    resolver: FallbackResolver,
}

impl PlaceSearchTool {
    pub fn new(category: PlaceCategory, chain: FallbackChain, resolver: FallbackResolver) -> Self {
        Self { category, chain, resolver }
    }

    pub fn category(&self) -> PlaceCategory {
        self.category
    }
}

#[async_trait]
impl Tool for PlaceSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.category.tool_name().into(),
            description: format!(
                "Search {} of a place. Tries {} in order.",
                self.category.heading("a destination"),
                self.chain.labels().join(", ")
            ),
            parameters: vec![ParameterSchema::required("place", "string", "City or region to search, e.g. 'Paris'")],
            category: Some("places".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let place = call.str_arg("place")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AgentError::invalid_arguments(self.category.tool_name(), "place must not be empty"))?;

        let result = self.resolver.resolve(&self.chain, place).await;
        if !result.success {
            return Ok(result);
        }

        let attribution = result.source.as_deref().unwrap_or("web search");
        let output = format!(
            "Following are {} as suggested by {}:\n{}",
            self.category.heading(place),
            attribution,
            result.output
        );

        Ok(ToolResult { output, ..result })
    }
}
