//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered once at startup and invoked by the orchestration loop;
//! after construction the registry is shared read-only behind an `Arc`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Which protocol produced a tool call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOrigin {
    /// Reported by a backend with native function calling
    #[default]
    Native,
    /// Parsed out of free-form assistant text
    TextPattern,
}

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID for pairing results with requests
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    pub arguments: HashMap<String, Value>,

    /// Protocol the call came from
    #[serde(default)]
    pub origin: CallOrigin,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: HashMap<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
            origin: CallOrigin::Native,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_origin(mut self, origin: CallOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// String argument by name
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }

    /// Numeric argument by name; numeric strings are accepted
    pub fn number_arg(&self, name: &str) -> Option<f64> {
        self.arguments.get(name).and_then(value_as_number)
    }
}

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,

    /// Fallback provider that produced the output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
            source: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
            source: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Text fed back to the model as a tool message
    pub fn to_context(&self) -> String {
        if self.success {
            format!("[Tool '{}' returned]\n{}", self.name, self.output)
        } else {
            format!("[Tool '{}' failed]\n{}", self.name, self.output)
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Element type for array parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
            items: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_items(mut self, item_type: impl Into<String>) -> Self {
        self.items = Some(item_type.into());
        self
    }

    /// Whether `value` is compatible with the declared type
    pub fn accepts(&self, value: &Value) -> bool {
        let type_ok = match self.param_type.as_str() {
            "string" => value.is_string(),
            "number" | "integer" => value_as_number(value).is_some(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };

        type_ok
            && self
                .enum_values
                .as_ref()
                .is_none_or(|allowed| allowed.contains(value))
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = serde_json::json!({
            "type": self.param_type,
            "description": self.description,
        });
        if let Some(allowed) = &self.enum_values {
            schema["enum"] = Value::Array(allowed.clone());
        }
        if let Some(item_type) = &self.items {
            schema["items"] = serde_json::json!({ "type": item_type });
        }
        schema
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions, in positional order
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping (weather, attractions, cost, ...)
    #[serde(default)]
    pub category: Option<String>,
}

impl ToolSchema {
    /// JSON Schema object describing the parameters
    pub fn parameters_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments against the declared parameter set
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            match call.arguments.get(&param.name) {
                None if param.required => {
                    return Err(AgentError::invalid_arguments(
                        &schema.name,
                        format!("missing required parameter '{}'", param.name),
                    ));
                }
                Some(value) if !param.accepts(value) => {
                    return Err(AgentError::invalid_arguments(
                        &schema.name,
                        format!("parameter '{}' expects {}, got {}", param.name, param.param_type, value),
                    ));
                }
                _ => {}
            }
        }

        if let Some(unknown) = call
            .arguments
            .keys()
            .find(|key| !schema.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(AgentError::invalid_arguments(
                &schema.name,
                format!("unexpected parameter '{}'", unknown),
            ));
        }

        Ok(())
    }
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_shared(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Tool registered twice, replacing previous definition");
        } else {
            self.order.push(name);
        }
    }

    /// Look up a tool by name
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    /// Validate and execute a tool call
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self.lookup(&call.name)?;
        tool.validate(call)?;
        let result = tool.execute(call).await?;
        Ok(result.with_id(call.id.clone()))
    }

    /// Execute a tool call, turning any error into a failed result the
    /// model can read
    pub async fn invoke_reported(&self, call: &ToolCall) -> ToolResult {
        match self.invoke(call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call could not be honored");
                ToolResult::failure(&call.name, format!("Error: {}", e)).with_id(call.id.clone())
            }
        }
    }

    /// Get all tool schemas in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.schema())
            .collect()
    }

    /// Get tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// System prompt section for backends without native tool calling
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("To use a tool, write its name followed by the argument in quotes, for example:\n\n");
        prompt.push_str("```tool\nsearch_attractions(\"Paris\")\n```\n\n");

        for schema in self.schemas() {
            let params: Vec<&str> = schema.parameters.iter().map(|p| p.name.as_str()).collect();
            prompt.push_str(&format!("### {}({})\n", schema.name, params.join(", ")));
            prompt.push_str(&format!("{}\n", schema.description));

            if !schema.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &schema.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    prompt.push_str(&format!(
                        "- `{}` ({}){}: {}\n",
                        param.name, param.param_type, required, param.description
                    ));
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
