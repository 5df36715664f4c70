//! # Tool System
//!
//! Every capability the model can drive is a [`Tool`]: a value that can describe itself
//! with a [`ToolSchema`] and execute a named action with JSON parameters. New tools are
//! added by implementing the trait, then handing the value to a [`ToolRegistry`].
//!
//! ## Tool Lifecycle
//!
//! ```text
//! 1. Construction: tool value built fresh for the run (no process-wide state)
//! 2. Registration: ToolRegistry::register rejects duplicate names
//! 3. start():      stateful tools acquire their resources (browser session)
//! 4. invoke():     called once per tool-use block, routed by name
//! 5. close():      always called once when the agent loop exits
//! ```
//!
//! ## Failure Signalling
//!
//! Tools have two ways to report trouble:
//!
//! - A [`ToolResult`] with `error` set, for problems the model can fix by itself
//!   (missing parameter, file could not be written).
//! - A [`ToolError`], for unsupported actions and unexpected failures. The dispatcher
//!   converts it into a failure result, so nothing a tool does can abort the loop.

use crate::result::ToolResult;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

mod browser;
mod registry;
mod script_writer;

pub use browser::{
    BrowserDriver, BrowserSession, BrowserSettings, BrowserTool, MAX_CONTENT_CHARS, ReleaseStage,
    TEARDOWN_GRACE, Viewport, map_key,
};
pub use registry::ToolRegistry;
pub use script_writer::ScriptWriterTool;

/// Error a tool raises instead of returning a failure result.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// The tool recognised its own failure condition; the message goes to the model as-is
    #[error("{0}")]
    Invocation(String),

    /// Anything else that went wrong while the tool ran
    #[error(transparent)]
    Unexpected(#[from] crate::Error),
}

impl ToolError {
    /// Create a new invocation error
    pub fn invocation(msg: impl Into<String>) -> Self {
        ToolError::Invocation(msg.into())
    }

    /// The error every tool returns for an action it does not implement
    pub fn unknown_action(action: &str) -> Self {
        ToolError::invocation(format!("Unknown action: {}", action))
    }
}

/// Capability interface implemented by every tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model. `name` is the registry key.
    fn describe(&self) -> ToolSchema;

    /// Execute `action` with the full tool input as `params`.
    async fn invoke(&self, action: &str, params: &Value) -> Result<ToolResult, ToolError>;

    /// Acquire resources before the first invocation.
    async fn start(&self) -> crate::Result<()> {
        Ok(())
    }

    /// Release resources. Called exactly once per run by the registry.
    async fn close(&self) -> crate::Result<()> {
        Ok(())
    }
}

/// Tool description sent to the model with every request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSchema {
    /// Start building a schema with a name and description.
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolSchemaBuilder {
        ToolSchemaBuilder::new(name, description)
    }
}

/// Builder for [`ToolSchema`] with an `action` discriminant.
///
/// ```rust
/// use ui_test_agent::ToolSchema;
///
/// let schema = ToolSchema::builder("script_writer", "Write files")
///     .actions(&["write"], "The action to perform")
///     .param("path", "string", "Where to write", true)
///     .param("content", "string", "What to write", true)
///     .build();
///
/// assert_eq!(schema.input_schema["required"][0], "action");
/// ```
#[derive(Debug, Clone)]
pub struct ToolSchemaBuilder {
    name: String,
    description: String,
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl ToolSchemaBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Declare the closed set of supported actions. The `action` field is always required.
    pub fn actions(mut self, actions: &[&str], description: &str) -> Self {
        self.properties.insert(
            "action".to_string(),
            serde_json::json!({
                "type": "string",
                "enum": actions,
                "description": description,
            }),
        );
        if !self.required.iter().any(|r| r == "action") {
            self.required.insert(0, "action".to_string());
        }
        self
    }

    /// Add a parameter with a simple type string ("string", "integer", ...).
    pub fn param(mut self, name: &str, type_str: &str, description: &str, required: bool) -> Self {
        let mut prop = type_to_json_schema(type_str);
        if let Some(obj) = prop.as_object_mut() {
            obj.insert("description".to_string(), Value::from(description));
        }
        self.properties.insert(name.to_string(), prop);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn build(self) -> ToolSchema {
        ToolSchema {
            name: self.name,
            description: self.description,
            input_schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// Convert a simple type string into a JSON Schema type object.
///
/// Unknown names fall back to `"string"`.
fn type_to_json_schema(type_str: &str) -> Value {
    let json_type = match type_str {
        "string" | "str" => "string",
        "integer" | "int" | "i32" | "i64" | "u32" | "u64" => "integer",
        "number" | "float" | "f32" | "f64" => "number",
        "boolean" | "bool" => "boolean",
        "array" | "list" | "vec" => "array",
        "object" | "dict" | "map" => "object",
        _ => "string",
    };

    serde_json::json!({ "type": json_type })
}

/// Read a required, non-empty string parameter.
pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
