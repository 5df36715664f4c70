//! Tool registry and dispatcher.

use super::{Tool, ToolError, ToolSchema};
use crate::result::ToolResult;
use crate::{Error, Result};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Immutable name → tool mapping, built once per run.
///
/// The registry is the single boundary where tool failures are normalised: whatever a
/// tool does, [`ToolRegistry::dispatch`] hands back a [`ToolResult`].
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    schemas: Vec<ToolSchema>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Build the registry. Fails with [`Error::Config`] if two tools share a name.
    pub fn register(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        let mut schemas = Vec::with_capacity(tools.len());

        for (position, tool) in tools.iter().enumerate() {
            let schema = tool.describe();
            if index.insert(schema.name.clone(), position).is_some() {
                return Err(Error::config(format!(
                    "Duplicate tool name: {}",
                    schema.name
                )));
            }
            schemas.push(schema);
        }

        Ok(Self {
            tools,
            schemas,
            index,
        })
    }

    /// Schemas of all tools, in registration order
    pub fn describe_all(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Route one invocation. Never fails and never panics outward.
    pub async fn dispatch(&self, name: &str, input: &Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            log::warn!("Model requested unknown tool '{}'", name);
            return ToolResult::failure(format!("Tool '{}' is invalid", name));
        };

        let action = input.get("action").and_then(Value::as_str).unwrap_or("");
        log::debug!("Dispatching {}.{}", name, action);

        let outcome = AssertUnwindSafe(tool.invoke(action, input))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(ToolError::Invocation(message))) => {
                log::debug!("Tool '{}' rejected invocation: {}", name, message);
                ToolResult::failure(message)
            }
            Ok(Err(ToolError::Unexpected(err))) => {
                log::warn!("Tool '{}' failed: {}", name, err);
                ToolResult::failure(format!("Unexpected error: {}", err))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::warn!("Tool '{}' panicked: {}", name, message);
                ToolResult::failure(format!("Unexpected error: {}", message))
            }
        }
    }

    /// Start every tool in registration order, stopping at the first failure.
    pub async fn start_all(&self) -> Result<()> {
        for (tool, schema) in self.tools.iter().zip(&self.schemas) {
            log::debug!("Starting tool '{}'", schema.name);
            tool.start().await?;
        }
        Ok(())
    }

    /// Close every tool. Failures are logged and collected; every tool is attempted.
    pub async fn close_all(&self) -> Vec<Error> {
        let mut failures = Vec::new();
        for (tool, schema) in self.tools.iter().zip(&self.schemas) {
            if let Err(err) = tool.close().await {
                log::warn!("Closing tool '{}' failed: {}", schema.name, err);
                failures.push(err);
            }
        }
        failures
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
