//! Core types for the UI test agent

use serde::{Deserialize, Serialize};

/// Options for configuring the model side of an agent run
#[derive(Clone)]
pub struct AgentOptions {
    /// System prompt sent with every model call
    pub system_prompt: String,

    /// Model name (e.g., "claude-sonnet-4-5")
    pub model: String,

    /// Messages API base URL
    pub base_url: String,

    /// API key sent as `x-api-key`
    pub api_key: String,

    /// Maximum tokens to generate per assistant turn
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Dispatch the tool calls of one assistant turn concurrently
    pub concurrent_dispatch: bool,
}

impl std::fmt::Debug for AgentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOptions")
            .field("system_prompt", &self.system_prompt)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("concurrent_dispatch", &self.concurrent_dispatch)
            .finish()
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            model: String::new(),
            base_url: String::new(),
            api_key: String::new(),
            max_tokens: 4096,
            timeout: 120,
            concurrent_dispatch: false,
        }
    }
}

impl AgentOptions {
    /// Create a new builder for AgentOptions
    pub fn builder() -> AgentOptionsBuilder {
        AgentOptionsBuilder::default()
    }
}

/// Builder for AgentOptions
#[derive(Default)]
pub struct AgentOptionsBuilder {
    system_prompt: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    timeout: Option<u64>,
    concurrent_dispatch: Option<bool>,
}

impl std::fmt::Debug for AgentOptionsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOptionsBuilder")
            .field("system_prompt", &self.system_prompt)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AgentOptionsBuilder {
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn concurrent_dispatch(mut self, concurrent: bool) -> Self {
        self.concurrent_dispatch = Some(concurrent);
        self
    }

    pub fn build(self) -> crate::Result<AgentOptions> {
        let model = self
            .model
            .ok_or_else(|| crate::Error::config("model is required"))?;

        let base_url = self
            .base_url
            .ok_or_else(|| crate::Error::config("base_url is required"))?;

        Ok(AgentOptions {
            system_prompt: self.system_prompt.unwrap_or_default(),
            model,
            base_url,
            api_key: self.api_key.unwrap_or_default(),
            max_tokens: self.max_tokens.unwrap_or(4096),
            timeout: self.timeout.unwrap_or(120),
            concurrent_dispatch: self.concurrent_dispatch.unwrap_or(false),
        })
    }
}

/// Message role in the conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Content block types that can appear in messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

/// Text content block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Tool use content block, only ever emitted by the assistant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

impl ToolUseBlock {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Tool result block, only ever sent in a user turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: Vec<ToolResultContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResultBlock {
    pub fn new(
        tool_use_id: impl Into<String>,
        content: Vec<ToolResultContent>,
        is_error: bool,
    ) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content,
            is_error,
        }
    }
}

/// One part of a tool result payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultContent {
    Text { text: String },
    Image { source: ImageSource },
}

/// Inline image payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSource {
    /// Always "base64"
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".to_string(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn new(role: MessageRole, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(
            MessageRole::User,
            vec![ContentBlock::Text(TextBlock::new(text))],
        )
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a user message carrying tool results
    pub fn tool_results(results: Vec<ToolResultBlock>) -> Self {
        Self::new(
            MessageRole::User,
            results.into_iter().map(ContentBlock::ToolResult).collect(),
        )
    }

    /// Tool use blocks in the order the assistant emitted them
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUseBlock> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        })
    }

    /// Text of the first text block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_options_builder() {
        let options = AgentOptions::builder()
            .system_prompt("Test prompt")
            .model("test-model")
            .base_url("http://localhost:8080/v1")
            .api_key("test-key")
            .max_tokens(1000)
            .timeout(30)
            .concurrent_dispatch(true)
            .build()
            .unwrap();

        assert_eq!(options.system_prompt, "Test prompt");
        assert_eq!(options.model, "test-model");
        assert_eq!(options.base_url, "http://localhost:8080/v1");
        assert_eq!(options.api_key, "test-key");
        assert_eq!(options.max_tokens, 1000);
        assert_eq!(options.timeout, 30);
        assert!(options.concurrent_dispatch);
    }

    #[test]
    fn test_agent_options_builder_defaults() {
        let options = AgentOptions::builder()
            .model("test-model")
            .base_url("http://localhost:8080/v1")
            .build()
            .unwrap();

        assert_eq!(options.system_prompt, "");
        assert_eq!(options.max_tokens, 4096);
        assert_eq!(options.timeout, 120);
        assert!(!options.concurrent_dispatch);
    }

    #[test]
    fn test_agent_options_builder_missing_required() {
        let result = AgentOptions::builder()
            .base_url("http://localhost:8080/v1")
            .build();
        assert!(matches!(result, Err(crate::Error::Config(_))));

        let result = AgentOptions::builder().model("test-model").build();
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_debug_masks_api_key() {
        let options = AgentOptions::builder()
            .model("m")
            .base_url("u")
            .api_key("super-secret")
            .build()
            .unwrap();
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.first_text(), Some("Hello"));
    }

    #[test]
    fn test_tool_uses_preserve_order() {
        let msg = Message::assistant(vec![
            ContentBlock::ToolUse(ToolUseBlock::new("a", "browser", json!({}))),
            ContentBlock::Text(TextBlock::new("thinking")),
            ContentBlock::ToolUse(ToolUseBlock::new("b", "script_writer", json!({}))),
        ]);
        let ids: Vec<&str> = msg.tool_uses().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(msg.first_text(), Some("thinking"));
    }

    #[test]
    fn test_content_block_wire_format() {
        let block = ContentBlock::ToolUse(ToolUseBlock::new(
            "toolu_1",
            "browser",
            json!({"action": "screenshot"}),
        ));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "tool_use",
                "id": "toolu_1",
                "name": "browser",
                "input": {"action": "screenshot"}
            })
        );
    }

    #[test]
    fn test_tool_result_wire_format() {
        let block = ContentBlock::ToolResult(ToolResultBlock::new(
            "toolu_1",
            vec![
                ToolResultContent::Text {
                    text: "ok".to_string(),
                },
                ToolResultContent::Image {
                    source: ImageSource::base64("image/png", "AAAA"),
                },
            ],
            false,
        ));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["content"][0], json!({"type": "text", "text": "ok"}));
        assert_eq!(
            value["content"][1]["source"],
            json!({"type": "base64", "media_type": "image/png", "data": "AAAA"})
        );
        assert_eq!(value["is_error"], false);
    }

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::User).unwrap(),
            "\"user\""
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
