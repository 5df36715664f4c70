//! Model client adapter.
//!
//! The agent loop only needs one thing from the model service: given the conversation,
//! the system prompt and the tool schemas, produce the next assistant turn. That boundary
//! is the [`ModelClient`] trait. [`AnthropicClient`] implements it against the Messages API
//! over HTTP.
//!
//! Any failure (connection error, non-2xx status, undecodable body) is returned as an
//! [`Error`], which the loop treats as fatal. There is no retry here.
//!
//! # Example
//!
//! ```rust,no_run
//! use ui_test_agent::{AgentOptions, AnthropicClient, Message, ModelClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = AgentOptions::builder()
//!     .model("claude-sonnet-4-5")
//!     .base_url("https://api.anthropic.com/v1")
//!     .api_key("sk-...")
//!     .build()?;
//!
//! let client = AnthropicClient::new(&options)?;
//! let reply = client
//!     .invoke(&[Message::user("Hello")], "You are terse.", &[])
//!     .await?;
//! println!("{:?}", reply.first_text());
//! # Ok(())
//! # }
//! ```

use crate::tools::ToolSchema;
use crate::types::{AgentOptions, ContentBlock, Message, TextBlock, ToolUseBlock};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol version header required by the Messages API
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Produces one assistant turn per call.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(
        &self,
        conversation: &[Message],
        system_prompt: &str,
        tools: &[ToolSchema],
    ) -> Result<Message>;
}

/// HTTP client for the Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(options: &AgentOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            model: options.model.clone(),
            base_url: options.base_url.clone(),
            api_key: options.api_key.clone(),
            max_tokens: options.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn invoke(
        &self,
        conversation: &[Message],
        system_prompt: &str,
        tools: &[ToolSchema],
    ) -> Result<Message> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: (!system_prompt.is_empty()).then_some(system_prompt),
            messages: conversation,
            tools: (!tools.is_empty()).then_some(tools),
        };

        log::debug!(
            "Requesting assistant turn ({} messages, {} tools)",
            conversation.len(),
            tools.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(Error::api(format!("{}: {}", status, body)));
        }

        let body: MessagesResponse = response.json().await?;
        if let Some(reason) = &body.stop_reason {
            log::debug!("Assistant turn finished: {}", reason);
        }
        Ok(body.into_message())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSchema]>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Response content; block types the loop does not understand are dropped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

impl MessagesResponse {
    fn into_message(self) -> Message {
        let content = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text(TextBlock::new(text))),
                ResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse(ToolUseBlock::new(id, name, input)))
                }
                ResponseBlock::Unsupported => None,
            })
            .collect();
        Message::assistant(content)
    }
}
