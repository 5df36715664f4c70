//! # UI Test Agent
//!
//! An autonomous end-to-end UI testing agent. A language model drives a real browser through
//! tool calls until it can answer whether a plain-language test case passed.
//!
//! ## Overview
//!
//! A run takes a task (a website plus step-by-step instructions ending in an assertion),
//! sends it to the model together with the schemas of the available tools, and then
//! alternates:
//!
//! 1. The model replies with text and/or tool-use requests.
//! 2. Every tool-use request is dispatched to its tool, in order.
//! 3. The results (text, errors, screenshots) go back to the model as the next user turn.
//!
//! The run ends when the model replies without requesting any tool. That reply's first text
//! block is the verdict; the binary reads it as pass when its last word is `Success`.
//!
//! ## Key Features
//!
//! - **Failure containment**: tool errors and panics become error results the model can
//!   react to, they never abort the run
//! - **Browser tool**: screenshots, clicks, typing, key presses, scrolling, navigation and
//!   page inspection over one stateful session
//! - **Script writer tool**: lets the model save generated scripts and test plans
//! - **Pluggable backends**: the model service ([`ModelClient`]) and the browser
//!   ([`BrowserDriver`]) are traits, so runs can be scripted in tests
//! - **Deterministic teardown**: tools are closed exactly once however the run ends
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ui_test_agent::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RunConfig::from_env()?;
//!     let task = TaskDefinition::from_file("test.txt")?;
//!     let options = config.agent_options(system_prompt(
//!         RunMode::Execute,
//!         chrono::Local::now().date_naive(),
//!     ))?;
//!
//!     let browser = BrowserTool::new(
//!         Arc::new(ChromeLauncher::new().headless(config.headless)),
//!         BrowserSettings::new(&task.website_url, &config.screenshot_dir),
//!     );
//!     let tools: Vec<Arc<dyn Tool>> = vec![
//!         Arc::new(browser),
//!         Arc::new(ScriptWriterTool::new(&config.script_dir)?),
//!     ];
//!     let registry = ToolRegistry::register(tools)?;
//!
//!     let agent = AgentLoop::new(Box::new(AnthropicClient::new(&options)?), registry, &options);
//!     let outcome = agent.run(&initial_prompt(&task, RunMode::Execute)).await?;
//!
//!     let verdict = Verdict::from_text(outcome.verdict().unwrap_or_default());
//!     println!("passed: {}", verdict.is_pass());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **agent**: the controller loop, termination and verdict evaluation
//! - **client**: the model service boundary and its Messages API implementation
//! - **tools**: the tool trait, the registry/dispatcher and the two tools
//! - **result**: the tool result value and how results merge and serialise
//! - **chrome**: the Chrome browser backend over the DevTools protocol
//! - **task**, **prompt**, **config**: inputs to a run

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// The agent loop: alternates model turns and tool dispatch until a verdict or a
/// transport failure, and owns tool start/close for the run.
mod agent;

/// Chrome implementation of the browser capability traits, built on `chromiumoxide`.
mod chrome;

/// Model service boundary (`ModelClient`) and the HTTP Messages API client.
mod client;

/// Run configuration read from environment variables.
mod config;

/// Error types and the crate-wide `Result<T>` alias.
mod error;

/// System prompts and the opening user turn for execute and plan runs.
mod prompt;

/// `ToolResult`: what a tool invocation produced, with merge and wire conversion.
mod result;

/// Task definition file parsing.
mod task;

/// Tool trait, schemas, the registry/dispatcher, and the browser and script writer tools.
mod tools;

/// Conversation types: messages, content blocks and agent options.
mod types;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

// --- Agent Loop ---

pub use agent::{AgentLoop, LoopOutcome, Termination, Verdict};

// --- Model Client ---

pub use client::{ANTHROPIC_VERSION, AnthropicClient, ModelClient};

// --- Configuration ---

pub use config::{DEFAULT_BASE_URL, DEFAULT_MODEL, RunConfig, parse_viewport};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Prompts and Tasks ---

pub use prompt::{RunMode, initial_prompt, system_prompt};
pub use task::TaskDefinition;

// --- Tool System ---

pub use result::ToolResult;
pub use tools::{
    BrowserDriver, BrowserSession, BrowserSettings, BrowserTool, MAX_CONTENT_CHARS,
    ReleaseStage, ScriptWriterTool, TEARDOWN_GRACE, Tool, ToolError, ToolRegistry, ToolSchema,
    ToolSchemaBuilder, Viewport, map_key,
};

// --- Core Types ---

pub use types::{
    AgentOptions, AgentOptionsBuilder, ContentBlock, ImageSource, Message, MessageRole,
    TextBlock, ToolResultBlock, ToolResultContent, ToolUseBlock,
};

// --- Browser Backend ---

pub use chrome::{ChromeLauncher, ChromeSession, KeyDefinition, key_definition};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module containing the most commonly used types and functions.
/// Import with `use ui_test_agent::prelude::*;` to set up and run an agent.
pub mod prelude {
    pub use crate::{
        AgentLoop, AgentOptions, AnthropicClient, BrowserSettings, BrowserTool, ChromeLauncher,
        Error, LoopOutcome, Message, ModelClient, Result, RunConfig, RunMode, ScriptWriterTool,
        TaskDefinition, Termination, Tool, ToolRegistry, ToolResult, Verdict, initial_prompt,
        system_prompt,
    };
}
