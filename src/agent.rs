//! # Agent Loop
//!
//! The controller that alternates between the model and the tools until the model stops
//! asking for tools.
//!
//! ## Turn protocol
//!
//! ```text
//! user(task) ─▶ model ─▶ assistant turn
//!                           │
//!              tool-use blocks present?
//!               │ yes                      │ no
//!               ▼                          ▼
//!   dispatch every call in order     verdict = first text block
//!   user turn = tool-result blocks   TERMINATED
//!               │
//!               └──────────▶ model ...
//! ```
//!
//! ## Failure rules
//!
//! - A failed model call ends the run immediately. The conversation so far is returned
//!   with [`Termination::TransportFailure`]; there is no retry.
//! - Tool failures never end the run. They come back to the model as `is_error` tool
//!   results so it can adapt.
//!
//! ## Resources
//!
//! Tools are started before the first model call and closed exactly once when the run
//! ends, whether it ends with a verdict, a transport failure, a start failure or a panic.

use crate::client::ModelClient;
use crate::tools::ToolRegistry;
use crate::types::{AgentOptions, Message, ToolResultBlock, ToolUseBlock};
use crate::{Error, Result};
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The model answered without tool use; carries its first text block
    Verdict(String),
    /// The model call failed; carries the error message
    TransportFailure(String),
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Full conversation, starting with the task turn
    pub conversation: Vec<Message>,
    pub termination: Termination,
    /// Number of model calls that returned an assistant turn
    pub turns: usize,
}

impl LoopOutcome {
    /// The verdict string, if the run terminated normally
    pub fn verdict(&self) -> Option<&str> {
        match &self.termination {
            Termination::Verdict(text) => Some(text),
            Termination::TransportFailure(_) => None,
        }
    }
}

/// Pass/fail reading of a verdict string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
}

impl Verdict {
    /// The last token of the last non-blank line decides: `success` passes, anything else fails.
    pub fn from_text(text: &str) -> Self {
        let token = text
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| line.split_whitespace().last())
            .map(|token| {
                token
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase()
            });

        match token.as_deref() {
            Some("success") => Verdict::Passed,
            _ => Verdict::Failed,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Drives the model/tool exchange for one run.
pub struct AgentLoop {
    client: Box<dyn ModelClient>,
    registry: ToolRegistry,
    system_prompt: String,
    concurrent_dispatch: bool,
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("registry", &self.registry)
            .field("system_prompt", &self.system_prompt)
            .field("concurrent_dispatch", &self.concurrent_dispatch)
            .finish()
    }
}

impl AgentLoop {
    pub fn new(
        client: Box<dyn ModelClient>,
        registry: ToolRegistry,
        options: &AgentOptions,
    ) -> Self {
        Self {
            client,
            registry,
            system_prompt: options.system_prompt.clone(),
            concurrent_dispatch: options.concurrent_dispatch,
        }
    }

    /// Run the loop for `task`.
    ///
    /// Returns `Err` only when a tool fails to start; transport failures are reported
    /// through [`Termination::TransportFailure`] together with the partial conversation.
    pub async fn run(&self, task: &str) -> Result<LoopOutcome> {
        let mut conversation = vec![Message::user(task)];

        let body = AssertUnwindSafe(async {
            self.registry.start_all().await?;
            Ok::<_, Error>(self.drive(&mut conversation).await)
        })
        .catch_unwind()
        .await;

        let failures = self.registry.close_all().await;
        if !failures.is_empty() {
            log::warn!("{} tool(s) failed to close cleanly", failures.len());
        }

        match body {
            Ok(Ok((termination, turns))) => Ok(LoopOutcome {
                conversation,
                termination,
                turns,
            }),
            Ok(Err(err)) => Err(err),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn drive(&self, conversation: &mut Vec<Message>) -> (Termination, usize) {
        let mut turns = 0;

        loop {
            let reply = match self
                .client
                .invoke(
                    conversation.as_slice(),
                    &self.system_prompt,
                    self.registry.describe_all(),
                )
                .await
            {
                Ok(reply) => reply,
                Err(err) => {
                    if err.is_transport() {
                        log::warn!("Model call failed, stopping: {}", err);
                    } else {
                        log::error!("Model client error, stopping: {}", err);
                    }
                    return (Termination::TransportFailure(err.to_string()), turns);
                }
            };
            turns += 1;

            let calls: Vec<ToolUseBlock> = reply.tool_uses().cloned().collect();
            if calls.is_empty() {
                let verdict = reply.first_text().unwrap_or_default().to_string();
                log::info!("Turn {}: no tool use, terminating", turns);
                conversation.push(reply);
                return (Termination::Verdict(verdict), turns);
            }

            log::info!("Turn {}: {} tool call(s)", turns, calls.len());
            conversation.push(reply);

            let results = self.dispatch_all(&calls).await;
            conversation.push(Message::tool_results(results));
        }
    }

    /// Dispatch every call; results come back in request order.
    async fn dispatch_all(&self, calls: &[ToolUseBlock]) -> Vec<ToolResultBlock> {
        if self.concurrent_dispatch {
            join_all(calls.iter().map(|call| self.dispatch_one(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.dispatch_one(call).await);
            }
            results
        }
    }

    async fn dispatch_one(&self, call: &ToolUseBlock) -> ToolResultBlock {
        let result = self.registry.dispatch(&call.name, &call.input).await;
        if let Some(error) = &result.error {
            log::debug!("{} ({}) returned error: {}", call.name, call.id, error);
        }
        result.into_block(call.id.clone())
    }
}
