//! Shared test doubles: a scripted model client, a recording browser driver and a
//! counting tool.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ui_test_agent::{
    AgentOptions, BrowserDriver, BrowserSession, ContentBlock, Error, Message, ModelClient,
    ReleaseStage, Result, TextBlock, Tool, ToolError, ToolResult, ToolSchema, ToolUseBlock,
    Viewport,
};

pub type Log = Arc<Mutex<Vec<String>>>;

/// PNG magic number, enough for media type sniffing
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub fn text(t: &str) -> ContentBlock {
    ContentBlock::Text(TextBlock::new(t))
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse(ToolUseBlock::new(id, name, input))
}

pub fn options(concurrent: bool) -> AgentOptions {
    AgentOptions::builder()
        .system_prompt("test system prompt")
        .model("test-model")
        .base_url("http://localhost:1234/v1")
        .concurrent_dispatch(concurrent)
        .build()
        .unwrap()
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ----------------------------------------------------------------------------
// Model client
// ----------------------------------------------------------------------------

pub enum Step {
    Reply(Vec<ContentBlock>),
    Fail(&'static str),
    Panic,
}

/// What the client was called with
#[derive(Debug, Clone)]
pub struct Call {
    pub conversation: Vec<Message>,
    pub system_prompt: String,
    pub tool_names: Vec<String>,
}

pub struct ScriptedClient {
    steps: Mutex<VecDeque<Step>>,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn invoke(
        &self,
        conversation: &[Message],
        system_prompt: &str,
        tools: &[ToolSchema],
    ) -> Result<Message> {
        self.calls.lock().unwrap().push(Call {
            conversation: conversation.to_vec(),
            system_prompt: system_prompt.to_string(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(content)) => Ok(Message::assistant(content)),
            Some(Step::Fail(message)) => Err(Error::api(message)),
            Some(Step::Panic) => panic!("model client blew up"),
            None => Err(Error::other("no scripted reply left")),
        }
    }
}

// ----------------------------------------------------------------------------
// Browser driver
// ----------------------------------------------------------------------------

/// Records every session operation into a shared log.
#[derive(Clone, Default)]
pub struct MockDriver {
    pub log: Log,
    pub fail_release: Option<ReleaseStage>,
    pub page_content: String,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            page_content: "<html><body>hello</body></html>".to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn open(&self, url: &str, viewport: Viewport) -> Result<Box<dyn BrowserSession>> {
        self.log.lock().unwrap().push(format!("open {} {}", url, viewport));
        Ok(Box::new(MockSession {
            log: self.log.clone(),
            fail_release: self.fail_release,
            page_content: self.page_content.clone(),
        }))
    }
}

struct MockSession {
    log: Log,
    fail_release: Option<ReleaseStage>,
    page_content: String,
}

impl MockSession {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.record("screenshot".into());
        Ok(PNG_BYTES.to_vec())
    }

    async fn click(&mut self, x: i64, y: i64) -> Result<()> {
        self.record(format!("click {},{}", x, y));
        Ok(())
    }

    async fn mouse_move(&mut self, x: i64, y: i64) -> Result<()> {
        self.record(format!("mouse_move {},{}", x, y));
        Ok(())
    }

    async fn scroll(&mut self, dx: i64, dy: i64) -> Result<()> {
        self.record(format!("scroll {},{}", dx, dy));
        Ok(())
    }

    async fn type_text(&mut self, text: &str) -> Result<()> {
        self.record(format!("type {}", text));
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<()> {
        self.record(format!("key {}", key));
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.page_content.clone())
    }

    async fn title(&mut self) -> Result<String> {
        Ok("Mock Page".to_string())
    }

    async fn release(&mut self, stage: ReleaseStage) -> Result<()> {
        self.record(format!("release {}", stage.as_str()));
        if self.fail_release == Some(stage) {
            return Err(Error::session(format!("{} refused to close", stage.as_str())));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Counting tool
// ----------------------------------------------------------------------------

/// Tool that counts lifecycle calls and records finished invocations.
///
/// Actions: `echo` (returns `text`, after `delay_ms` if given), `panic`, `fail`.
pub struct CountingTool {
    name: String,
    fail_start: bool,
    pub starts: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub finished: Log,
}

impl CountingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_start: false,
            starts: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            finished: Log::default(),
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn describe(&self) -> ToolSchema {
        ToolSchema::builder(&self.name, "Counts calls")
            .actions(&["echo", "panic", "fail"], "The action to perform")
            .param("text", "string", "Text to echo", false)
            .param("delay_ms", "integer", "Delay before answering", false)
            .build()
    }

    async fn invoke(
        &self,
        action: &str,
        params: &Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        match action {
            "echo" => {
                if let Some(ms) = params["delay_ms"].as_u64() {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                let text = params["text"].as_str().unwrap_or_default().to_string();
                self.finished.lock().unwrap().push(text.clone());
                Ok(ToolResult::output(text))
            }
            "panic" => panic!("tool exploded"),
            "fail" => Err(ToolError::Unexpected(Error::other("disk on fire"))),
            other => Err(ToolError::unknown_action(other)),
        }
    }

    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(Error::session("could not start"));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
