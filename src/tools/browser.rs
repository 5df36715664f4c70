//! Browser tool: one stateful browser session driven by the model.
//!
//! The low-level driver sits behind two capability traits. [`BrowserDriver`] opens a
//! session, and [`BrowserSession`] performs primitive operations on it. The tool owns the
//! session for the whole run and serialises access to it, so even when the dispatcher runs
//! tool calls concurrently only one browser action executes at a time.
//!
//! ```text
//! Unstarted --start()--> Started --(action)*--> Started --close()--> Closed
//! ```

use super::{Tool, ToolError, ToolSchema, str_param};
use crate::result::ToolResult;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Upper bound on the page markup returned by `get_content`, in characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Pause after full teardown so the driver can finish shutting down.
pub const TEARDOWN_GRACE: Duration = Duration::from_millis(500);

const ACTIONS: &[&str] = &[
    "screenshot",
    "click",
    "type",
    "key",
    "scroll",
    "mouse_move",
    "navigate",
    "get_content",
    "get_title",
];

/// Browser window size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resources released by [`BrowserSession::release`], in teardown order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    Page,
    Context,
    Browser,
    Driver,
}

impl ReleaseStage {
    pub const ORDER: [ReleaseStage; 4] = [
        ReleaseStage::Page,
        ReleaseStage::Context,
        ReleaseStage::Browser,
        ReleaseStage::Driver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStage::Page => "page",
            ReleaseStage::Context => "context",
            ReleaseStage::Browser => "browser",
            ReleaseStage::Driver => "driver",
        }
    }
}

/// Opens browser sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open(&self, url: &str, viewport: Viewport) -> Result<Box<dyn BrowserSession>>;
}

/// Primitive operations on one open browser session.
#[async_trait]
pub trait BrowserSession: Send {
    /// Capture the visible viewport as PNG bytes
    async fn screenshot(&mut self) -> Result<Vec<u8>>;
    async fn click(&mut self, x: i64, y: i64) -> Result<()>;
    async fn mouse_move(&mut self, x: i64, y: i64) -> Result<()>;
    /// Scroll relative to the current position
    async fn scroll(&mut self, dx: i64, dy: i64) -> Result<()>;
    /// Type at the current focus
    async fn type_text(&mut self, text: &str) -> Result<()>;
    /// Press a key given its platform name (see [`map_key`])
    async fn press_key(&mut self, key: &str) -> Result<()>;
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// Full page markup
    async fn content(&mut self) -> Result<String>;
    async fn title(&mut self) -> Result<String>;
    async fn release(&mut self, stage: ReleaseStage) -> Result<()>;
}

/// Map a model-facing key name to its platform name. Unknown names pass through unchanged.
pub fn map_key(name: &str) -> String {
    let mapped = match name.to_ascii_lowercase().as_str() {
        "enter" | "return" => "Enter",
        "tab" => "Tab",
        "space" => "Space",
        "backspace" => "Backspace",
        "escape" | "esc" => "Escape",
        "page_up" | "pageup" | "page-up" => "PageUp",
        "page_down" | "pagedown" | "page-down" => "PageDown",
        _ => return name.to_string(),
    };
    mapped.to_string()
}

/// Settings for one browser tool instance
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Page opened by `start()`
    pub start_url: String,
    pub viewport: Viewport,
    /// Directory receiving `screenshot_<n>.png`
    pub screenshot_dir: PathBuf,
    /// Settle time before each capture
    pub screenshot_delay: Duration,
}

impl BrowserSettings {
    pub fn new(start_url: impl Into<String>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_url: start_url.into(),
            viewport: Viewport::default(),
            screenshot_dir: screenshot_dir.into(),
            screenshot_delay: Duration::from_secs(2),
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_screenshot_delay(mut self, delay: Duration) -> Self {
        self.screenshot_delay = delay;
        self
    }
}

enum SessionState {
    Unstarted,
    Started(Box<dyn BrowserSession>),
    Closed,
}

struct BrowserState {
    session: SessionState,
    screenshot_counter: u32,
}

/// Tool named `browser` exposing navigation and input actions to the model.
pub struct BrowserTool {
    driver: Arc<dyn BrowserDriver>,
    settings: BrowserSettings,
    state: Mutex<BrowserState>,
}

impl BrowserTool {
    pub const NAME: &'static str = "browser";

    pub fn new(driver: Arc<dyn BrowserDriver>, settings: BrowserSettings) -> Self {
        Self {
            driver,
            settings,
            state: Mutex::new(BrowserState {
                session: SessionState::Unstarted,
                screenshot_counter: 1,
            }),
        }
    }

    async fn take_screenshot(
        &self,
        session: &mut Box<dyn BrowserSession>,
        counter: &mut u32,
    ) -> Result<ToolResult> {
        tokio::time::sleep(self.settings.screenshot_delay).await;
        let image = session.screenshot().await?;

        tokio::fs::create_dir_all(&self.settings.screenshot_dir).await?;
        let path = self
            .settings
            .screenshot_dir
            .join(format!("screenshot_{}.png", *counter));
        tokio::fs::write(&path, &image).await?;
        *counter += 1;

        let viewport = self.settings.viewport;
        log::debug!("Saved screenshot {}", path.display());
        Ok(ToolResult::output(format!(
            "Screenshot taken ({} viewport, width={} height={}), saved to {}",
            viewport,
            viewport.width,
            viewport.height,
            path.display()
        ))
        .with_image(image))
    }
}

/// Read an `x`/`y` style coordinate. Accepts integers and finite numbers.
fn coordinate(params: &Value, name: &str) -> Option<i64> {
    let value = params.get(name)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

fn coordinates(params: &Value, action: &str) -> std::result::Result<(i64, i64), ToolResult> {
    match (coordinate(params, "x"), coordinate(params, "y")) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(ToolResult::failure(format!(
            "Numeric 'x' and 'y' are required for {} action",
            action
        ))),
    }
}

fn required_text<'a>(
    params: &'a Value,
    name: &str,
    action: &str,
) -> std::result::Result<&'a str, ToolResult> {
    str_param(params, name).ok_or_else(|| {
        ToolResult::failure(format!("'{}' is required for {} action", name, action))
    })
}

fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}

#[async_trait]
impl Tool for BrowserTool {
    fn describe(&self) -> ToolSchema {
        ToolSchema::builder(
            Self::NAME,
            "Control the browser under test: take screenshots, click, type, press keys, \
             scroll, move the mouse, navigate, and read the page title or markup.",
        )
        .actions(ACTIONS, "The browser action to perform")
        .param(
            "text",
            "string",
            "Text to type (type) or key name to press (key)",
            false,
        )
        .param("x", "integer", "Horizontal pixel coordinate or scroll delta", false)
        .param("y", "integer", "Vertical pixel coordinate or scroll delta", false)
        .param("url", "string", "Destination URL for navigate", false)
        .build()
    }

    async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.session {
            SessionState::Unstarted => {}
            SessionState::Started(_) => return Err(Error::session("browser already started")),
            SessionState::Closed => return Err(Error::session("browser already closed")),
        }

        log::info!(
            "Opening browser at {} ({})",
            self.settings.start_url,
            self.settings.viewport
        );
        let session = self
            .driver
            .open(&self.settings.start_url, self.settings.viewport)
            .await?;
        state.session = SessionState::Started(session);
        Ok(())
    }

    async fn invoke(
        &self,
        action: &str,
        params: &Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        if !ACTIONS.contains(&action) {
            return Err(ToolError::unknown_action(action));
        }

        let mut guard = self.state.lock().await;
        let BrowserState {
            session,
            screenshot_counter,
        } = &mut *guard;
        let SessionState::Started(session) = session else {
            let err = Error::session("browser action invoked outside of a started session");
            return Err(err.into());
        };

        let result = match action {
            "screenshot" => self.take_screenshot(session, screenshot_counter).await?,
            "click" => match coordinates(params, action) {
                Ok((x, y)) => {
                    session.click(x, y).await?;
                    ToolResult::output(format!("Clicked at ({}, {})", x, y))
                }
                Err(failure) => failure,
            },
            "mouse_move" => match coordinates(params, action) {
                Ok((x, y)) => {
                    session.mouse_move(x, y).await?;
                    ToolResult::output(format!("Moved mouse to ({}, {})", x, y))
                }
                Err(failure) => failure,
            },
            "scroll" => match coordinates(params, action) {
                Ok((x, y)) => {
                    session.scroll(x, y).await?;
                    ToolResult::output(format!("Scrolled by ({}, {})", x, y))
                }
                Err(failure) => failure,
            },
            "type" => match required_text(params, "text", action) {
                Ok(text) => {
                    session.type_text(text).await?;
                    ToolResult::output(format!("Typed {} characters", text.chars().count()))
                }
                Err(failure) => failure,
            },
            "key" => match required_text(params, "text", action) {
                Ok(name) => {
                    let key = map_key(name);
                    session.press_key(&key).await?;
                    ToolResult::output(format!("Pressed key {}", key))
                }
                Err(failure) => failure,
            },
            "navigate" => match required_text(params, "url", action) {
                Ok(url) => {
                    session.navigate(url).await?;
                    ToolResult::output(format!("Navigated to {}", url))
                }
                Err(failure) => failure,
            },
            "get_content" => {
                let content = session.content().await?;
                let (prefix, truncated) = truncate_chars(&content, MAX_CONTENT_CHARS);
                let mut output = prefix.to_string();
                if truncated {
                    output.push_str(&format!(
                        "\n[content truncated to {} characters]",
                        MAX_CONTENT_CHARS
                    ));
                }
                ToolResult::output(output)
            }
            "get_title" => ToolResult::output(session.title().await?),
            other => return Err(ToolError::unknown_action(other)),
        };

        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut state.session, SessionState::Closed);
        let SessionState::Started(mut session) = previous else {
            return Ok(());
        };

        let mut failures = Vec::new();
        for stage in ReleaseStage::ORDER {
            if let Err(err) = session.release(stage).await {
                log::warn!("Failed to release browser {}: {}", stage.as_str(), err);
                failures.push(format!("{}: {}", stage.as_str(), err));
            }
        }
        drop(session);
        tokio::time::sleep(TEARDOWN_GRACE).await;

        if failures.is_empty() {
            log::info!("Browser closed");
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }
}
