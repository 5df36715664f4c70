//! Chrome backend for the browser tool, driven over the DevTools protocol with
//! `chromiumoxide`.
//!
//! [`ChromeLauncher::open`] launches a browser, spawns the task that pumps its protocol
//! handler, creates an isolated browser context and opens one page in it. Release stages map
//! onto those pieces:
//!
//! | Stage | Action |
//! |---|---|
//! | `Page` | close the page target |
//! | `Context` | dispose the browser context |
//! | `Browser` | close the browser and wait for the process to exit |
//! | `Driver` | stop the protocol handler task |

use crate::tools::{BrowserDriver, BrowserSession, ReleaseStage, Viewport};
use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::Point;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Flags passed to every launched browser
const BASE_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-sync",
    "--no-first-run",
    "--no-default-browser-check",
];

fn cdp(err: CdpError) -> Error {
    Error::session(err.to_string())
}

/// Launches a local Chrome/Chromium per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    headless: bool,
}

impl ChromeLauncher {
    /// Launch the auto-detected browser with a visible window
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    fn browser_config(&self, viewport: Viewport) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .viewport(None)
            .args(launch_args(self.headless));
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| Error::config(format!("Browser config error: {}", e)))
    }
}

fn launch_args(headless: bool) -> Vec<String> {
    let mut args: Vec<String> = BASE_ARGS.iter().map(|a| a.to_string()).collect();
    if headless {
        args.push("--hide-scrollbars".to_string());
        args.push("--mute-audio".to_string());
    }
    args
}

#[async_trait]
impl BrowserDriver for ChromeLauncher {
    async fn open(&self, url: &str, viewport: Viewport) -> Result<Box<dyn BrowserSession>> {
        let config = self.browser_config(viewport)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    log::debug!("DevTools handler: {}", err);
                }
            }
        });

        // Holds whatever was acquired so far; dropping it on error releases it.
        let mut session = ChromeSession {
            browser: Some(browser),
            context: None,
            page: None,
            handler: Some(handler),
        };

        let browser = session.browser()?;
        let context = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(cdp)?
            .result
            .browser_context_id;

        let mut target = CreateTargetParams::new(url);
        target.browser_context_id = Some(context.clone());
        let page = browser.new_page(target).await.map_err(cdp)?;

        log::debug!("Chrome page opened at {}", url);
        session.context = Some(context);
        session.page = Some(page);
        Ok(Box::new(session))
    }
}

/// One launched browser with a single page in its own context.
pub struct ChromeSession {
    browser: Option<Browser>,
    context: Option<BrowserContextId>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl ChromeSession {
    fn browser(&self) -> Result<&Browser> {
        self.browser
            .as_ref()
            .ok_or_else(|| Error::session("browser already closed"))
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| Error::session("page already closed"))
    }

    async fn dispatch_key(&self, key: &KeyDefinition) -> Result<()> {
        let page = self.page()?;
        let down = if key.text.is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };
        for event_type in [down, DispatchKeyEventType::KeyUp] {
            let mut params = DispatchKeyEventParams::builder()
                .r#type(event_type.clone())
                .key(key.key.clone())
                .code(key.code)
                .windows_virtual_key_code(key.key_code)
                .native_virtual_key_code(key.key_code);
            if let (Some(text), DispatchKeyEventType::KeyDown) = (&key.text, &event_type) {
                params = params.text(text.clone());
            }
            let params = params.build().map_err(Error::session)?;
            page.execute(params).await.map_err(cdp)?;
        }
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// Key event fields for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub key: String,
    pub code: &'static str,
    pub key_code: i64,
    /// Character inserted by the key, if any
    pub text: Option<String>,
}

/// Event fields for a platform key name. Single characters stand for themselves.
pub fn key_definition(name: &str) -> Option<KeyDefinition> {
    let (key, code, key_code, text) = match name {
        "Enter" => ("Enter", "Enter", 13, Some("\r")),
        "Tab" => ("Tab", "Tab", 9, None),
        "Space" => (" ", "Space", 32, Some(" ")),
        "Backspace" => ("Backspace", "Backspace", 8, None),
        "Escape" => ("Escape", "Escape", 27, None),
        "PageUp" => ("PageUp", "PageUp", 33, None),
        "PageDown" => ("PageDown", "PageDown", 34, None),
        "End" => ("End", "End", 35, None),
        "Home" => ("Home", "Home", 36, None),
        "ArrowLeft" => ("ArrowLeft", "ArrowLeft", 37, None),
        "ArrowUp" => ("ArrowUp", "ArrowUp", 38, None),
        "ArrowRight" => ("ArrowRight", "ArrowRight", 39, None),
        "ArrowDown" => ("ArrowDown", "ArrowDown", 40, None),
        "Delete" => ("Delete", "Delete", 46, None),
        _ => {
            let mut chars = name.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return None;
            };
            let key_code = if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase() as i64
            } else {
                0
            };
            return Some(KeyDefinition {
                key: c.to_string(),
                code: "",
                key_code,
                text: Some(c.to_string()),
            });
        }
    };
    Some(KeyDefinition {
        key: key.to_string(),
        code,
        key_code,
        text: text.map(str::to_string),
    })
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page()?.screenshot(params).await.map_err(cdp)
    }

    async fn click(&mut self, x: i64, y: i64) -> Result<()> {
        self.page()?
            .click(Point::new(x as f64, y as f64))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn mouse_move(&mut self, x: i64, y: i64) -> Result<()> {
        self.page()?
            .move_mouse(Point::new(x as f64, y as f64))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn scroll(&mut self, dx: i64, dy: i64) -> Result<()> {
        self.page()?
            .evaluate(format!("window.scrollBy({}, {})", dx, dy))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn type_text(&mut self, text: &str) -> Result<()> {
        self.page()?
            .execute(InsertTextParams::new(text))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<()> {
        let definition = key_definition(key)
            .ok_or_else(|| Error::invalid_input(format!("Unsupported key: {}", key)))?;
        self.dispatch_key(&definition).await
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page()?.goto(url).await.map_err(cdp)?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.page()?.content().await.map_err(cdp)
    }

    async fn title(&mut self) -> Result<String> {
        let title = self.page()?.get_title().await.map_err(cdp)?;
        Ok(title.unwrap_or_default())
    }

    async fn release(&mut self, stage: ReleaseStage) -> Result<()> {
        match stage {
            ReleaseStage::Page => match self.page.take() {
                Some(page) => page.close().await.map_err(cdp),
                None => Ok(()),
            },
            ReleaseStage::Context => {
                let Some(context) = self.context.take() else {
                    return Ok(());
                };
                self.browser()?
                    .execute(DisposeBrowserContextParams::new(context))
                    .await
                    .map_err(cdp)?;
                Ok(())
            }
            ReleaseStage::Browser => {
                let Some(mut browser) = self.browser.take() else {
                    return Ok(());
                };
                browser.close().await.map_err(cdp)?;
                browser.wait().await?;
                log::debug!("Chrome exited");
                Ok(())
            }
            ReleaseStage::Driver => {
                if let Some(handler) = self.handler.take() {
                    handler.abort();
                }
                Ok(())
            }
        }
    }
}
