//! Run configuration resolved from the environment

use crate::tools::Viewport;
use crate::types::AgentOptions;
use crate::{Error, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default Messages API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Default model when `UI_AGENT_MODEL` is unset
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Everything a run needs besides the task itself
#[derive(Clone)]
pub struct RunConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub screenshot_dir: PathBuf,
    pub script_dir: PathBuf,
    pub viewport: Viewport,
    pub screenshot_delay: Duration,
    /// Chrome/Chromium binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("max_tokens", &self.max_tokens)
            .field("screenshot_dir", &self.screenshot_dir)
            .field("script_dir", &self.script_dir)
            .field("viewport", &self.viewport)
            .field("screenshot_delay", &self.screenshot_delay)
            .field("chrome_path", &self.chrome_path)
            .field("headless", &self.headless)
            .finish()
    }
}

impl RunConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `UI_AGENT_MODEL` | [`DEFAULT_MODEL`] |
    /// | `UI_AGENT_BASE_URL` | [`DEFAULT_BASE_URL`] |
    /// | `ANTHROPIC_API_KEY` | required |
    /// | `UI_AGENT_MAX_TOKENS` | 4096 |
    /// | `UI_AGENT_SCREENSHOT_DIR` | `screenshots` |
    /// | `UI_AGENT_SCRIPT_DIR` | `scripts` |
    /// | `UI_AGENT_VIEWPORT` | `1280x800` |
    /// | `UI_AGENT_SCREENSHOT_DELAY_MS` | 2000 |
    /// | `UI_AGENT_CHROME_PATH` | auto-detected |
    /// | `UI_AGENT_HEADLESS` | false |
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("ANTHROPIC_API_KEY")
            .ok_or_else(|| Error::config("ANTHROPIC_API_KEY is not set"))?;

        let viewport = match get("UI_AGENT_VIEWPORT") {
            Some(raw) => parse_viewport(&raw)?,
            None => Viewport::default(),
        };

        Ok(Self {
            model: get("UI_AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("UI_AGENT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            max_tokens: parse_or("UI_AGENT_MAX_TOKENS", get("UI_AGENT_MAX_TOKENS"), 4096)?,
            screenshot_dir: get("UI_AGENT_SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("screenshots")),
            script_dir: get("UI_AGENT_SCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("scripts")),
            viewport,
            screenshot_delay: Duration::from_millis(parse_or(
                "UI_AGENT_SCREENSHOT_DELAY_MS",
                get("UI_AGENT_SCREENSHOT_DELAY_MS"),
                2000,
            )?),
            chrome_path: get("UI_AGENT_CHROME_PATH").map(PathBuf::from),
            headless: parse_bool("UI_AGENT_HEADLESS", get("UI_AGENT_HEADLESS"))?,
        })
    }

    /// Model-side options for this configuration
    pub fn agent_options(&self, system_prompt: impl Into<String>) -> Result<AgentOptions> {
        AgentOptions::builder()
            .system_prompt(system_prompt)
            .model(&self.model)
            .base_url(&self.base_url)
            .api_key(&self.api_key)
            .max_tokens(self.max_tokens)
            .build()
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<bool> {
    match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(Error::config(format!("{} must be a boolean, got '{}'", key, v))),
    }
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_viewport(raw: &str) -> Result<Viewport> {
    let invalid = || Error::config(format!("Viewport must look like 1280x800, got '{}'", raw));
    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(Viewport { width, height })
}
