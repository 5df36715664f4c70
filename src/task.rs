//! Task definition files.
//!
//! A task file is line oriented:
//!
//! ```text
//! YouTube search - https://www.youtube.com
//! <ignored>
//! <ignored>
//! Search for "lofi music"
//! Assert that at least one video result is shown
//! ```
//!
//! Line 0 holds `<label> - <website_url>`. Every line from index 3 onward, joined and
//! trimmed, is the instruction text.

use crate::{Error, Result};
use std::path::Path;

/// Index of the first instruction line
const INSTRUCTIONS_START: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub label: String,
    pub website_url: String,
    pub instructions: String,
}

impl TaskDefinition {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_input(format!("Cannot read task file {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let lines: Vec<&str> = raw.lines().collect();
        let header = lines
            .first()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::invalid_input("Task file is empty"))?;

        let (label, url) = header
            .split_once(" - ")
            .or_else(|| header.split_once('-'))
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "Task header must look like '<label> - <url>', got '{}'",
                    header
                ))
            })?;

        let website_url = url.trim().to_string();
        if website_url.is_empty() {
            return Err(Error::invalid_input("Task header is missing the website URL"));
        }

        let instructions = lines
            .get(INSTRUCTIONS_START..)
            .map(|rest| rest.join("\n"))
            .unwrap_or_default()
            .trim()
            .to_string();
        if instructions.is_empty() {
            return Err(Error::invalid_input("Task file has no instructions"));
        }

        Ok(Self {
            label: label.trim().to_string(),
            website_url,
            instructions,
        })
    }
}
