//! Tool execution results and their conversion into protocol blocks.
//!
//! A [`ToolResult`] is what a tool hands back to the dispatcher. It is deliberately
//! loose: any combination of text output, an error message, an image and a system note
//! may be present. Two results can be combined with `+`, which is how multi-step tools
//! accumulate what they did.
//!
//! ## Merge law
//!
//! ```text
//! output, error, system : both non-empty -> concatenated (left then right)
//!                         otherwise      -> whichever side is non-empty
//! image                 : first non-empty operand wins, never concatenated
//! ```
//!
//! The law is associative but not commutative.
//!
//! ## Protocol encoding
//!
//! [`ToolResult::into_block`] turns a result into the [`ToolResultBlock`] that goes back
//! to the model. An error result becomes a single text part flagged `is_error`; a
//! successful result becomes an optional text part followed by an optional image part.

use crate::types::{ImageSource, ToolResultBlock, ToolResultContent};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::ops::Add;

/// Outcome of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    /// Text handed back to the model on success
    pub output: Option<String>,

    /// Failure description; when present the block is flagged as an error
    pub error: Option<String>,

    /// Raw image bytes (PNG or JPEG)
    pub image: Option<Vec<u8>>,

    /// Out-of-band note prefixed to the text part
    pub system: Option<String>,
}

impl ToolResult {
    /// Successful result carrying text output
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
            ..Self::default()
        }
    }

    /// Failed result carrying an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Attach an image to this result
    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    /// Attach a system note to this result
    pub fn with_system(mut self, note: impl Into<String>) -> Self {
        self.system = Some(note.into());
        self
    }

    /// True when any field carries content
    pub fn is_truthy(&self) -> bool {
        non_empty(&self.output).is_some()
            || non_empty(&self.error).is_some()
            || self.image.as_ref().is_some_and(|img| !img.is_empty())
            || non_empty(&self.system).is_some()
    }

    /// True when the result carries an error message
    pub fn is_error(&self) -> bool {
        non_empty(&self.error).is_some()
    }

    /// Combine two results, see the module docs for the law
    pub fn merge(self, other: ToolResult) -> ToolResult {
        self + other
    }

    /// Encode this result as the tool result block answering `tool_use_id`.
    pub fn into_block(self, tool_use_id: impl Into<String>) -> ToolResultBlock {
        let prefix = non_empty(&self.system)
            .map(|note| format!("<system>{}</system>\n", note))
            .unwrap_or_default();

        if let Some(error) = non_empty(&self.error) {
            return ToolResultBlock::new(
                tool_use_id,
                vec![ToolResultContent::Text {
                    text: format!("{prefix}{error}"),
                }],
                true,
            );
        }

        let mut content = Vec::new();
        if let Some(output) = non_empty(&self.output) {
            content.push(ToolResultContent::Text {
                text: format!("{prefix}{output}"),
            });
        }
        if let Some(image) = self.image.as_ref().filter(|img| !img.is_empty()) {
            content.push(ToolResultContent::Image {
                source: ImageSource::base64(media_type(image), STANDARD.encode(image)),
            });
        }

        ToolResultBlock::new(tool_use_id, content, false)
    }
}

impl Add for ToolResult {
    type Output = ToolResult;

    fn add(self, other: ToolResult) -> ToolResult {
        ToolResult {
            output: combine(self.output, other.output),
            error: combine(self.error, other.error),
            image: first_image(self.image, other.image),
            system: combine(self.system, other.system),
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn combine(left: Option<String>, right: Option<String>) -> Option<String> {
    let left = left.filter(|s| !s.is_empty());
    let right = right.filter(|s| !s.is_empty());
    match (left, right) {
        (Some(mut l), Some(r)) => {
            l.push_str(&r);
            Some(l)
        }
        (l, r) => l.or(r),
    }
}

fn first_image(left: Option<Vec<u8>>, right: Option<Vec<u8>>) -> Option<Vec<u8>> {
    left.filter(|img| !img.is_empty())
        .or_else(|| right.filter(|img| !img.is_empty()))
}

fn media_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}
