//! Script writer tool: lets the model write generated test scripts and plans to disk.

use super::{Tool, ToolError, ToolSchema, str_param};
use crate::result::ToolResult;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Tool named `script_writer`. Stateless apart from its output root.
#[derive(Debug, Clone)]
pub struct ScriptWriterTool {
    output_root: PathBuf,
}

impl ScriptWriterTool {
    pub const NAME: &'static str = "script_writer";

    /// Create the tool, creating `output_root` if it does not exist yet.
    pub fn new(output_root: impl Into<PathBuf>) -> crate::Result<Self> {
        let output_root = output_root.into();
        std::fs::create_dir_all(&output_root)?;
        let output_root = std::path::absolute(&output_root)?;
        Ok(Self { output_root })
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Relative paths land under the output root; absolute paths are used as given.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_root.join(path)
        }
    }

    async fn write(&self, path: &str, content: &str) -> std::io::Result<PathBuf> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        Ok(target)
    }
}

#[async_trait]
impl Tool for ScriptWriterTool {
    fn describe(&self) -> ToolSchema {
        ToolSchema::builder(Self::NAME, "Write content to a file at the specified path")
            .actions(&["write"], "The action to perform (only 'write' is supported)")
            .param(
                "path",
                "string",
                "File path to write; relative paths are placed under the script output directory",
                true,
            )
            .param("content", "string", "The complete file content", true)
            .build()
    }

    async fn invoke(&self, action: &str, params: &Value) -> Result<ToolResult, ToolError> {
        if action != "write" {
            return Err(ToolError::unknown_action(action));
        }

        let (Some(path), Some(content)) = (str_param(params, "path"), str_param(params, "content"))
        else {
            return Ok(ToolResult::failure(
                "Both 'path' and 'content' are required for write action",
            ));
        };

        match self.write(path, content).await {
            Ok(target) => {
                log::info!("Wrote {}", target.display());
                Ok(ToolResult::output(format!(
                    "Successfully wrote {} characters to {}",
                    content.chars().count(),
                    target.display()
                )))
            }
            Err(err) => {
                log::warn!("Writing {} failed: {}", path, err);
                Ok(ToolResult::failure(format!("Failed to write file: {}", err)))
            }
        }
    }
}
