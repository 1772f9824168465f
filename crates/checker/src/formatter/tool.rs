//! External-tool formatting strategy.
//!
//! Stages the batch into an ephemeral directory tree, runs a fixed binary
//! with fixed flags plus the relative file names, and reads the (possibly
//! rewritten) files back. The strategy knows nothing about any language; the
//! correctness oracle is byte equality between input and output, applied by
//! the executor.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::errors::CheckError;
use crate::types::{FormattedFile, SourceFile};

use super::{FormatOutput, Formatter};

/// Invokes one external binary that reformats files in place.
pub struct ToolFormatter {
    tool: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ToolFormatter {
    /// Creates a strategy running `program` with the given fixed arguments.
    ///
    /// `tool` is the display name used in diagnostics and verdict messages.
    pub fn new(
        tool: &str,
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            tool: tool.to_string(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> CheckError {
        CheckError::ToolIo {
            tool: self.tool.clone(),
            source,
        }
    }
}

#[async_trait]
impl Formatter for ToolFormatter {
    async fn format(&self, files: &[SourceFile]) -> Result<FormatOutput, CheckError> {
        // TempDir removes the staging tree on drop, covering every exit path
        // below, including the early error returns.
        let staging = tempfile::Builder::new()
            .prefix("fmt-checker")
            .tempdir()
            .map_err(|e| self.io_error(e))?;

        let mut relative_names = Vec::with_capacity(files.len());
        for file in files {
            // Revision paths are repository-relative; a leading slash would
            // make PathBuf::join escape the staging directory.
            let relative = file.name.trim_start_matches('/').to_string();
            let path = staging.path().join(&relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
            tokio::fs::write(&path, &file.content)
                .await
                .map_err(|e| self.io_error(e))?;
            relative_names.push(relative);
        }

        debug!(
            tool = %self.tool,
            dir = %staging.path().display(),
            files = relative_names.len(),
            "running formatter"
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&relative_names)
            .current_dir(staging.path())
            .output()
            .await
            .map_err(|e| self.io_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!(
                tool = %self.tool,
                status = %output.status,
                %stdout,
                %stderr,
                "formatter failed"
            );
            return Err(CheckError::ToolFailed {
                tool: self.tool.clone(),
                status: output.status,
            });
        }

        let mut reply = Vec::with_capacity(files.len());
        for (file, relative) in files.iter().zip(&relative_names) {
            let content = tokio::fs::read(staging.path().join(Path::new(relative)))
                .await
                .map_err(|e| self.io_error(e))?;
            reply.push(FormattedFile {
                name: file.name.clone(),
                content: Some(content),
                message: None,
            });
        }

        Ok(FormatOutput {
            files: reply,
            diagnostic: format!("{stdout}{stderr}"),
        })
    }
}
