//! Shared error type for every frame-stitch tool.
//!
//! Library code returns [`StitchError`]; the binaries wrap it in `anyhow`
//! at `main`.

use crate::external_tool::{format_tool_error, get_error_suggestion};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An assumption about intermediate state did not hold. Not recoverable.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{}", describe_tool_failure(.tool, .command, .exit_code, .stderr))]
    ExternalTool {
        tool: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Output file is empty (encoding may have failed): {}", .0.display())]
    EmptyOutput(PathBuf),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Output {} is locked by process {pid}", .path.display())]
    OutputLocked { path: PathBuf, pid: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StitchError {
    /// Whether a watch loop may log this error and keep polling.
    pub fn is_iteration_recoverable(&self) -> bool {
        !matches!(
            self,
            StitchError::InvariantViolation(_)
                | StitchError::OutputLocked { .. }
                | StitchError::ToolNotFound(_)
                | StitchError::Usage(_)
        )
    }
}

fn describe_tool_failure(
    tool: &str,
    command: &str,
    exit_code: &Option<i32>,
    stderr: &str,
) -> String {
    let code = exit_code
        .map(|c| format!("exit code {}", c))
        .unwrap_or_else(|| "terminated by signal".to_string());
    let mut msg = format!(
        "{} failed ({}): {}\n   Command: {}",
        tool,
        code,
        format_tool_error(stderr),
        command
    );
    if let Some(suggestion) = get_error_suggestion(stderr) {
        msg.push_str(&format!("\n   Suggestion: {}", suggestion));
    }
    msg
}

pub type Result<T> = std::result::Result<T, StitchError>;
