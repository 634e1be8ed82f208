//! External tool process management.
//!
//! gifsicle and ffmpeg are driven as blocking subprocesses. Both can write a
//! lot to stderr, so stderr is drained on its own thread while stdout is read
//! on the caller's thread. Reading only one pipe while the other fills up
//! deadlocks once the OS pipe buffer (typically 64KB) is full.
//!
//! ```ignore
//! use shared_utils::external_tool::run_tool;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("gifsicle");
//! cmd.arg("--info").arg("anim.gif");
//! let output = run_tool("gifsicle", &mut cmd)?;
//! println!("{}", output.stdout);
//! ```

use crate::errors::{Result, StitchError};
use crate::logging::log_external_tool;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::info;

/// Captured result of a finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// A spawned tool whose stderr is consumed in the background.
pub struct ToolProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<String>>,
}

impl ToolProcess {
    /// Spawns `cmd` with stdout and stderr piped.
    pub fn spawn(cmd: &mut Command) -> std::io::Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture tool stderr"))?;

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(|l| l.ok()) {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Reads stdout to the end, then waits for exit.
    pub fn wait_with_output(mut self) -> std::io::Result<(ExitStatus, String, String)> {
        let mut stdout = String::new();
        if let Some(mut out) = self.child.stdout.take() {
            let mut bytes = Vec::new();
            out.read_to_end(&mut bytes)?;
            stdout = String::from_utf8_lossy(&bytes).into_owned();
        }
        let status = self.child.wait()?;
        let stderr = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();
        Ok((status, stdout, stderr))
    }
}

/// Renders a command line for logs and error messages.
pub fn describe_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Runs `cmd` to completion. A non-zero exit becomes [`StitchError::ExternalTool`].
pub fn run_tool(tool_name: &str, cmd: &mut Command) -> Result<ToolOutput> {
    let command_str = describe_command(cmd);
    info!(tool = tool_name, command = %command_str, "Executing external command");

    let started = Instant::now();
    let process = ToolProcess::spawn(cmd).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StitchError::ToolNotFound(tool_name.to_string())
        } else {
            StitchError::Io(e)
        }
    })?;
    let (status, stdout, stderr) = process.wait_with_output()?;
    let duration = started.elapsed();

    log_external_tool(tool_name, &command_str, &stderr, status.code(), duration);

    if !status.success() {
        return Err(StitchError::ExternalTool {
            tool: tool_name.to_string(),
            command: command_str,
            exit_code: status.code(),
            stderr,
        });
    }

    Ok(ToolOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        duration,
    })
}

/// Resolves `tool_name` on `PATH`.
pub fn ensure_tool_available(tool_name: &str) -> Result<PathBuf> {
    which::which(tool_name).map_err(|_| StitchError::ToolNotFound(tool_name.to_string()))
}

/// Picks the most meaningful line out of a tool's stderr.
///
/// Lines mentioning an error win; otherwise the last non-progress line.
pub fn format_tool_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown tool error".to_string())
}

pub fn get_error_suggestion(stderr: &str) -> Option<String> {
    let patterns = [
        ("No such file or directory", "check that the input path exists"),
        ("Invalid data found", "the input may be truncated or corrupt"),
        ("Permission denied", "check read/write permissions"),
        ("Unsafe file name", "concat manifests need -safe 0 for absolute paths"),
        (
            "Non-monotonous DTS",
            "stream copy needs inputs with matching codec parameters",
        ),
        ("background color not in colormap", "pass --background to gifsicle"),
        ("moov atom not found", "the video is incomplete, re-encode it"),
        ("Encoder", "install the matching encoder (e.g. libx264)"),
    ];

    patterns
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, suggestion)| suggestion.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tool_error_with_error_line() {
        let stderr = r#"
frame=  100 fps=25.0 q=28.0 size=    1024kB time=00:00:04.00 bitrate=2097.2kbits/s
[concat @ 0x7f8b8c000000] Error: unsafe file name
"#;
        let error = format_tool_error(stderr);
        assert!(error.contains("Error"));
        assert!(error.contains("unsafe file name"));
    }

    #[test]
    fn test_format_tool_error_no_error_line() {
        let stderr = "\nframe=  100 fps=25.0 size=    1024kB\nConversion failed!\n";
        assert_eq!(format_tool_error(stderr), "Conversion failed!");
    }

    #[test]
    fn test_format_tool_error_empty() {
        assert_eq!(format_tool_error(""), "Unknown tool error");
    }

    #[test]
    fn test_suggestion_lookup() {
        assert!(get_error_suggestion("x: Permission denied").is_some());
        assert!(get_error_suggestion("all good").is_none());
    }

    #[test]
    fn test_describe_command() {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-i", "in.mp4", "out.mp4"]);
        assert_eq!(describe_command(&cmd), "ffmpeg -y -i in.mp4 out.mp4");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_success_captures_stdout() {
        let mut cmd = Command::new("echo");
        cmd.args(["hello", "world"]);
        let output = run_tool("echo", &mut cmd).unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.contains("hello world"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_failure_is_external_tool_error() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        match run_tool("sh", &mut cmd) {
            Err(StitchError::ExternalTool {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_run_tool_missing_binary() {
        let mut cmd = Command::new("nonexistent_command_xyz");
        assert!(matches!(
            run_tool("nonexistent_command_xyz", &mut cmd),
            Err(StitchError::ToolNotFound(_))
        ));
    }
}
