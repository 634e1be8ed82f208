//! Logging setup shared by all tools.
//!
//! Logs go to two sinks:
//! - a daily-rolling file `{program}.log` in the log directory (system temp
//!   dir by default), without ANSI colours
//! - stderr, coloured
//!
//! `RUST_LOG` overrides the configured level.
//!
//! ```no_run
//! use shared_utils::logging::{LogConfig, init_logging};
//! use tracing::info;
//!
//! init_logging("gif_to_video", LogConfig::default()).expect("Failed to initialize logging");
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the rolling log file. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
    /// Rolled log files kept per program.
    pub max_files: usize,
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: Some(std::env::temp_dir()),
            max_files: 5,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn without_log_file(mut self) -> Self {
        self.log_dir = None;
        self
    }

    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// `-v` on the command line bumps the level to DEBUG.
    pub fn verbose(self, verbose: bool) -> Self {
        if verbose {
            self.with_level(Level::DEBUG)
        } else {
            self
        }
    }
}

/// `{program}=LEVEL,shared_utils=LEVEL`, unless `RUST_LOG` is set.
fn build_filter(program_name: &str, level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{program_name}={level},shared_utils={level}"))
    })
}

/// Installs the global subscriber. Call once per process.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let registry = tracing_subscriber::registry()
        .with(build_filter(program_name, config.level))
        .with(stderr_layer);

    let Some(log_dir) = config.log_dir.as_deref() else {
        registry.init();
        return Ok(());
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let log_file_name = format!("{program_name}.log");
    let file_layer = fmt::layer()
        .with_writer(RollingFileAppender::new(Rotation::DAILY, log_dir, &log_file_name))
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true);
    registry.with(file_layer).init();

    let removed = cleanup_old_logs(log_dir, program_name, config.max_files)?;
    tracing::debug!(
        log_dir = %log_dir.display(),
        log_file = %log_file_name,
        level = %config.level,
        removed_old_logs = removed,
        "Logging initialized"
    );
    Ok(())
}

/// Rolled files look like `{program}.log.2026-10-19`.
fn is_program_log(file_name: &str, program_name: &str) -> bool {
    file_name
        .strip_prefix(program_name)
        .is_some_and(|rest| rest.starts_with(".log"))
}

/// Deletes all but the newest `max_files` logs of `program_name`. Returns
/// how many were deleted.
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<usize> {
    let mut logs: Vec<(SystemTime, PathBuf)> = std::fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory {}", log_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_program_log(&entry.file_name().to_string_lossy(), program_name))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file()
                .then(|| meta.modified().ok())
                .flatten()
                .map(|modified| (modified, entry.path()))
        })
        .collect();

    // Newest first.
    logs.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in logs.into_iter().skip(max_files) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove old log file"),
        }
    }
    Ok(removed)
}

/// Records one finished external tool call. Failures carry the command line
/// and full stderr; successes log stderr at debug level only.
pub fn log_external_tool(
    tool_name: &str,
    command: &str,
    stderr: &str,
    exit_code: Option<i32>,
    duration: Duration,
) {
    let secs = duration.as_secs_f64();
    if exit_code == Some(0) {
        tracing::info!(tool = tool_name, duration_secs = secs, "External tool finished");
        tracing::debug!(tool = tool_name, stderr = %stderr, "External tool stderr");
        return;
    }
    tracing::error!(
        tool = tool_name,
        command = %command,
        duration_secs = secs,
        exit_code = ?exit_code,
        stderr = %stderr,
        "External tool failed"
    );
}
