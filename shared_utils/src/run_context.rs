//! Per-invocation run context.
//!
//! Created once in `main`, then passed by reference into each component so
//! nothing reads a process-wide start time.

use crate::logging::{init_logging, LogConfig};
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use tracing::{info, info_span, Span};

#[derive(Debug)]
pub struct RunContext {
    program: String,
    started_at: DateTime<Local>,
    started: Instant,
    span: Span,
}

impl RunContext {
    /// Context without touching the global subscriber. Used by tests and by
    /// callers that configured logging themselves.
    pub fn new(program: &str) -> Self {
        let started_at = Local::now();
        let span = info_span!("run", program = program, started_at = %started_at.to_rfc3339());
        Self {
            program: program.to_string(),
            started_at,
            started: Instant::now(),
            span,
        }
    }

    /// Installs logging for `program`, then builds the context.
    pub fn init(program: &str, config: LogConfig) -> anyhow::Result<Self> {
        init_logging(program, config)?;
        let ctx = Self::new(program);
        ctx.in_scope(|| info!(pid = std::process::id(), "Run started"));
        Ok(ctx)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Runs `f` inside the run's root span.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }

    /// Logs the total run time. Consumes the context.
    pub fn finish(self) {
        let elapsed = self.elapsed();
        self.in_scope(|| info!("Completed in {} sec", elapsed.as_secs()));
    }
}
