//! Shared Utilities for the frame-stitch tools
//!
//! This crate provides the plumbing shared by `gif_to_video`,
//! `incremental_grow` and `concat`:
//! - Error type and logging setup
//! - Run context (start time, root span)
//! - External tool execution with stderr draining
//! - ffmpeg concat-demuxer concatenation
//! - Atomic output replacement and the append-only growth protocol
//! - Advisory output lock
//! - Sorted directory listing

pub mod append;
pub mod atomic_output;
pub mod concat;
pub mod dir_listing;
pub mod errors;
pub mod external_tool;
pub mod logging;
pub mod output_lock;
pub mod path_safety;
pub mod run_context;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use append::{append_clips, AppendOutcome};
pub use atomic_output::{copy_atomically, TempOutput};
pub use concat::{ConcatManifest, ConcatMode, Concatenator, FfmpegConcatenator};
pub use dir_listing::{list_sorted_files, sort_by_name};
pub use errors::{Result, StitchError};
pub use external_tool::{ensure_tool_available, run_tool, ToolOutput};
pub use output_lock::OutputLock;
pub use path_safety::safe_path_arg;
pub use run_context::RunContext;
