//! Video concatenation through ffmpeg's concat demuxer.
//!
//! The inputs are written, in order, to a manifest file that ffmpeg reads
//! with `-f concat -safe 0`. Two modes:
//! - [`ConcatMode::StreamCopy`]: remux the compressed streams. Fast and
//!   lossless, but every input must share codec parameters. Mismatched
//!   inputs produce garbled output; this is not checked here.
//! - [`ConcatMode::Reencode`]: decode and encode again. Slow, but accepts
//!   heterogeneous inputs, including still images.

use crate::errors::{Result, StitchError};
use crate::external_tool::run_tool;
use crate::path_safety::{absolute_path, safe_path_arg};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMode {
    StreamCopy,
    Reencode,
}

impl ConcatMode {
    fn codec_args(self) -> &'static [&'static str] {
        match self {
            ConcatMode::StreamCopy => &["-c:v", "copy", "-c:a", "copy"],
            ConcatMode::Reencode => &[],
        }
    }
}

/// Joins videos (or images) into one output file.
pub trait Concatenator {
    /// Writes the concatenation of `inputs`, in order, to `output`,
    /// overwriting it.
    fn concat(&self, inputs: &[PathBuf], output: &Path, mode: ConcatMode) -> Result<()>;
}

/// Demuxer list file. Removed when dropped.
#[derive(Debug)]
pub struct ConcatManifest {
    file: NamedTempFile,
    entries: usize,
}

impl ConcatManifest {
    pub fn write(inputs: &[PathBuf]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("concat-")
            .suffix(".txt")
            .tempfile()?;
        for input in inputs {
            let abs = absolute_path(input)?;
            writeln!(file, "{}", manifest_line(&abs))?;
        }
        file.flush()?;
        Ok(Self {
            file,
            entries: inputs.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// One `file '...'` directive. Single quotes are closed, escaped and reopened.
fn manifest_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'", escaped)
}

#[derive(Debug, Clone)]
pub struct FfmpegConcatenator {
    ffmpeg: PathBuf,
}

impl Default for FfmpegConcatenator {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegConcatenator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn build_command(&self, manifest: &Path, output: &Path, mode: ConcatMode) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-nostdin", "-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(manifest)
            .args(mode.codec_args())
            .arg(safe_path_arg(output).as_ref());
        cmd
    }
}

impl Concatenator for FfmpegConcatenator {
    fn concat(&self, inputs: &[PathBuf], output: &Path, mode: ConcatMode) -> Result<()> {
        if inputs.is_empty() {
            return Err(StitchError::Usage(
                "concatenation needs at least one input".to_string(),
            ));
        }

        let manifest = ConcatManifest::write(inputs)?;
        info!(
            inputs = manifest.len(),
            mode = ?mode,
            output = %output.display(),
            "Concatenating"
        );
        let mut cmd = self.build_command(manifest.path(), output, mode);
        run_tool("ffmpeg", &mut cmd)?;
        Ok(())
    }
}
