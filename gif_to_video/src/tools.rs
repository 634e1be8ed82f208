//! gifsicle and ffmpeg adapters.

use crate::frame::ExpandedFrameSequence;
use shared_utils::external_tool::run_tool;
use shared_utils::path_safety::parent_dir;
use shared_utils::{safe_path_arg, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_BITRATE: &str = "512k";

/// Splits a GIF into per-frame files and reports frame delays.
pub trait GifDecomposer {
    /// Human-readable info report listing every image and its delay.
    fn info_report(&self, gif: &Path) -> Result<String>;

    /// Writes one full (unoptimized) image per frame as
    /// `<frame_prefix>.000`, `<frame_prefix>.001`, ...
    fn explode(&self, gif: &Path, frame_prefix: &Path) -> Result<()>;
}

/// Encodes a numbered image sequence into a video.
pub trait SequenceEncoder {
    fn encode_sequence(&self, sequence: &ExpandedFrameSequence, output: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Gifsicle {
    binary: PathBuf,
    background: String,
}

impl Default for Gifsicle {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("gifsicle"),
            background: "000000".to_string(),
        }
    }
}

impl Gifsicle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn info_command(&self, gif: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--info").arg(safe_path_arg(gif).as_ref());
        cmd
    }

    fn explode_command(&self, gif: &Path, frame_prefix: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--background")
            .arg(&self.background)
            .args(["--unoptimize", "--explode"])
            .arg(safe_path_arg(gif).as_ref())
            .arg("--output")
            .arg(safe_path_arg(frame_prefix).as_ref())
            .current_dir(parent_dir(frame_prefix));
        cmd
    }
}

impl GifDecomposer for Gifsicle {
    fn info_report(&self, gif: &Path) -> Result<String> {
        let output = run_tool("gifsicle", &mut self.info_command(gif))?;
        Ok(output.stdout)
    }

    fn explode(&self, gif: &Path, frame_prefix: &Path) -> Result<()> {
        run_tool("gifsicle", &mut self.explode_command(gif, frame_prefix))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FfmpegSequenceEncoder {
    binary: PathBuf,
    bitrate: String,
}

impl Default for FfmpegSequenceEncoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            bitrate: DEFAULT_BITRATE.to_string(),
        }
    }
}

impl FfmpegSequenceEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    fn build_command(&self, sequence: &ExpandedFrameSequence, output: &Path) -> Command {
        let rate = sequence.framerate.to_string();
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-hide_banner", "-nostdin", "-y"])
            .arg("-framerate")
            .arg(&rate)
            .arg("-i")
            .arg(&sequence.pattern)
            .arg("-b:v")
            .arg(&self.bitrate)
            .arg("-r")
            .arg(&rate)
            .arg("-an")
            .arg(safe_path_arg(output).as_ref());
        cmd
    }
}

impl SequenceEncoder for FfmpegSequenceEncoder {
    fn encode_sequence(&self, sequence: &ExpandedFrameSequence, output: &Path) -> Result<()> {
        run_tool("ffmpeg", &mut self.build_command(sequence, output))?;
        Ok(())
    }
}
