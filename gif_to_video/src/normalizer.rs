//! GIF → constant-framerate looping video.
//!
//! Pipeline: info report → explode → schedule → expand → encode. Both working
//! directories are `TempDir`s and disappear on every exit path.

use crate::expand::{expand_frames, expansion_progress};
use crate::frame_report::FrameReport;
use crate::schedule::{FrameSchedule, DEFAULT_FRAMERATE_CORRECTIONS, DEFAULT_MIN_VIDEO_SECS};
use crate::tools::{GifDecomposer, SequenceEncoder};
use shared_utils::path_safety::{absolute_path, file_name_string};
use shared_utils::{Result, RunContext, StitchError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// The output loops the GIF until it lasts at least this long.
    pub min_video_secs: u32,
    pub framerate_corrections: Vec<(u32, u32)>,
    pub show_progress: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_video_secs: DEFAULT_MIN_VIDEO_SECS,
            framerate_corrections: DEFAULT_FRAMERATE_CORRECTIONS.to_vec(),
            show_progress: true,
        }
    }
}

pub struct GifNormalizer<D, E> {
    decomposer: D,
    encoder: E,
    config: NormalizerConfig,
}

impl<D: GifDecomposer, E: SequenceEncoder> GifNormalizer<D, E> {
    pub fn new(decomposer: D, encoder: E, config: NormalizerConfig) -> Self {
        Self {
            decomposer,
            encoder,
            config,
        }
    }

    /// `<output_dir>/<gif file name>.mp4`
    pub fn output_path_for(input_gif: &Path, output_dir: &Path) -> Result<PathBuf> {
        let name = file_name_string(input_gif).ok_or_else(|| {
            StitchError::Usage(format!("input has no file name: {}", input_gif.display()))
        })?;
        Ok(output_dir.join(format!("{}.mp4", name)))
    }

    /// Converts `input_gif` and returns the path of the written video.
    pub fn convert(&self, ctx: &RunContext, input_gif: &Path, output_dir: &Path) -> Result<PathBuf> {
        let _guard = ctx.span().enter();

        if !input_gif.is_file() {
            return Err(StitchError::Usage(format!(
                "input GIF not found: {}",
                input_gif.display()
            )));
        }
        if !output_dir.is_dir() {
            return Err(StitchError::Usage(format!(
                "output directory not found: {}",
                output_dir.display()
            )));
        }

        let input_gif = absolute_path(input_gif)?;
        let output = Self::output_path_for(&input_gif, &absolute_path(output_dir)?)?;
        let gif_name = file_name_string(&input_gif).unwrap_or_default();

        let explode_dir = tempfile::Builder::new().prefix("gif-explode-").tempdir()?;
        let expanded_dir = tempfile::Builder::new().prefix("gif-expanded-").tempdir()?;

        let report = FrameReport::parse(&self.decomposer.info_report(&input_gif)?)?;
        let schedule =
            FrameSchedule::from_durations(report.durations(), &self.config.framerate_corrections)?;
        info!(
            input = %input_gif.display(),
            frames = report.frame_count(),
            gif_secs = report.total_duration_secs(),
            framerate = schedule.framerate(),
            cycles = schedule.cycles_for(self.config.min_video_secs),
            "Frame schedule computed"
        );

        let frame_prefix = explode_dir.path().join(&gif_name);
        self.decomposer.explode(&input_gif, &frame_prefix)?;
        let frames = report.frames(explode_dir.path(), &gif_name);

        let progress = expansion_progress(
            schedule.total_frames(self.config.min_video_secs),
            self.config.show_progress,
        );
        let sequence = expand_frames(
            &schedule,
            &frames,
            expanded_dir.path(),
            &gif_name,
            self.config.min_video_secs,
            &progress,
        );
        progress.finish_and_clear();
        let sequence = sequence?;

        info!(
            frames = sequence.frame_count,
            video_secs = sequence.duration_secs(),
            output = %output.display(),
            "Encoding"
        );
        if let Err(e) = self.encoder.encode_sequence(&sequence, &output) {
            if output.exists() {
                warn!(output = %output.display(), "Removing partial output");
                let _ = fs::remove_file(&output);
            }
            return Err(e);
        }

        if fs::metadata(&output)?.len() == 0 {
            let _ = fs::remove_file(&output);
            return Err(StitchError::EmptyOutput(output));
        }

        info!(
            output = %output.display(),
            elapsed_secs = ctx.elapsed().as_secs_f64(),
            "GIF converted"
        );
        Ok(output)
    }
}
