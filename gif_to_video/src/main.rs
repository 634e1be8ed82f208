use anyhow::Context;
use clap::Parser;
use shared_utils::logging::LogConfig;
use shared_utils::{ensure_tool_available, RunContext};
use std::path::PathBuf;
use tracing::info;

use gif_to_video::schedule::DEFAULT_MIN_VIDEO_SECS;
use gif_to_video::tools::DEFAULT_BITRATE;
use gif_to_video::{FfmpegSequenceEncoder, GifNormalizer, Gifsicle, NormalizerConfig};

#[derive(Parser)]
#[command(name = "gif_to_video")]
#[command(
    version,
    about = "Convert an animated GIF into a looping constant-framerate MP4",
    long_about = "Picks a framerate from the shortest frame delay, repeats each frame to keep \
                  its timing and loops the GIF until the video is at least --min-seconds long. \
                  Writes <OUTPUT_DIR>/<gif file name>.mp4. Needs gifsicle and ffmpeg on PATH."
)]
struct Cli {
    #[arg(value_name = "INPUT_GIF")]
    input: PathBuf,

    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Video bitrate passed to ffmpeg
    #[arg(long, default_value = DEFAULT_BITRATE)]
    bitrate: String,

    /// Minimum output length in seconds
    #[arg(long, default_value_t = DEFAULT_MIN_VIDEO_SECS)]
    min_seconds: u32,

    /// Directory for log files (default: system temp dir)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Hide the expansion progress bar
    #[arg(long)]
    no_progress: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::new().verbose(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    let ctx = RunContext::init("gif_to_video", log_config)?;

    ensure_tool_available("gifsicle")?;
    ensure_tool_available("ffmpeg")?;

    let normalizer = GifNormalizer::new(
        Gifsicle::new(),
        FfmpegSequenceEncoder::new().with_bitrate(cli.bitrate.clone()),
        NormalizerConfig {
            min_video_secs: cli.min_seconds,
            show_progress: !cli.no_progress,
            ..NormalizerConfig::default()
        },
    );

    let output = normalizer
        .convert(&ctx, &cli.input, &cli.output_dir)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    info!(output = %output.display(), "Done");
    ctx.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
