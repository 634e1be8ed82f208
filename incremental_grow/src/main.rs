use anyhow::Context;
use clap::Parser;
use shared_utils::logging::LogConfig;
use shared_utils::{ensure_tool_available, FfmpegConcatenator, RunContext};
use std::path::PathBuf;
use std::time::Duration;

use incremental_grow::grower::DEFAULT_FRAMES_PER_BLOCK;
use incremental_grow::{GrowerConfig, IncrementalGrower};

#[derive(Parser)]
#[command(name = "incremental_grow")]
#[command(
    version,
    about = "Incrementally grow a timelapse video from a directory of images",
    long_about = "Encodes the first --frames_per_block images (by name) into a clip, appends it \
                  to the output by lossless stream copy and deletes the images. With --loop, \
                  keeps polling for new images."
)]
struct Cli {
    /// Number of images to accumulate before encoding a block
    #[arg(
        long = "frames_per_block",
        visible_alias = "frames-per-block",
        default_value_t = DEFAULT_FRAMES_PER_BLOCK
    )]
    frames_per_block: usize,

    /// Loop forever watching for new images
    #[arg(long = "loop")]
    watch: bool,

    /// Seconds to sleep between polls in --loop mode
    #[arg(long, default_value_t = 4)]
    poll_interval: u64,

    /// Stop --loop mode after this many polls
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Also keep each encoded block clip in this directory
    #[arg(long)]
    keep_blocks: Option<PathBuf>,

    /// Directory of input images
    #[arg(value_name = "INDIR")]
    indir: PathBuf,

    /// Output video, or a directory to hold timelapse.mp4
    #[arg(value_name = "OUTDIR_OR_FINALVIDEO")]
    output: PathBuf,

    /// Directory for log files (default: system temp dir)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::new().verbose(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    let ctx = RunContext::init("incremental_grow", log_config)?;

    let ffmpeg = ensure_tool_available("ffmpeg")?;

    let config = GrowerConfig::new(&cli.indir, &cli.output, cli.frames_per_block)?
        .with_poll_interval(Duration::from_secs(cli.poll_interval))
        .with_max_iterations(cli.max_iterations)
        .with_keep_blocks(cli.keep_blocks.clone())?;
    let output = config.output.clone();

    let grower = IncrementalGrower::new(FfmpegConcatenator::with_binary(ffmpeg), config);
    grower
        .run(&ctx, cli.watch)
        .with_context(|| format!("Failed to grow {}", output.display()))?;

    ctx.finish();
    Ok(())
}
