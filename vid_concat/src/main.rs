use anyhow::Context;
use clap::Parser;
use shared_utils::logging::LogConfig;
use shared_utils::path_safety::absolute_path;
use shared_utils::{
    append_clips, ensure_tool_available, sort_by_name, AppendOutcome, Concatenator,
    FfmpegConcatenator, OutputLock, Result, RunContext, StitchError,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "concat")]
#[command(
    version,
    about = "Concatenate video files onto a destination video",
    long_about = "Inputs are sorted by name (names imply time order). If --dest does not exist \
                  it is created from the first input; the rest are appended by lossless stream \
                  copy. All inputs must share codec parameters."
)]
struct Cli {
    /// Destination video
    #[arg(long, value_name = "PATH")]
    dest: PathBuf,

    /// Videos to append to dest
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for log files (default: system temp dir)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

/// Sorts `inputs` and appends them to `dest` under the output lock.
fn concat_into<C: Concatenator>(concatenator: &C, dest: &Path, inputs: Vec<PathBuf>) -> Result<AppendOutcome> {
    let dest = absolute_path(dest)?;
    let mut clips = Vec::with_capacity(inputs.len());
    for input in sort_by_name(inputs) {
        if !input.is_file() {
            return Err(StitchError::Usage(format!("input not found: {}", input.display())));
        }
        let input = absolute_path(&input)?;
        if input == dest {
            return Err(StitchError::Usage(format!(
                "destination is also listed as an input: {}",
                dest.display()
            )));
        }
        clips.push(input);
    }

    let _lock = OutputLock::acquire(&dest)?;
    append_clips(concatenator, &dest, &clips)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::new().verbose(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    let ctx = RunContext::init("concat", log_config)?;

    let ffmpeg = ensure_tool_available("ffmpeg")?;
    let outcome = ctx
        .in_scope(|| concat_into(&FfmpegConcatenator::with_binary(ffmpeg), &cli.dest, cli.inputs.clone()))
        .with_context(|| format!("Failed to append to {}", cli.dest.display()))?;

    info!(
        dest = %outcome.output.display(),
        bootstrapped = outcome.bootstrapped,
        appended = outcome.appended,
        "Done"
    );
    ctx.finish();
    Ok(())
}
