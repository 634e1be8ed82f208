//! Incremental timelapse growth.
//!
//! Each iteration drains one full block of images from the source directory,
//! encodes it into a short clip and appends that clip to the output video
//! without re-encoding what is already there. Disk use stays at roughly one
//! block of images plus the output.
//!
//! Failure policy:
//! - the block's images are deleted once the encode has been attempted, even
//!   when it failed (those frames are lost)
//! - an append failure leaves the output untouched and drops the block
//! - images that cannot be deleted stop the run (after their block was
//!   appended), since the next scan would encode them again
//! - in watch mode recoverable errors are logged and the next poll continues

use crate::batch::{ImageBatch, ScanOutcome};
use shared_utils::atomic_output::copy_atomically;
use shared_utils::path_safety::{file_name_string, parent_dir};
use shared_utils::{
    append_clips, AppendOutcome, ConcatMode, Concatenator, OutputLock, Result, RunContext,
    StitchError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_FRAMES_PER_BLOCK: usize = 240;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
/// File name used when the output argument is a directory.
pub const DEFAULT_OUTPUT_NAME: &str = "timelapse.mp4";

#[derive(Debug, Clone)]
pub struct GrowerConfig {
    pub source_dir: PathBuf,
    pub output: PathBuf,
    pub frames_per_block: usize,
    pub poll_interval: Duration,
    /// Watch mode stops after this many iterations. `None` runs forever.
    pub max_iterations: Option<u64>,
    /// Also keep every encoded block here as `<stem>.mp4`.
    pub keep_blocks: Option<PathBuf>,
}

impl GrowerConfig {
    /// An existing directory as `output_or_dir` means `<dir>/timelapse.mp4`.
    ///
    /// Directories are canonicalized so the output can be recognised in the
    /// source directory however either path was spelled (`..`, symlinks).
    pub fn new(source_dir: &Path, output_or_dir: &Path, frames_per_block: usize) -> Result<Self> {
        if frames_per_block == 0 {
            return Err(StitchError::Usage(
                "--frames_per_block must be at least 1".to_string(),
            ));
        }
        if !source_dir.is_dir() {
            return Err(StitchError::Usage(format!(
                "input directory not found: {}",
                source_dir.display()
            )));
        }

        let output = if output_or_dir.is_dir() {
            fs::canonicalize(output_or_dir)?.join(DEFAULT_OUTPUT_NAME)
        } else {
            let parent = parent_dir(output_or_dir);
            if !parent.is_dir() {
                return Err(StitchError::Usage(format!(
                    "output directory not found: {}",
                    parent.display()
                )));
            }
            let name = output_or_dir.file_name().ok_or_else(|| {
                StitchError::Usage(format!(
                    "output has no file name: {}",
                    output_or_dir.display()
                ))
            })?;
            fs::canonicalize(parent)?.join(name)
        };

        Ok(Self {
            source_dir: fs::canonicalize(source_dir)?,
            output,
            frames_per_block,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_iterations: None,
            keep_blocks: None,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_iterations(mut self, max: Option<u64>) -> Self {
        self.max_iterations = max;
        self
    }

    /// Kept clips must not land in the source directory, where later scans
    /// would take them for images.
    pub fn with_keep_blocks(mut self, dir: Option<PathBuf>) -> Result<Self> {
        self.keep_blocks = match dir {
            None => None,
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(StitchError::Usage(format!(
                        "--keep-blocks directory not found: {}",
                        dir.display()
                    )));
                }
                let dir = fs::canonicalize(&dir)?;
                if dir == self.source_dir {
                    return Err(StitchError::Usage(format!(
                        "--keep-blocks must differ from the input directory: {}",
                        dir.display()
                    )));
                }
                Some(dir)
            }
        };
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Fewer images than one block. Nothing changed.
    Waiting { found: usize, needed: usize },
    /// The output did not exist and is now the first block.
    Bootstrapped { block: String, images: usize },
    Appended { block: String, images: usize },
}

pub struct IncrementalGrower<C> {
    concatenator: C,
    config: GrowerConfig,
}

impl<C: Concatenator> IncrementalGrower<C> {
    pub fn new(concatenator: C, config: GrowerConfig) -> Self {
        Self {
            concatenator,
            config,
        }
    }

    pub fn config(&self) -> &GrowerConfig {
        &self.config
    }

    pub fn concatenator(&self) -> &C {
        &self.concatenator
    }

    /// Runs one scan/encode/append step. The caller must hold the output
    /// lock; [`IncrementalGrower::run`] does.
    pub fn run_once(&self, ctx: &RunContext) -> Result<IterationOutcome> {
        let output = &self.config.output;
        let ignore = [output.clone(), OutputLock::lock_path_for(output)];

        let batch = match ImageBatch::scan(&self.config.source_dir, self.config.frames_per_block, &ignore)? {
            ScanOutcome::Waiting { found, needed } => {
                info!("Found {}, frames_per_block is {}.", found, needed);
                return Ok(IterationOutcome::Waiting { found, needed });
            }
            ScanOutcome::Ready(batch) => batch,
        };

        let stem = batch.block_stem()?;
        let images = batch.len();
        info!("Found {} files, encoding", images);

        // Hidden, next to the output: skipped by scans, renames stay on one
        // filesystem.
        let work_dir = tempfile::Builder::new()
            .prefix(".grow-")
            .tempdir_in(parent_dir(output))?;
        let block = work_dir.path().join(format!("{}.mp4", stem));

        let encoded = self
            .concatenator
            .concat(batch.images(), &block, ConcatMode::Reencode);
        let consumed = batch.consume();

        // Keep the block even if some deletes failed: the images that did
        // get deleted only live in it now.
        let delivered = encoded.and_then(|()| self.deliver_block(&block, &stem));

        // Leftover images would be picked up again by the next scan.
        if let Err(e) = consumed {
            error!(error = %e, block = %stem, "Failed to delete consumed images");
            return Err(StitchError::InvariantViolation(format!(
                "images of block {} could not all be deleted ({}); block {}",
                stem,
                e,
                match &delivered {
                    Ok(_) => "was appended".to_string(),
                    Err(de) => format!("was not appended: {}", de),
                }
            )));
        }
        let appended = match delivered {
            Ok(appended) => appended,
            Err(e) => {
                warn!(block = %stem, "Block lost; its images were deleted");
                return Err(e);
            }
        };

        info!("Completed in {} sec", ctx.elapsed().as_secs());
        Ok(if appended.bootstrapped {
            IterationOutcome::Bootstrapped {
                block: stem,
                images,
            }
        } else {
            IterationOutcome::Appended {
                block: stem,
                images,
            }
        })
    }

    /// Checks the encoded block, keeps a copy if asked, appends it.
    fn deliver_block(&self, block: &Path, stem: &str) -> Result<AppendOutcome> {
        if fs::metadata(block)?.len() == 0 {
            return Err(StitchError::EmptyOutput(block.to_path_buf()));
        }

        if let Some(keep_dir) = &self.config.keep_blocks {
            let name = file_name_string(block).unwrap_or_else(|| format!("{}.mp4", stem));
            copy_atomically(block, &keep_dir.join(name))?;
        }

        append_clips(&self.concatenator, &self.config.output, &[block.to_path_buf()])
    }

    /// Holds the output lock and runs one iteration, or polls until
    /// `max_iterations` when `watch` is set. Returns the iterations run.
    pub fn run(&self, ctx: &RunContext, watch: bool) -> Result<u64> {
        let _guard = ctx.span().enter();
        let _lock = OutputLock::acquire(&self.config.output)?;
        info!(
            source = %self.config.source_dir.display(),
            output = %self.config.output.display(),
            frames_per_block = self.config.frames_per_block,
            watch,
            "Growing timelapse"
        );

        if !watch {
            self.run_once(ctx)?;
            return Ok(1);
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            match self.run_once(ctx) {
                Ok(_) => {}
                Err(e) if e.is_iteration_recoverable() => {
                    error!(iteration = iterations, "Iteration failed: {}", e);
                }
                Err(e) => return Err(e),
            }

            if self.config.max_iterations.is_some_and(|max| iterations >= max) {
                break;
            }
            thread::sleep(self.config.poll_interval);
        }
        Ok(iterations)
    }
}
