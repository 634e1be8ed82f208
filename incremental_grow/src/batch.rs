//! Fixed-size batches of still images taken from the front of a directory.

use shared_utils::{list_sorted_files, Result, StitchError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, PartialEq)]
pub enum ScanOutcome {
    /// Not enough images yet. Nothing was touched.
    Waiting { found: usize, needed: usize },
    Ready(ImageBatch),
}

/// The first `frames_per_block` images of the source directory, in name
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    images: Vec<PathBuf>,
}

impl ImageBatch {
    /// Lists `source_dir` and takes a full batch if one is available.
    /// Paths in `ignore` (the output video and its lock, when they live in
    /// the same directory) are never picked up.
    pub fn scan(source_dir: &Path, frames_per_block: usize, ignore: &[PathBuf]) -> Result<ScanOutcome> {
        if frames_per_block == 0 {
            return Err(StitchError::Usage(
                "frames_per_block must be at least 1".to_string(),
            ));
        }

        let images: Vec<PathBuf> = list_sorted_files(source_dir)?
            .into_iter()
            .filter(|p| !ignore.contains(p))
            .take(frames_per_block)
            .collect();

        if images.len() < frames_per_block {
            return Ok(ScanOutcome::Waiting {
                found: images.len(),
                needed: frames_per_block,
            });
        }

        Ok(ScanOutcome::Ready(Self { images }))
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Stem of the last image; the encoded block is named after it.
    pub fn block_stem(&self) -> Result<String> {
        self.images
            .last()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| StitchError::InvariantViolation("batch has no images".to_string()))
    }

    /// Deletes every image in the batch. Already-missing files are skipped.
    /// Returns how many were removed.
    pub fn consume(self) -> Result<usize> {
        let mut removed = 0;
        for image in &self.images {
            match fs::remove_file(image) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(image = %image.display(), "Image vanished before cleanup");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}
