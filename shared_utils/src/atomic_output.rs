//! Atomic replacement of an output file.
//!
//! A [`TempOutput`] reserves a hidden temp file next to the destination. The
//! writer (usually an external tool run with `-y`) fills it, then
//! [`TempOutput::commit`] renames it over the destination. Dropping an
//! uncommitted `TempOutput` deletes the temp file, leaving the destination
//! as it was.

use crate::errors::Result;
use crate::path_safety::parent_dir;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

#[derive(Debug)]
pub struct TempOutput {
    temp: TempPath,
    destination: PathBuf,
}

impl TempOutput {
    /// Reserves `.{file_name}.XXXXXX.{ext}` in the destination's directory.
    /// The extension is kept so ffmpeg can infer the container.
    pub fn for_destination(destination: &Path) -> Result<Self> {
        let dir = parent_dir(destination);
        let stem = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let suffix = destination
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(&format!(".{}.", stem))
            .suffix(&suffix)
            .tempfile_in(dir)?;

        Ok(Self {
            temp: file.into_temp_path(),
            destination: destination.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Renames the temp file over the destination.
    pub fn commit(self) -> Result<PathBuf> {
        let Self { temp, destination } = self;
        temp.persist(&destination).map_err(|e| e.error)?;
        debug!(destination = %destination.display(), "Committed output");
        Ok(destination)
    }
}

/// Copies `source` to `destination` through a temp file and rename, so a
/// reader never observes a half-copied destination.
pub fn copy_atomically(source: &Path, destination: &Path) -> Result<PathBuf> {
    let temp = TempOutput::for_destination(destination)?;
    std::fs::copy(source, temp.path())?;
    temp.commit()
}
