//! In-process stand-ins for the external tools, for tests.
//!
//! Enabled inside this crate's tests and, for other workspace members,
//! through the `testing` feature.

use crate::concat::{ConcatMode, Concatenator};
use crate::errors::{Result, StitchError};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// "Concatenates" by joining the raw bytes of its inputs. Byte joining is
/// associative, which is exactly the property stream copy has for
/// compatible inputs.
#[derive(Debug, Default)]
pub struct ByteConcatenator {
    calls: RefCell<Vec<(Vec<PathBuf>, PathBuf, ConcatMode)>>,
}

impl ByteConcatenator {
    pub fn calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn modes(&self) -> Vec<ConcatMode> {
        self.calls.borrow().iter().map(|(_, _, m)| *m).collect()
    }

    pub fn inputs_of_call(&self, index: usize) -> Vec<PathBuf> {
        self.calls.borrow()[index].0.clone()
    }
}

impl Concatenator for ByteConcatenator {
    fn concat(&self, inputs: &[PathBuf], output: &Path, mode: ConcatMode) -> Result<()> {
        let mut bytes = Vec::new();
        for input in inputs {
            bytes.extend(fs::read(input)?);
        }
        fs::write(output, bytes)?;
        self.calls
            .borrow_mut()
            .push((inputs.to_vec(), output.to_path_buf(), mode));
        Ok(())
    }
}

/// Fails like ffmpeg exiting non-zero, optionally after writing junk to the
/// output path first.
#[derive(Debug, Default)]
pub struct FailingConcatenator {
    write_partial: bool,
}

impl FailingConcatenator {
    pub fn partial_write() -> Self {
        Self {
            write_partial: true,
        }
    }
}

impl Concatenator for FailingConcatenator {
    fn concat(&self, _inputs: &[PathBuf], output: &Path, _mode: ConcatMode) -> Result<()> {
        if self.write_partial {
            fs::write(output, b"truncated garbage")?;
        }
        Err(StitchError::ExternalTool {
            tool: "ffmpeg".to_string(),
            command: "ffmpeg -f concat".to_string(),
            exit_code: Some(1),
            stderr: "Error: simulated failure".to_string(),
        })
    }
}
