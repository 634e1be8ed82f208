//! Append-only growth of a single output video.
//!
//! The output is either absent or a playable concatenation of everything
//! appended so far. It is only ever replaced by rename:
//! - absent output: the first clip is copied into place (bootstrap)
//! - present output: `[output, clips...]` is stream-copied into a temp file
//!   next to the output, then renamed over it
//!
//! If the concatenation fails the temp file is dropped and the output keeps
//! its previous bytes.

use crate::atomic_output::{copy_atomically, TempOutput};
use crate::concat::{ConcatMode, Concatenator};
use crate::errors::{Result, StitchError};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub output: PathBuf,
    /// The output did not exist and was created from the first clip.
    pub bootstrapped: bool,
    /// Clips joined onto the output by concatenation.
    pub appended: usize,
}

/// Appends `clips`, in order, to `output`.
pub fn append_clips<C>(concatenator: &C, output: &Path, clips: &[PathBuf]) -> Result<AppendOutcome>
where
    C: Concatenator + ?Sized,
{
    let Some((first, rest)) = clips.split_first() else {
        return Err(StitchError::Usage("nothing to append".to_string()));
    };

    let mut bootstrapped = false;
    let mut pending = clips;

    if !output.exists() {
        info!(
            output = %output.display(),
            source = %first.display(),
            "Output video not found, copying"
        );
        copy_atomically(first, output)?;
        bootstrapped = true;
        pending = rest;
    }

    if !pending.is_empty() {
        let temp = TempOutput::for_destination(output)?;
        let mut inputs = Vec::with_capacity(pending.len() + 1);
        inputs.push(output.to_path_buf());
        inputs.extend(pending.iter().cloned());

        concatenator.concat(&inputs, temp.path(), ConcatMode::StreamCopy)?;

        if std::fs::metadata(temp.path())?.len() == 0 {
            return Err(StitchError::EmptyOutput(temp.path().to_path_buf()));
        }

        info!(output = %output.display(), clips = pending.len(), "Replacing output");
        temp.commit()?;
    }

    Ok(AppendOutcome {
        output: output.to_path_buf(),
        bootstrapped,
        appended: pending.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ByteConcatenator, FailingConcatenator};
    use std::fs;
    use tempfile::TempDir;

    fn clip(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_first_clip_bootstraps_by_copy() {
        let dir = TempDir::new().unwrap();
        let a = clip(dir.path(), "a.mp4", b"A");
        let output = dir.path().join("out.mp4");
        let concatenator = ByteConcatenator::default();

        let outcome = append_clips(&concatenator, &output, &[a]).unwrap();

        assert!(outcome.bootstrapped);
        assert_eq!(outcome.appended, 0);
        assert_eq!(fs::read(&output).unwrap(), b"A");
        assert_eq!(concatenator.calls(), 0);
    }

    #[test]
    fn test_bootstrap_then_append_rest() {
        let dir = TempDir::new().unwrap();
        let a = clip(dir.path(), "a.mp4", b"A");
        let b = clip(dir.path(), "b.mp4", b"B");
        let output = dir.path().join("out.mp4");
        let concatenator = ByteConcatenator::default();

        let outcome = append_clips(&concatenator, &output, &[a, b]).unwrap();

        assert!(outcome.bootstrapped);
        assert_eq!(outcome.appended, 1);
        assert_eq!(fs::read(&output).unwrap(), b"AB");
        assert_eq!(concatenator.modes(), vec![ConcatMode::StreamCopy]);
    }

    #[test]
    fn test_sequential_appends_equal_single_concat() {
        let dir = TempDir::new().unwrap();
        let a = clip(dir.path(), "a.mp4", b"AAA");
        let b = clip(dir.path(), "b.mp4", b"BB");
        let c = clip(dir.path(), "c.mp4", b"C");
        let concatenator = ByteConcatenator::default();

        let stepwise = dir.path().join("stepwise.mp4");
        append_clips(&concatenator, &stepwise, &[a.clone(), b.clone()]).unwrap();
        append_clips(&concatenator, &stepwise, &[c.clone()]).unwrap();

        let direct = dir.path().join("direct.mp4");
        append_clips(&concatenator, &direct, &[a, b, c]).unwrap();

        assert_eq!(fs::read(&stepwise).unwrap(), fs::read(&direct).unwrap());
    }

    #[test]
    fn test_failed_append_leaves_output_byte_identical() {
        let dir = TempDir::new().unwrap();
        let output = clip(dir.path(), "out.mp4", b"previous output");
        let b = clip(dir.path(), "b.mp4", b"B");

        let result = append_clips(&FailingConcatenator::partial_write(), &output, &[b]);

        assert!(matches!(result, Err(StitchError::ExternalTool { .. })));
        assert_eq!(fs::read(&output).unwrap(), b"previous output");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "temp file left behind: {:?}", leftovers);
    }

    #[test]
    fn test_empty_concat_result_is_rejected() {
        let dir = TempDir::new().unwrap();
        let output = clip(dir.path(), "out.mp4", b"");
        let b = clip(dir.path(), "b.mp4", b"");

        let result = append_clips(&ByteConcatenator::default(), &output, &[b]);

        assert!(matches!(result, Err(StitchError::EmptyOutput(_))));
        assert_eq!(fs::read(&output).unwrap(), b"");
    }

    #[test]
    fn test_no_clips_is_usage_error() {
        let dir = TempDir::new().unwrap();
        let result = append_clips(&ByteConcatenator::default(), &dir.path().join("o.mp4"), &[]);
        assert!(matches!(result, Err(StitchError::Usage(_))));
    }
}
