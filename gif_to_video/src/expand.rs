//! Expansion of exploded GIF frames into a constant-rate image sequence.

use crate::frame::{ExpandedFrameSequence, Frame};
use crate::schedule::FrameSchedule;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use shared_utils::{Result, StitchError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Progress bar over `total` copied frames, hidden when stderr is not a
/// terminal.
pub fn expansion_progress(total: u64, enabled: bool) -> ProgressBar {
    if !enabled || !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Expanding [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Copies every frame `repetitions[i]` times into `dst_dir`, numbering the
/// copies consecutively, and repeats whole passes until the sequence lasts at
/// least `min_secs`.
pub fn expand_frames(
    schedule: &FrameSchedule,
    frames: &[Frame],
    dst_dir: &Path,
    gif_name: &str,
    min_secs: u32,
    progress: &ProgressBar,
) -> Result<ExpandedFrameSequence> {
    if frames.len() != schedule.repetitions().len() {
        return Err(StitchError::InvariantViolation(format!(
            "{} exploded frames but {} scheduled",
            frames.len(),
            schedule.repetitions().len()
        )));
    }

    let mut sequence = ExpandedFrameSequence::new(dst_dir, gif_name, schedule.framerate());
    let cycles = schedule.cycles_for(min_secs);

    for cycle in 0..cycles {
        for (frame, &reps) in frames.iter().zip(schedule.repetitions()) {
            if !frame.source_path.is_file() {
                return Err(StitchError::InvariantViolation(format!(
                    "expected frame file not found: {}",
                    frame.source_path.display()
                )));
            }
            for _ in 0..reps {
                let target = sequence.frame_path(gif_name, sequence.frame_count);
                fs::copy(&frame.source_path, &target)?;
                sequence.frame_count += 1;
                progress.inc(1);
            }
        }
        debug!(cycle, emitted = sequence.frame_count, "Expansion pass done");
    }

    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DEFAULT_FRAMERATE_CORRECTIONS;
    use tempfile::TempDir;

    fn exploded(dir: &Path, name: &str, durations: &[f64]) -> Vec<Frame> {
        durations
            .iter()
            .enumerate()
            .map(|(index, &duration_secs)| {
                let source_path = dir.join(format!("{}.{:03}", name, index));
                fs::write(&source_path, format!("frame{}", index)).unwrap();
                Frame {
                    index,
                    duration_secs,
                    source_path,
                }
            })
            .collect()
    }

    #[test]
    fn test_expansion_repeats_frames_in_order() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let durations = [0.5, 1.0];
        let frames = exploded(src.path(), "a.gif", &durations);
        let schedule = FrameSchedule::from_durations(&durations, DEFAULT_FRAMERATE_CORRECTIONS).unwrap();
        assert_eq!(schedule.framerate(), 2);

        let seq = expand_frames(&schedule, &frames, dst.path(), "a.gif", 3, &ProgressBar::hidden())
            .unwrap();

        // 1 + 2 frames per pass, 6 frames needed for 3s at 2 fps.
        assert_eq!(seq.frame_count, 6);
        assert_eq!(seq.duration_secs(), 3.0);
        let contents: Vec<String> = (0..6)
            .map(|n| fs::read_to_string(seq.frame_path("a.gif", n)).unwrap())
            .collect();
        assert_eq!(
            contents,
            ["frame0", "frame1", "frame1", "frame0", "frame1", "frame1"]
        );
        assert!(!dst.path().join("a.gif.006.gif").exists());
    }

    #[test]
    fn test_expansion_reaches_sixty_seconds() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let durations = [0.07, 0.07, 0.10, 3.0];
        let frames = exploded(src.path(), "spin.gif", &durations);
        let schedule = FrameSchedule::from_durations(&durations, DEFAULT_FRAMERATE_CORRECTIONS).unwrap();

        let seq = expand_frames(&schedule, &frames, dst.path(), "spin.gif", 60, &ProgressBar::hidden())
            .unwrap();

        assert_eq!(seq.frame_count, 855);
        assert!(seq.duration_secs() >= 60.0);
        assert_eq!(fs::read_dir(dst.path()).unwrap().count(), 855);
    }

    #[test]
    fn test_missing_frame_file_is_invariant_violation() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let mut frames = exploded(src.path(), "a.gif", &[0.1, 0.1]);
        frames[1].source_path = src.path().join("a.gif.099");
        let schedule = FrameSchedule::with_framerate(10, &[0.1, 0.1]).unwrap();

        let result = expand_frames(&schedule, &frames, dst.path(), "a.gif", 1, &ProgressBar::hidden());
        assert!(matches!(result, Err(StitchError::InvariantViolation(_))));
    }

    #[test]
    fn test_frame_count_mismatch_is_invariant_violation() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let frames = exploded(src.path(), "a.gif", &[0.1]);
        let schedule = FrameSchedule::with_framerate(10, &[0.1, 0.1]).unwrap();

        let result = expand_frames(&schedule, &frames, dst.path(), "a.gif", 1, &ProgressBar::hidden());
        assert!(matches!(result, Err(StitchError::InvariantViolation(_))));
    }
}
