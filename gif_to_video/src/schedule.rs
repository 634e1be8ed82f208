//! Constant-framerate schedule for a GIF with per-frame delays.
//!
//! The framerate is chosen so that the shortest frame lasts about one video
//! frame; every other frame is shown for `round(framerate * delay)` video
//! frames. The whole frame list is then repeated until the video reaches a
//! minimum length.

use shared_utils::{Result, StitchError};

pub const DEFAULT_MIN_VIDEO_SECS: u32 = 60;

/// Framerates the encoder handles badly, and what to use instead.
pub const DEFAULT_FRAMERATE_CORRECTIONS: &[(u32, u32)] = &[(16, 15)];

/// `round(1 / shortest delay)`, after corrections. Never below 1 fps.
pub fn select_framerate(durations: &[f64], corrections: &[(u32, u32)]) -> Result<u32> {
    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    if !shortest.is_finite() || shortest <= 0.0 {
        return Err(StitchError::MalformedInput(format!(
            "cannot derive a framerate from frame delays {:?}",
            durations
        )));
    }

    let raw = (1.0 / shortest).round();
    let raw = if raw < 1.0 { 1 } else { raw as u32 };

    Ok(corrections
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| *to)
        .unwrap_or(raw))
}

/// Video frames needed to show a `duration` second image at `framerate`.
pub fn repetitions_for(framerate: u32, duration: f64) -> u32 {
    (f64::from(framerate) * duration).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSchedule {
    framerate: u32,
    repetitions: Vec<u32>,
}

impl FrameSchedule {
    pub fn from_durations(durations: &[f64], corrections: &[(u32, u32)]) -> Result<Self> {
        let framerate = select_framerate(durations, corrections)?;
        Self::with_framerate(framerate, durations)
    }

    /// Every frame must map to at least one video frame.
    pub fn with_framerate(framerate: u32, durations: &[f64]) -> Result<Self> {
        if framerate == 0 {
            return Err(StitchError::InvariantViolation(
                "framerate must be at least 1".to_string(),
            ));
        }

        let mut repetitions = Vec::with_capacity(durations.len());
        for (index, &duration) in durations.iter().enumerate() {
            let reps = repetitions_for(framerate, duration);
            if reps < 1 {
                return Err(StitchError::InvariantViolation(format!(
                    "frame {} lasts {}s, which is 0 frames at {} fps",
                    index, duration, framerate
                )));
            }
            repetitions.push(reps);
        }

        Ok(Self {
            framerate,
            repetitions,
        })
    }

    pub fn framerate(&self) -> u32 {
        self.framerate
    }

    pub fn repetitions(&self) -> &[u32] {
        &self.repetitions
    }

    /// Video frames emitted by one pass over the GIF.
    pub fn frames_per_cycle(&self) -> u64 {
        self.repetitions.iter().map(|&r| u64::from(r)).sum()
    }

    /// Passes needed so that `frames / framerate >= min_secs`. At least one.
    pub fn cycles_for(&self, min_secs: u32) -> u64 {
        let per_cycle = self.frames_per_cycle();
        if per_cycle == 0 {
            return 1;
        }
        let needed = u64::from(min_secs) * u64::from(self.framerate);
        needed.div_ceil(per_cycle).max(1)
    }

    pub fn total_frames(&self, min_secs: u32) -> u64 {
        self.cycles_for(min_secs) * self.frames_per_cycle()
    }

    pub fn video_duration_secs(&self, min_secs: u32) -> f64 {
        self.total_frames(min_secs) as f64 / f64::from(self.framerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_framerate_from_shortest_frame() {
        let fr = select_framerate(&[0.07, 0.07, 0.10, 3.0], DEFAULT_FRAMERATE_CORRECTIONS).unwrap();
        assert_eq!(fr, 14);
    }

    #[test]
    fn test_sixteen_fps_is_corrected() {
        assert_eq!(select_framerate(&[0.0625], DEFAULT_FRAMERATE_CORRECTIONS).unwrap(), 15);
        assert_eq!(select_framerate(&[0.0625], &[]).unwrap(), 16);
    }

    #[test]
    fn test_slow_gif_clamps_to_one_fps() {
        assert_eq!(select_framerate(&[5.0, 8.0], DEFAULT_FRAMERATE_CORRECTIONS).unwrap(), 1);
    }

    #[test]
    fn test_empty_durations_are_malformed() {
        let result = select_framerate(&[], DEFAULT_FRAMERATE_CORRECTIONS);
        assert!(matches!(result, Err(StitchError::MalformedInput(_))));
    }

    #[test]
    fn test_repetitions_and_cycles() {
        let schedule =
            FrameSchedule::from_durations(&[0.07, 0.07, 0.10, 3.0], DEFAULT_FRAMERATE_CORRECTIONS)
                .unwrap();
        assert_eq!(schedule.framerate(), 14);
        assert_eq!(schedule.repetitions(), &[1, 1, 1, 42]);
        assert_eq!(schedule.frames_per_cycle(), 45);
        // ceil(60 * 14 / 45)
        assert_eq!(schedule.cycles_for(60), 19);
        assert_eq!(schedule.total_frames(60), 855);
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        assert_eq!(repetitions_for(10, 0.25), 3);
        assert_eq!(repetitions_for(2, 0.25), 1);
    }

    #[test]
    fn test_zero_repetition_frame_is_invariant_violation() {
        let result = FrameSchedule::with_framerate(14, &[0.07, 0.001]);
        assert!(matches!(result, Err(StitchError::InvariantViolation(_))));
    }

    #[test]
    fn test_single_long_frame() {
        let schedule = FrameSchedule::from_durations(&[100.0], DEFAULT_FRAMERATE_CORRECTIONS).unwrap();
        assert_eq!(schedule.framerate(), 1);
        assert_eq!(schedule.repetitions(), &[100]);
        assert_eq!(schedule.cycles_for(60), 1);
    }

    #[test]
    fn test_identical_durations() {
        let schedule = FrameSchedule::from_durations(&[0.1; 8], DEFAULT_FRAMERATE_CORRECTIONS).unwrap();
        assert_eq!(schedule.framerate(), 10);
        assert!(schedule.repetitions().iter().all(|&r| r == 1));
        assert_eq!(schedule.cycles_for(60), 75);
        assert_eq!(schedule.video_duration_secs(60), 60.0);
    }

    #[test]
    fn test_zero_minimum_still_emits_one_cycle() {
        let schedule = FrameSchedule::from_durations(&[0.1, 0.2], DEFAULT_FRAMERATE_CORRECTIONS).unwrap();
        assert_eq!(schedule.cycles_for(0), 1);
    }

    proptest! {
        #[test]
        fn prop_schedule_reaches_minimum_with_one_spare_cycle_at_most(
            durations in prop::collection::vec(0.01f64..5.0, 1..40),
            min_secs in 1u32..300,
        ) {
            let schedule = FrameSchedule::from_durations(&durations, DEFAULT_FRAMERATE_CORRECTIONS).unwrap();
            prop_assert!(schedule.framerate() >= 1);
            prop_assert!(schedule.repetitions().iter().all(|&r| r >= 1));

            let fr = u64::from(schedule.framerate());
            let per_cycle = schedule.frames_per_cycle();
            let cycles = schedule.cycles_for(min_secs);
            prop_assert!(cycles * per_cycle >= u64::from(min_secs) * fr);
            prop_assert!((cycles - 1) * per_cycle < u64::from(min_secs) * fr);
        }
    }
}
