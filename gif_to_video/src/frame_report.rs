//! Parsing of the `gifsicle --info` report.
//!
//! Each image in the report carries a line such as
//!
//! ```text
//!   + image #3 120x80 transparent 255
//!     disposal asis delay 0.07s
//! ```
//!
//! Only lines containing `disposal asis delay <seconds>s` contribute a frame.
//! Each delay belongs to the `+ image #N` header above it, and image `N` is
//! the file `<name>.NNN` gifsicle writes when exploding the same GIF.

use crate::frame::Frame;
use shared_utils::{Result, StitchError};
use std::path::Path;
use tracing::warn;

const DELAY_MARKER: &str = "disposal asis delay ";
const IMAGE_MARKER: &str = "+ image #";

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    durations: Vec<f64>,
    /// Image number of each duration, as gifsicle numbers exploded files.
    image_indices: Vec<usize>,
}

/// `N` from a `+ image #N ...` header line.
fn image_header_index(line: &str) -> Option<usize> {
    let rest = line.trim_start().strip_prefix(IMAGE_MARKER)?;
    let digits: &str = rest.split(|c: char| !c.is_ascii_digit()).next()?;
    digits.parse().ok()
}

impl FrameReport {
    /// Collects one duration per matching line, in report order.
    pub fn parse(report: &str) -> Result<Self> {
        let mut durations = Vec::new();
        let mut image_indices = Vec::new();
        let mut current_image: Option<usize> = None;
        let mut current_has_delay = false;
        let mut without_delay = Vec::new();

        for (line_no, line) in report.lines().enumerate() {
            if let Some(index) = image_header_index(line) {
                if let Some(prev) = current_image.filter(|_| !current_has_delay) {
                    without_delay.push(prev);
                }
                current_image = Some(index);
                current_has_delay = false;
                continue;
            }

            let Some(start) = line.find(DELAY_MARKER) else {
                continue;
            };
            let rest = &line[start + DELAY_MARKER.len()..];
            // Greedy up to the last 's' on the line.
            let Some(end) = rest.rfind('s') else {
                continue;
            };
            let value = rest[..end].trim();

            let secs: f64 = value.parse().map_err(|_| {
                StitchError::MalformedInput(format!(
                    "line {}: unparseable frame delay {:?}",
                    line_no + 1,
                    value
                ))
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(StitchError::MalformedInput(format!(
                    "line {}: frame delay must be a positive number of seconds, got {}",
                    line_no + 1,
                    value
                )));
            }
            durations.push(secs);
            // Reports without headers fall back to counting delay lines.
            image_indices.push(current_image.unwrap_or(image_indices.len()));
            current_has_delay = true;
        }
        if let Some(last) = current_image.filter(|_| !current_has_delay) {
            without_delay.push(last);
        }

        if durations.is_empty() {
            return Err(StitchError::MalformedInput(
                "no frame delays found in GIF info report".to_string(),
            ));
        }
        if !without_delay.is_empty() {
            warn!(
                images = ?without_delay,
                "GIF images without an 'asis' delay line are left out of the video"
            );
        }

        Ok(Self {
            durations,
            image_indices,
        })
    }

    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    pub fn image_indices(&self) -> &[usize] {
        &self.image_indices
    }

    pub fn frame_count(&self) -> usize {
        self.durations.len()
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.durations.iter().sum()
    }

    /// Pairs every duration with the file gifsicle exploded its image into,
    /// `<explode_dir>/<gif_name>.<image:03>`.
    pub fn frames(&self, explode_dir: &Path, gif_name: &str) -> Vec<Frame> {
        self.durations
            .iter()
            .zip(&self.image_indices)
            .map(|(&duration_secs, &index)| Frame {
                index,
                duration_secs,
                source_path: explode_dir.join(format!("{}.{:03}", gif_name, index)),
            })
            .collect()
    }
}
