//! GIF to constant-framerate video.
//!
//! GIF frames carry individual delays; most video containers want one
//! framerate. This crate picks a framerate from the shortest delay, repeats
//! each frame enough times to keep its on-screen duration, loops the result
//! to a minimum length and hands the image sequence to ffmpeg.

pub mod expand;
pub mod frame;
pub mod frame_report;
pub mod normalizer;
pub mod schedule;
pub mod tools;

pub use frame::{ExpandedFrameSequence, Frame};
pub use frame_report::FrameReport;
pub use normalizer::{GifNormalizer, NormalizerConfig};
pub use schedule::{select_framerate, FrameSchedule};
pub use tools::{FfmpegSequenceEncoder, GifDecomposer, Gifsicle, SequenceEncoder};
