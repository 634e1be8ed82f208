//! Incremental timelapse encoding.
//!
//! Images arrive in a directory over time. Every `frames_per_block` of them
//! are encoded into a clip, the clip is stream-copied onto the end of a
//! single output video, and the images are deleted.

pub mod batch;
pub mod grower;

pub use batch::{ImageBatch, ScanOutcome};
pub use grower::{GrowerConfig, IncrementalGrower, IterationOutcome};
