use std::path::{Path, PathBuf};

/// One image of the source GIF, as exploded to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub duration_secs: f64,
    pub source_path: PathBuf,
}

/// Constant-rate image sequence ready for the encoder.
///
/// Files are `<dir>/<gif_name>.<counter:03>.gif`, counting from 0 without
/// gaps. `pattern` is the printf-style form ffmpeg's image2 demuxer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedFrameSequence {
    pub dir: PathBuf,
    pub pattern: PathBuf,
    pub frame_count: u64,
    pub framerate: u32,
}

impl ExpandedFrameSequence {
    pub fn new(dir: &Path, gif_name: &str, framerate: u32) -> Self {
        // A literal '%' in the name would be read as a format directive.
        let pattern = dir.join(format!("{}.%03d.gif", gif_name.replace('%', "%%")));
        Self {
            dir: dir.to_path_buf(),
            pattern,
            frame_count: 0,
            framerate,
        }
    }

    pub fn frame_path(&self, gif_name: &str, counter: u64) -> PathBuf {
        self.dir.join(format!("{}.{:03}.gif", gif_name, counter))
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / f64::from(self.framerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_and_frame_names() {
        let seq = ExpandedFrameSequence::new(Path::new("/w"), "cat.gif", 15);
        assert_eq!(seq.pattern, PathBuf::from("/w/cat.gif.%03d.gif"));
        assert_eq!(seq.frame_path("cat.gif", 7), PathBuf::from("/w/cat.gif.007.gif"));
        assert_eq!(seq.frame_path("cat.gif", 1234), PathBuf::from("/w/cat.gif.1234.gif"));
    }

    #[test]
    fn test_percent_in_name_is_escaped_in_pattern() {
        let seq = ExpandedFrameSequence::new(Path::new("/w"), "100%.gif", 10);
        assert_eq!(seq.pattern, PathBuf::from("/w/100%%.gif.%03d.gif"));
    }

    #[test]
    fn test_duration() {
        let mut seq = ExpandedFrameSequence::new(Path::new("/w"), "a.gif", 14);
        seq.frame_count = 840;
        assert_eq!(seq.duration_secs(), 60.0);
    }
}
