use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

/// Sanitizes a file path for command-line usage by tools like ffmpeg and
/// gifsicle that do not support '--' as a delimiter.
///
/// A relative path starting with '-' gets a './' prefix so it is not parsed
/// as a flag.
pub fn safe_path_arg(path: &Path) -> Cow<'_, str> {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        Cow::Owned(format!("./{}", s))
    } else {
        s
    }
}

/// Absolute form of `path` without resolving symlinks. The path need not exist.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path)
}

/// File name of `path` as a string, for naming derived outputs.
pub fn file_name_string(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Directory a sibling temp file of `path` should live in, so a later rename
/// stays on the same filesystem.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_path_arg() {
        assert_eq!(safe_path_arg(Path::new("normal.mp4")), "normal.mp4");
        assert_eq!(safe_path_arg(Path::new("/abs/path.mp4")), "/abs/path.mp4");
        assert_eq!(safe_path_arg(Path::new("-dash.gif")), "./-dash.gif");
    }

    #[test]
    fn test_absolute_path_is_absolute() {
        let abs = absolute_path(Path::new("clip.mp4")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("clip.mp4"));
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("out.mp4")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/v/out.mp4")), Path::new("/v"));
    }

    #[test]
    fn test_file_name_string() {
        assert_eq!(
            file_name_string(Path::new("/a/cat.gif")).as_deref(),
            Some("cat.gif")
        );
        assert_eq!(file_name_string(Path::new("/")), None);
    }
}
