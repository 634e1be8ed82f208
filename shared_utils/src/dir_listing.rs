//! Directory listing in capture order.
//!
//! Callers name their images so that lexicographic order equals capture
//! order (e.g. zero-padded counters or ISO timestamps). Listing returns
//! regular files only, sorted by full path, skipping hidden entries so that
//! in-flight uploads (`.img_0042.jpg.part`) are never picked up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Sorted regular, non-hidden files directly inside `dir`.
pub fn list_sorted_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if is_hidden(&path) || !entry.file_type()?.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Sorts explicit paths the same way a directory listing would.
pub fn sort_by_name(mut files: Vec<PathBuf>) -> Vec<PathBuf> {
    files.sort();
    files
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Listing order equals sorted order of the names written.
        #[test]
        fn prop_listing_matches_sorted_names(
            names in proptest::collection::hash_set("[a-z0-9]{1,12}", 0..20)
        ) {
            let dir = TempDir::new().unwrap();
            for name in &names {
                fs::write(dir.path().join(name), b"x").unwrap();
            }
            let mut expected: Vec<PathBuf> = names.iter().map(|n| dir.path().join(n)).collect();
            expected.sort();
            prop_assert_eq!(list_sorted_files(dir.path()).unwrap(), expected);
        }
    }
}
