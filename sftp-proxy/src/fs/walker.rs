//! Listing of local source folders.
//!
//! Upload folders are flat: only regular files directly inside the folder are
//! considered, and their names are matched against the configured mask.

use crate::model::FileMask;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files directly inside `dir` whose names match `mask`, sorted by name.
///
/// A missing folder yields an empty list.
///
/// # Example
/// ```no_run
/// use sftp_proxy::fs::walker::list_files;
/// use sftp_proxy::model::FileMask;
/// use std::path::Path;
///
/// let mask = FileMask::new("*.csv").unwrap();
/// let files = list_files(Path::new("/data/outbox"), &mask).unwrap();
/// println!("{} files to upload", files.len());
/// ```
pub fn list_files(dir: &Path, mask: &FileMask) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;

        // Symlinks count when they point at a regular file
        if !entry.path().is_file() {
            continue;
        }

        if mask.matches(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Count matching files in `dir` (0 when the folder does not exist).
pub fn count_files(dir: &Path, mask: &FileMask) -> std::io::Result<usize> {
    Ok(list_files(dir, mask)?.len())
}
