//! Download history for incremental transfers.
//!
//! Every remote file fetched in incremental mode leaves a zero-byte marker
//! named after it in `<local folder>/hist/`. A file with a marker is never
//! fetched again for that folder. Markers are never removed by the service.

use crate::utils::ProxyError;
use crate::Result;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the marker directory below each history-enabled local folder.
pub const HISTORY_DIR_NAME: &str = "hist";

pub fn history_dir(local_folder: &Path) -> PathBuf {
    local_folder.join(HISTORY_DIR_NAME)
}

/// Marker set for one local folder.
#[derive(Debug, Clone)]
pub struct HistoryTracker {
    dir: PathBuf,
}

impl HistoryTracker {
    pub fn new(local_folder: &Path) -> Self {
        Self {
            dir: history_dir(local_folder),
        }
    }

    /// Create the marker directory if needed and hide it where the platform
    /// has a hidden attribute.
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)?;
            hide(&self.dir);
            tracing::debug!(dir = %self.dir.display(), "Created history directory");
        }
        Ok(())
    }

    /// Whether `file_name` can be stored as a marker on this platform.
    pub fn accepts(&self, file_name: &str) -> bool {
        is_plain_name(file_name)
    }

    pub fn is_known(&self, file_name: &str) -> Result<bool> {
        Ok(self.marker(file_name)?.is_file())
    }

    /// Record `file_name` as downloaded. Marking twice is fine.
    pub fn mark_known(&self, file_name: &str) -> Result<()> {
        let marker = self.marker(file_name)?;
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(marker)?;
        Ok(())
    }

    /// All recorded names, read in one directory pass.
    pub fn known(&self) -> Result<HashSet<String>> {
        let mut names = HashSet::new();
        if !self.dir.is_dir() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    fn marker(&self, file_name: &str) -> Result<PathBuf> {
        if !is_plain_name(file_name) {
            return Err(ProxyError::InvalidHistoryName(file_name.to_string()));
        }
        Ok(self.dir.join(file_name))
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !(cfg!(windows) && name.contains('\\'))
        && !name.contains('\0')
}

#[cfg(windows)]
fn hide(dir: &Path) {
    let status = std::process::Command::new("attrib")
        .arg("+H")
        .arg(dir)
        .status();
    if !matches!(status, Ok(s) if s.success()) {
        tracing::debug!(dir = %dir.display(), "Could not set hidden attribute");
    }
}

#[cfg(not(windows))]
fn hide(_dir: &Path) {}
