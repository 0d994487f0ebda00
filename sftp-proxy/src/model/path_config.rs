//! One local ⇄ remote folder pairing and its transfer policy.

use super::mask::FileMask;
use crate::transport::{TransferMode, TransferOptions};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path pair as written in the job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathConfigFile {
    pub remote_folder: String,
    pub remote_mask: String,
    pub local_folder: PathBuf,
    pub local_mask: String,
    pub transfer_mode: TransferMode,
    #[serde(default = "default_true")]
    pub preserve_timestamp: bool,
    pub delete_source_files: bool,
    pub history_enabled: bool,
    pub move_remote_files: bool,
    pub move_remote_files_to: Option<String>,
    pub backup_source_files_folder: Option<String>,
    pub backup_source_files: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PathConfigFile {
    fn default() -> Self {
        Self {
            remote_folder: String::new(),
            remote_mask: String::new(),
            local_folder: PathBuf::new(),
            local_mask: String::new(),
            transfer_mode: TransferMode::Binary,
            preserve_timestamp: true,
            delete_source_files: false,
            history_enabled: false,
            move_remote_files: false,
            move_remote_files_to: None,
            backup_source_files_folder: None,
            backup_source_files: false,
        }
    }
}

/// Normalized, immutable path pair.
///
/// Built once when the job file is loaded; every derived value (slashes on
/// the remote folder, the move target, the backup folder) is fixed here.
#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    /// Always starts and ends with `/`
    pub remote_folder: String,
    pub remote_mask: FileMask,
    pub local_folder: PathBuf,
    pub local_mask: FileMask,
    pub transfer_mode: TransferMode,
    pub preserve_timestamp: bool,
    /// Delete the source once it has been transferred (and backed up, for uploads)
    pub delete_source_files: bool,
    /// Incremental download via `hist/` markers
    pub history_enabled: bool,
    /// Remote folder (ending with `/`) that downloaded originals are moved to
    pub move_remote_to: Option<String>,
    /// Folder that uploaded local originals are copied to
    pub backup_folder: Option<PathBuf>,
}

impl PathConfig {
    pub fn from_file(raw: PathConfigFile) -> Result<Self> {
        let move_remote_to = raw
            .move_remote_files_to
            .as_deref()
            .map(str::trim)
            .filter(|to| raw.move_remote_files && !to.is_empty())
            .map(with_trailing_slash);

        let backup_folder = raw
            .backup_source_files_folder
            .as_deref()
            .map(str::trim)
            .filter(|folder| raw.backup_source_files && !folder.is_empty())
            .map(|folder| raw.local_folder.join(folder));

        Ok(Self {
            remote_folder: normalize_remote_folder(&raw.remote_folder),
            remote_mask: FileMask::new(&raw.remote_mask)?,
            local_mask: FileMask::new(&raw.local_mask)?,
            local_folder: raw.local_folder,
            transfer_mode: raw.transfer_mode,
            preserve_timestamp: raw.preserve_timestamp,
            delete_source_files: raw.delete_source_files,
            history_enabled: raw.history_enabled,
            move_remote_to,
            backup_folder,
        })
    }

    /// Remote folder plus mask, e.g. `/outbox/*.csv`.
    pub fn remote_path(&self) -> String {
        format!("{}{}", self.remote_folder, self.remote_mask)
    }

    /// Local folder plus mask, for log lines.
    pub fn local_path(&self) -> PathBuf {
        self.local_folder.join(self.local_mask.as_str())
    }

    pub fn backup_active(&self) -> bool {
        self.backup_folder.is_some()
    }

    /// Delete flag handed to the transport on upload.
    ///
    /// Suppressed while backups are active: the original may only go away
    /// after its backup copy exists, which the upload strategy handles itself.
    pub fn delete_on_put(&self) -> bool {
        self.delete_source_files && !self.backup_active()
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            mode: self.transfer_mode,
            preserve_timestamp: self.preserve_timestamp,
        }
    }
}

fn normalize_remote_folder(folder: &str) -> String {
    let folder = folder.trim();
    let mut out = String::with_capacity(folder.len() + 2);
    if !folder.starts_with('/') {
        out.push('/');
    }
    out.push_str(folder);
    with_trailing_slash(&out)
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}
