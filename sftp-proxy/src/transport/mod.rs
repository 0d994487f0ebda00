//! Transfer transport: the only boundary between the job strategies and the
//! remote server.
//!
//! A [`Transport`] opens [`Session`]s. A session is closed when it is dropped,
//! so every exit from a path's handling releases the connection.

#[cfg(test)]
pub mod memory;
pub mod sftp;

use crate::model::{FileMask, SessionOptions};
use crate::utils::ProxyError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use sftp::SftpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    #[serde(alias = "Binary")]
    Binary,
    /// Line endings converted to the receiving side's convention
    #[serde(alias = "Text", alias = "ascii")]
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub mode: TransferMode,
    pub preserve_timestamp: bool,
}

/// A regular file found on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub full_path: String,
}

/// What to fetch in a `get_files` call.
#[derive(Debug, Clone, Copy)]
pub enum RemoteSource<'a> {
    /// One file by full remote path
    File(&'a str),
    /// Every regular file in `folder` whose name matches `mask`
    Matching { folder: &'a str, mask: &'a FileMask },
}

/// Why one file in a batch did not transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure(pub String);

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<std::io::Error> for TransferFailure {
    fn from(err: std::io::Error) -> Self {
        TransferFailure(err.to_string())
    }
}

impl From<ssh2::Error> for TransferFailure {
    fn from(err: ssh2::Error) -> Self {
        TransferFailure(err.to_string())
    }
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    /// Path the file was read from (remote path on download, local on upload)
    pub source: String,
    /// Path the file was written to
    pub destination: String,
    pub outcome: std::result::Result<(), TransferFailure>,
}

impl FileTransfer {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-file outcomes of one `get_files` / `put_files` call.
#[derive(Debug, Clone, Default)]
pub struct TransferResult {
    pub transfers: Vec<FileTransfer>,
}

impl TransferResult {
    pub fn push(&mut self, transfer: FileTransfer) {
        self.transfers.push(transfer);
    }

    pub fn successes(&self) -> impl Iterator<Item = &FileTransfer> {
        self.transfers.iter().filter(|t| t.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileTransfer> {
        self.transfers.iter().filter(|t| !t.is_success())
    }

    /// Fail with the first per-file failure, if any.
    pub fn check(&self) -> Result<()> {
        match self.failures().next() {
            Some(failed) => Err(ProxyError::Transfer {
                file: failed.source.clone(),
                reason: failed
                    .outcome
                    .as_ref()
                    .err()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            }),
            None => Ok(()),
        }
    }
}

/// Opens sessions to a remote endpoint.
pub trait Transport: Send + Sync {
    fn open(&self, options: &SessionOptions) -> Result<Box<dyn Session>>;
}

/// An open connection. Dropping it closes the connection.
pub trait Session {
    /// Regular files directly inside `folder` whose names match `mask`.
    fn enumerate(&mut self, folder: &str, mask: &FileMask) -> Result<Vec<RemoteEntry>>;

    /// Download into `local_dir`. `delete_source` removes each remote file
    /// right after it transferred. Listing errors fail the whole call;
    /// per-file errors are reported in the result.
    fn get_files(
        &mut self,
        source: RemoteSource<'_>,
        local_dir: &Path,
        delete_source: bool,
        options: &TransferOptions,
    ) -> Result<TransferResult>;

    /// Upload files directly inside `local_dir` matching `mask` into
    /// `remote_folder`. Same error contract as [`Session::get_files`].
    fn put_files(
        &mut self,
        local_dir: &Path,
        mask: &FileMask,
        remote_folder: &str,
        delete_source: bool,
        options: &TransferOptions,
    ) -> Result<TransferResult>;

    /// Move `source_path` into `dest_folder` (ends with `/`), keeping its name.
    fn move_remote(&mut self, source_path: &str, dest_folder: &str) -> Result<()>;
}

/// Last component of a `/`-separated remote path.
pub fn remote_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `folder` and `name` joined with exactly one `/`.
pub fn remote_join(folder: &str, name: &str) -> String {
    if folder.ends_with('/') {
        format!("{folder}{name}")
    } else {
        format!("{folder}/{name}")
    }
}

/// Convert line endings for text-mode transfers.
pub(crate) fn convert_text(data: Vec<u8>, to_crlf: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().peekable();
    while let Some(&b) = bytes.next() {
        match b {
            b'\r' if bytes.peek() == Some(&&b'\n') => {}
            b'\n' if to_crlf => out.extend_from_slice(b"\r\n"),
            _ => out.push(b),
        }
    }
    out
}
