//! In-memory remote for tests. Records every call so tests can assert on
//! what the strategies asked the transport to do.

use super::{
    remote_file_name, remote_join, FileTransfer, RemoteEntry, RemoteSource, Session,
    TransferFailure, TransferOptions, TransferResult, Transport,
};
use crate::fs::walker::list_files;
use crate::model::{FileMask, SessionOptions};
use crate::utils::ProxyError;
use crate::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct RemoteState {
    /// Full remote path → content
    pub files: BTreeMap<String, Vec<u8>>,
    /// Remote paths whose download fails
    pub fail_get: HashSet<String>,
    /// Local file names whose upload fails
    pub fail_put: HashSet<String>,
    pub fail_open: bool,
    pub fail_listing: bool,
    pub fail_move: bool,

    pub opens: usize,
    pub closes: usize,
    /// Remote paths successfully downloaded, in order
    pub fetched: Vec<String>,
    /// `delete_source` flag of every `get_files` call
    pub get_deletes: Vec<bool>,
    /// `delete_source` flag of every `put_files` call
    pub put_deletes: Vec<bool>,
    /// (source, destination folder) of every successful move
    pub moves: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: &[&str]) -> Self {
        let transport = Self::new();
        for path in files {
            transport.add_file(path, path.as_bytes());
        }
        transport
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.state().files.insert(path.to_string(), content.to_vec());
    }

    pub fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, _options: &SessionOptions) -> Result<Box<dyn Session>> {
        let mut state = self.state();
        if state.fail_open {
            return Err(ProxyError::Session("connection refused".into()));
        }
        state.opens += 1;
        Ok(Box::new(MemorySession {
            state: self.state.clone(),
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<RemoteState>>,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }
}

impl Session for MemorySession {
    fn enumerate(&mut self, folder: &str, mask: &FileMask) -> Result<Vec<RemoteEntry>> {
        let state = self.lock();
        if state.fail_listing {
            return Err(ProxyError::Session(format!("cannot list {folder}")));
        }
        Ok(state
            .files
            .keys()
            .filter_map(|path| {
                let (parent, name) = path.rsplit_once('/')?;
                (format!("{parent}/") == folder && mask.matches(name)).then(|| RemoteEntry {
                    name: name.to_string(),
                    full_path: path.clone(),
                })
            })
            .collect())
    }

    fn get_files(
        &mut self,
        source: RemoteSource<'_>,
        local_dir: &Path,
        delete_source: bool,
        _options: &TransferOptions,
    ) -> Result<TransferResult> {
        let remote_paths = match source {
            RemoteSource::File(path) => vec![path.to_string()],
            RemoteSource::Matching { folder, mask } => self
                .enumerate(folder, mask)?
                .into_iter()
                .map(|e| e.full_path)
                .collect(),
        };

        let mut state = self.lock();
        state.get_deletes.push(delete_source);
        let mut result = TransferResult::default();
        for remote in remote_paths {
            let dest = local_dir.join(remote_file_name(&remote));
            let outcome = if state.fail_get.contains(&remote) {
                Err(TransferFailure("permission denied".into()))
            } else if let Some(data) = state.files.get(&remote).cloned() {
                std::fs::write(&dest, data).map_err(TransferFailure::from)
            } else {
                Err(TransferFailure("no such file".into()))
            };
            if outcome.is_ok() {
                state.fetched.push(remote.clone());
                if delete_source {
                    state.files.remove(&remote);
                }
            }
            result.push(FileTransfer {
                source: remote,
                destination: dest.to_string_lossy().into_owned(),
                outcome,
            });
        }
        Ok(result)
    }

    fn put_files(
        &mut self,
        local_dir: &Path,
        mask: &FileMask,
        remote_folder: &str,
        delete_source: bool,
        _options: &TransferOptions,
    ) -> Result<TransferResult> {
        let mut state = self.lock();
        state.put_deletes.push(delete_source);
        let mut result = TransferResult::default();
        for local in list_files(local_dir, mask)? {
            let name = local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dest = remote_join(remote_folder, &name);
            let outcome = if state.fail_put.contains(&name) {
                Err(TransferFailure("write failed".into()))
            } else {
                std::fs::read(&local)
                    .map(|data| {
                        state.files.insert(dest.clone(), data);
                    })
                    .map_err(TransferFailure::from)
            };
            if outcome.is_ok() && delete_source {
                std::fs::remove_file(&local)?;
            }
            result.push(FileTransfer {
                source: local.to_string_lossy().into_owned(),
                destination: dest,
                outcome,
            });
        }
        Ok(result)
    }

    fn move_remote(&mut self, source_path: &str, dest_folder: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_move {
            return Err(ProxyError::Session(format!("cannot move {source_path}")));
        }
        // A source deleted by the transfer itself has nothing left to move
        let data = state
            .files
            .remove(source_path)
            .ok_or_else(|| ProxyError::Session(format!("no such file {source_path}")))?;
        state
            .files
            .insert(remote_join(dest_folder, remote_file_name(source_path)), data);
        state
            .moves
            .push((source_path.to_string(), dest_folder.to_string()));
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.closes += 1;
        }
    }
}

/// Session options for tests; the memory transport ignores them.
pub fn test_session_options() -> SessionOptions {
    serde_json::from_str(r#"{ "host": "sftp.test", "username": "tester", "password": "pw" }"#)
        .unwrap()
}
