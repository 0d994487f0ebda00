//! SFTP transport on top of `ssh2` (blocking).
//!
//! Callers run on `spawn_blocking`; nothing in here touches the async runtime.

use super::{
    convert_text, remote_file_name, remote_join, FileTransfer, RemoteEntry, RemoteSource, Session,
    TransferFailure, TransferMode, TransferOptions, TransferResult, Transport,
};
use crate::fs::walker::list_files;
use crate::model::{FileMask, SessionOptions};
use crate::utils::ProxyError;
use crate::Result;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Suffix used while a download is in progress.
const PARTIAL_SUFFIX: &str = ".filepart";

#[derive(Debug, Default, Clone, Copy)]
pub struct SftpTransport;

impl SftpTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SftpTransport {
    fn open(&self, options: &SessionOptions) -> Result<Box<dyn Session>> {
        let tcp = connect(options)?;
        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(options.timeout().as_millis().min(u32::MAX as u128) as u32);
        session.handshake()?;

        verify_host_key(&session, options)?;
        authenticate(&session, options)?;

        let sftp = session.sftp()?;
        tracing::debug!(endpoint = %options.endpoint(), "SFTP session opened");
        Ok(Box::new(SftpSession { session, sftp }))
    }
}

fn connect(options: &SessionOptions) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in (options.host.as_str(), options.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, options.timeout()) {
            Ok(tcp) => {
                tcp.set_read_timeout(Some(options.timeout()))?;
                tcp.set_write_timeout(Some(options.timeout()))?;
                return Ok(tcp);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => ProxyError::Io(e),
        None => ProxyError::Session(format!("{} did not resolve", options.host)),
    })
}

fn verify_host_key(session: &ssh2::Session, options: &SessionOptions) -> Result<()> {
    let Some(expected) = options.host_key_sha256.as_deref() else {
        return Ok(());
    };
    let actual = session
        .host_key_hash(ssh2::HashType::Sha256)
        .map(hex)
        .ok_or_else(|| ProxyError::Session("server sent no host key".into()))?;

    let expected: String = expected
        .chars()
        .filter(|c| *c != ':')
        .collect::<String>()
        .to_ascii_lowercase();
    if actual != expected {
        return Err(ProxyError::Authentication(format!(
            "host key mismatch for {}: expected {expected}, got {actual}",
            options.host
        )));
    }
    Ok(())
}

fn authenticate(session: &ssh2::Session, options: &SessionOptions) -> Result<()> {
    if let Some(key) = options.private_key_path.as_deref() {
        session
            .userauth_pubkey_file(&options.username, None, key, options.passphrase.as_deref())
            .map_err(|e| ProxyError::Authentication(format!("public key: {e}")))?;
    } else if let Some(password) = options.password.as_deref() {
        session
            .userauth_password(&options.username, password)
            .map_err(|e| ProxyError::Authentication(format!("password: {e}")))?;
    } else {
        return Err(ProxyError::Authentication(
            "neither password nor private key configured".into(),
        ));
    }

    if !session.authenticated() {
        return Err(ProxyError::Authentication(format!(
            "server rejected {}",
            options.endpoint()
        )));
    }
    Ok(())
}

fn write_partial(
    source: &mut ssh2::File,
    stat: &ssh2::FileStat,
    partial: &Path,
    options: &TransferOptions,
) -> std::result::Result<(), TransferFailure> {
    let mut out = File::create(partial)?;
    match options.mode {
        TransferMode::Binary => {
            io::copy(source, &mut out)?;
        }
        TransferMode::Text => {
            let mut data = Vec::new();
            source.read_to_end(&mut data)?;
            out.write_all(&convert_text(data, cfg!(windows)))?;
        }
    }
    if options.preserve_timestamp {
        if let Some(mtime) = stat.mtime {
            out.set_modified(UNIX_EPOCH + Duration::from_secs(mtime))?;
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

struct SftpSession {
    session: ssh2::Session,
    sftp: ssh2::Sftp,
}

impl SftpSession {
    fn fetch(
        &self,
        remote: &str,
        local_dir: &Path,
        delete_source: bool,
        options: &TransferOptions,
    ) -> std::result::Result<String, TransferFailure> {
        let name = remote_file_name(remote);
        let dest = local_dir.join(name);
        let partial = local_dir.join(format!("{name}{PARTIAL_SUFFIX}"));

        let mut source = self.sftp.open(Path::new(remote))?;
        let stat = source.stat()?;
        let written = write_partial(&mut source, &stat, &partial, options);
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &dest)?;

        if delete_source {
            if let Err(e) = self.sftp.unlink(Path::new(remote)) {
                tracing::error!(file = %remote, error = %e, "Downloaded but could not delete remote source");
            }
        }
        Ok(dest.to_string_lossy().into_owned())
    }

    fn push(
        &self,
        local: &Path,
        remote_folder: &str,
        delete_source: bool,
        options: &TransferOptions,
    ) -> std::result::Result<String, TransferFailure> {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferFailure(format!("{} has no file name", local.display())))?;
        let dest = remote_join(remote_folder, &name);

        let mut source = File::open(local)?;
        let modified = source.metadata()?.modified()?;
        {
            let mut out = self.sftp.create(Path::new(&dest))?;
            match options.mode {
                TransferMode::Binary => {
                    io::copy(&mut source, &mut out)?;
                }
                TransferMode::Text => {
                    let mut data = Vec::new();
                    source.read_to_end(&mut data)?;
                    out.write_all(&convert_text(data, false))?;
                }
            }
        }

        if options.preserve_timestamp {
            let secs = modified
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let stat = ssh2::FileStat {
                size: None,
                uid: None,
                gid: None,
                perm: None,
                atime: Some(secs),
                mtime: Some(secs),
            };
            if let Err(e) = self.sftp.setstat(Path::new(&dest), stat) {
                tracing::warn!(file = %dest, error = %e, "Could not preserve remote timestamp");
            }
        }

        drop(source);
        if delete_source {
            if let Err(e) = fs::remove_file(local) {
                tracing::error!(file = %local.display(), error = %e, "Uploaded but could not delete local source");
            }
        }
        Ok(dest)
    }
}

impl Session for SftpSession {
    fn enumerate(&mut self, folder: &str, mask: &FileMask) -> Result<Vec<RemoteEntry>> {
        let mut entries: Vec<RemoteEntry> = self
            .sftp
            .readdir(Path::new(folder))?
            .into_iter()
            .filter(|(_, stat)| stat.is_file())
            .filter_map(|(path, _)| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                mask.matches(&name).then(|| RemoteEntry {
                    full_path: remote_join(folder, &name),
                    name,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn get_files(
        &mut self,
        source: RemoteSource<'_>,
        local_dir: &Path,
        delete_source: bool,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        let remote_paths = match source {
            RemoteSource::File(path) => vec![path.to_string()],
            RemoteSource::Matching { folder, mask } => self
                .enumerate(folder, mask)?
                .into_iter()
                .map(|e| e.full_path)
                .collect(),
        };

        let mut result = TransferResult::default();
        for remote in remote_paths {
            let outcome = self.fetch(&remote, local_dir, delete_source, options);
            result.push(FileTransfer {
                destination: local_dir
                    .join(remote_file_name(&remote))
                    .to_string_lossy()
                    .into_owned(),
                source: remote,
                outcome: outcome.map(|_| ()),
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
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        let mut result = TransferResult::default();
        for local in list_files(local_dir, mask)? {
            let outcome = self.push(&local, remote_folder, delete_source, options);
            let name = local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            result.push(FileTransfer {
                source: local.to_string_lossy().into_owned(),
                destination: remote_join(remote_folder, &name),
                outcome: outcome.map(|_| ()),
            });
        }
        Ok(result)
    }

    fn move_remote(&mut self, source_path: &str, dest_folder: &str) -> Result<()> {
        let target = remote_join(dest_folder, remote_file_name(source_path));
        self.sftp
            .rename(Path::new(source_path), Path::new(&target), None)?;
        Ok(())
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "sftp-proxy done", None) {
            tracing::debug!(error = %e, "SFTP disconnect failed");
        }
    }
}
