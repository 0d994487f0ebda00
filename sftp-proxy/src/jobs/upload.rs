//! Upload strategy.
//!
//! Pushes local files matching the mask to the remote folder. With backups
//! enabled, each uploaded original is first copied into the backup folder and
//! only then deleted (when deletion is requested). The transport is never
//! asked to delete while backups are active, so a failed backup copy always
//! leaves the original in place.

use super::PathReport;
use crate::fs::walker::count_files;
use crate::model::{PathConfig, SessionOptions};
use crate::transport::Transport;
use crate::Result;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Run the upload strategy for one path pair on its own session.
pub fn upload(
    transport: &dyn Transport,
    options: &SessionOptions,
    path: &PathConfig,
) -> Result<PathReport> {
    let pending = count_files(&path.local_folder, &path.local_mask)?;
    if pending == 0 {
        debug!(from = %path.local_path().display(), "Nothing to upload");
        return Ok(PathReport::default());
    }

    info!(from = %path.local_path().display(), to = %path.remote_folder, pending, "START upload");

    let mut session = transport.open(options)?;

    if let Some(dir) = &path.backup_folder {
        fs::create_dir_all(dir)?;
    }

    let result = session.put_files(
        &path.local_folder,
        &path.local_mask,
        &path.remote_folder,
        path.delete_on_put(),
        &path.transfer_options(),
    )?;

    let mut report = PathReport::default();
    for transfer in &result.transfers {
        match &transfer.outcome {
            Ok(()) => {
                info!(file = %transfer.source, "Upload SUCCESS");
                report.success(&transfer.source);
                if let Some(dir) = &path.backup_folder {
                    backup_then_delete(Path::new(&transfer.source), dir, path.delete_source_files);
                }
            }
            Err(e) => {
                error!(file = %transfer.source, error = %e, "Can not upload");
                report.failure(&transfer.source, e);
            }
        }
    }

    info!(
        from = %path.local_path().display(),
        to = %path.remote_folder,
        transferred = report.transferred.len(),
        failed = report.failed.len(),
        "END upload"
    );
    Ok(report)
}

fn backup_then_delete(source: &Path, backup_dir: &Path, delete: bool) {
    match backup_file(source, backup_dir) {
        Ok(copy) => {
            info!(file = %source.display(), backup = %copy.display(), "Backed up source file");
            if delete {
                if let Err(e) = fs::remove_file(source) {
                    error!(file = %source.display(), error = %e, "Can not delete source file after backup");
                }
            }
        }
        Err(e) => {
            error!(
                file = %source.display(),
                backup = %backup_dir.display(),
                error = %e,
                "Can not back up source file, keeping original"
            );
        }
    }
}

/// Copy `source` into `dir` under the same name. Never overwrites an
/// existing backup; a partial copy is removed.
fn backup_file(source: &Path, dir: &Path) -> io::Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;
    let dest = dir.join(name);

    let mut input = File::open(source)?;
    let mut output = OpenOptions::new().write(true).create_new(true).open(&dest)?;
    let copied = io::copy(&mut input, &mut output).and_then(|_| output.sync_all());
    if let Err(e) = copied {
        drop(output);
        let _ = fs::remove_file(&dest);
        return Err(e);
    }
    Ok(dest)
}
