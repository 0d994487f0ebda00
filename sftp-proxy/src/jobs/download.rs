//! Download strategies.
//!
//! - Incremental (`historyEnabled`): list the remote folder, skip names with a
//!   history marker, fetch the rest one by one. A failed file is logged and
//!   skipped; the marker is written only after the fetch succeeded.
//! - Full: fetch everything matching the remote mask in one batch call.
//!
//! In both modes a successfully downloaded remote file is then moved to the
//! configured remote archive folder, if any. A failed move is logged and does
//! not change the transfer's outcome.

use super::PathReport;
use crate::history::HistoryTracker;
use crate::model::{PathConfig, SessionOptions};
use crate::transport::{RemoteSource, Session, Transport};
use crate::Result;
use std::fs;
use tracing::{error, info, warn};

/// Run the download strategy for one path pair on its own session.
pub fn download(
    transport: &dyn Transport,
    options: &SessionOptions,
    path: &PathConfig,
) -> Result<PathReport> {
    info!(from = %path.remote_path(), to = %path.local_folder.display(), "START download");

    fs::create_dir_all(&path.local_folder)?;

    let report = if path.history_enabled {
        let history = HistoryTracker::new(&path.local_folder);
        history.ensure_dir()?;
        let mut session = transport.open(options)?;
        download_incremental(session.as_mut(), path, &history)?
    } else {
        let mut session = transport.open(options)?;
        download_full(session.as_mut(), path)?
    };

    info!(
        from = %path.remote_path(),
        to = %path.local_folder.display(),
        transferred = report.transferred.len(),
        failed = report.failed.len(),
        "END download"
    );
    Ok(report)
}

pub fn download_incremental(
    session: &mut dyn Session,
    path: &PathConfig,
    history: &HistoryTracker,
) -> Result<PathReport> {
    let known = history.known()?;
    let candidates: Vec<_> = session
        .enumerate(&path.remote_folder, &path.remote_mask)?
        .into_iter()
        .filter(|entry| !known.contains(&entry.name))
        .collect();

    let options = path.transfer_options();
    let mut report = PathReport::default();

    for entry in candidates {
        if !history.accepts(&entry.name) {
            warn!(file = %entry.full_path, "Name can not be recorded in history, skipping");
            report.failure(&entry.full_path, "name can not be recorded in history");
            continue;
        }

        let fetched = session
            .get_files(
                RemoteSource::File(&entry.full_path),
                &path.local_folder,
                path.delete_source_files,
                &options,
            )
            .and_then(|result| result.check());

        if let Err(e) = fetched {
            error!(file = %entry.full_path, error = %e, "Can not download");
            report.failure(&entry.full_path, e);
            continue;
        }

        if let Err(e) = history.mark_known(&entry.name) {
            // Without a marker the file is fetched again next run; leave the
            // remote original where that run can find it.
            error!(file = %entry.full_path, error = %e, "Downloaded but could not record history");
            report.failure(&entry.full_path, e);
            continue;
        }

        info!(file = %entry.full_path, "Download SUCCESS");
        report.success(&entry.full_path);
        move_remote_file(session, &entry.full_path, path);
    }

    Ok(report)
}

pub fn download_full(session: &mut dyn Session, path: &PathConfig) -> Result<PathReport> {
    let result = session.get_files(
        RemoteSource::Matching {
            folder: &path.remote_folder,
            mask: &path.remote_mask,
        },
        &path.local_folder,
        path.delete_source_files,
        &path.transfer_options(),
    )?;

    let mut report = PathReport::default();
    for transfer in &result.transfers {
        match &transfer.outcome {
            Ok(()) => {
                info!(file = %transfer.source, "Download SUCCESS");
                report.success(&transfer.source);
                move_remote_file(session, &transfer.source, path);
            }
            Err(e) => {
                error!(file = %transfer.source, error = %e, "Can not download");
                report.failure(&transfer.source, e);
            }
        }
    }
    Ok(report)
}

fn move_remote_file(session: &mut dyn Session, source: &str, path: &PathConfig) {
    let Some(target) = path.move_remote_to.as_deref() else {
        return;
    };
    match session.move_remote(source, target) {
        Ok(()) => info!(file = %source, to = %target, "MOVED remote file"),
        Err(e) => error!(file = %source, to = %target, error = %e, "Can not move remote file"),
    }
}
