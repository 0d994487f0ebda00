//! Job runner: the entry point a schedule fire lands in.
//!
//! One run loads the job file, claims the single-flight guard, and hands each
//! path pair to the download or upload strategy in order. Errors stay inside
//! the path that raised them; nothing escapes a run except the log stream.

use super::guard::RunGuard;
use super::{download, upload, JobKind, PathReport};
use crate::model::{JobConfig, PathConfig};
use crate::transport::Transport;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, info_span};

/// Totals for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub paths_ok: usize,
    pub paths_failed: usize,
    pub files_transferred: usize,
    pub files_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every path was attempted
    Completed(RunSummary),
    /// Another run held the guard; nothing was done
    AlreadyRunning,
    /// The job file was missing or invalid; nothing was done
    ConfigUnavailable,
    /// The run panicked; the guard was released
    Aborted,
}

/// Runs one job (download or upload). Cheap to clone; clones share the guard.
#[derive(Clone)]
pub struct JobRunner {
    inner: Arc<Inner>,
}

struct Inner {
    kind: JobKind,
    config_path: PathBuf,
    transport: Arc<dyn Transport>,
    guard: RunGuard,
}

impl JobRunner {
    pub fn new(kind: JobKind, config_path: impl Into<PathBuf>, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind,
                config_path: config_path.into(),
                transport,
                guard: RunGuard::new(),
            }),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.inner.kind
    }

    pub fn config_path(&self) -> &Path {
        &self.inner.config_path
    }

    pub fn guard(&self) -> &RunGuard {
        &self.inner.guard
    }

    /// Load the job file this runner reads on every fire.
    pub fn load_config(&self) -> Result<JobConfig> {
        JobConfig::load(&self.inner.config_path)
    }

    /// Run on the blocking pool. Safe to call while another run is in flight.
    pub async fn run(&self) -> RunOutcome {
        let runner = self.clone();
        match tokio::task::spawn_blocking(move || runner.run_blocking()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job = %self.kind(), error = %e, "Job run panicked");
                RunOutcome::Aborted
            }
        }
    }

    pub fn run_blocking(&self) -> RunOutcome {
        let kind = self.kind();
        let span = info_span!("job", kind = %kind);
        let _enter = span.enter();

        let config = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                error!(
                    fatal = true,
                    config = %self.inner.config_path.display(),
                    error = %e,
                    "Job configuration can not be loaded"
                );
                return RunOutcome::ConfigUnavailable;
            }
        };

        let Some(_token) = self.inner.guard.try_acquire() else {
            info!("[{}] Previous run still in progress, skipping this one", kind.to_string().to_uppercase());
            return RunOutcome::AlreadyRunning;
        };

        let mut summary = RunSummary::default();
        for path in &config.paths {
            match self.run_path(&config, path) {
                Ok(report) => {
                    summary.paths_ok += 1;
                    summary.files_transferred += report.transferred.len();
                    summary.files_failed += report.failed.len();
                }
                Err(e) => {
                    summary.paths_failed += 1;
                    match kind {
                        JobKind::Download => error!(
                            from = %path.remote_path(),
                            to = %path.local_folder.display(),
                            error = %e,
                            "Can not download files from remote"
                        ),
                        JobKind::Upload => error!(
                            from = %path.local_path().display(),
                            to = %path.remote_folder,
                            error = %e,
                            "Can not upload files to remote"
                        ),
                    }
                }
            }
        }

        info!(
            paths_ok = summary.paths_ok,
            paths_failed = summary.paths_failed,
            files_transferred = summary.files_transferred,
            files_failed = summary.files_failed,
            "Run finished"
        );
        RunOutcome::Completed(summary)
    }

    fn run_path(&self, config: &JobConfig, path: &PathConfig) -> Result<PathReport> {
        let transport = self.inner.transport.as_ref();
        match self.kind() {
            JobKind::Download => download::download(transport, &config.session, path),
            JobKind::Upload => upload::upload(transport, &config.session, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryTransport;
    use std::fs;
    use tempfile::TempDir;

    fn write_job(dir: &Path, paths: &str) -> PathBuf {
        let job = dir.join("job.json");
        fs::write(
            &job,
            format!(
                r#"{{ "session": {{ "host": "sftp.test", "username": "u", "password": "p" }},
                      "paths": [{paths}] }}"#
            ),
        )
        .unwrap();
        job
    }

    fn download_path(local: &Path) -> String {
        format!(
            r#"{{ "remoteFolder": "out", "remoteMask": "*.txt", "localFolder": {:?}, "historyEnabled": true }}"#,
            local.to_string_lossy()
        )
    }

    fn runner(kind: JobKind, job: &Path, transport: &MemoryTransport) -> JobRunner {
        JobRunner::new(kind, job, Arc::new(transport.clone()))
    }

    #[test]
    fn test_history_run_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("in");
        let job = write_job(temp.path(), &download_path(&local));
        let transport = MemoryTransport::with_files(&["/out/a.txt", "/out/b.txt"]);
        let runner = runner(JobKind::Download, &job, &transport);

        match runner.run_blocking() {
            RunOutcome::Completed(s) => assert_eq!(s.files_transferred, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(local.join("hist/a.txt").is_file());
        assert!(local.join("hist/b.txt").is_file());

        match runner.run_blocking() {
            RunOutcome::Completed(s) => assert_eq!(s.files_transferred, 0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.state().fetched.len(), 2);
        assert!(!runner.guard().is_running());
    }

    #[test]
    fn test_busy_guard_skips_without_io() {
        let temp = TempDir::new().unwrap();
        let job = write_job(temp.path(), &download_path(&temp.path().join("in")));
        let transport = MemoryTransport::with_files(&["/out/a.txt"]);
        let runner = runner(JobKind::Download, &job, &transport);

        let token = runner.guard().try_acquire().unwrap();
        assert_eq!(runner.clone().run_blocking(), RunOutcome::AlreadyRunning);
        assert_eq!(transport.state().opens, 0);
        drop(token);

        assert!(matches!(runner.run_blocking(), RunOutcome::Completed(_)));
        assert_eq!(transport.state().opens, 1);
    }

    #[test]
    fn test_missing_config_is_fatal_for_the_run() {
        let temp = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        let runner = runner(JobKind::Upload, &temp.path().join("absent.json"), &transport);

        assert_eq!(runner.run_blocking(), RunOutcome::ConfigUnavailable);
        assert!(!runner.guard().is_running());
        assert_eq!(transport.state().opens, 0);
    }

    #[test]
    fn test_failing_path_does_not_stop_siblings() {
        let temp = TempDir::new().unwrap();
        // a regular file where a directory is needed makes the first path fail locally
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let good = temp.path().join("good");
        let paths = format!("{},{}", download_path(&blocker.join("sub")), download_path(&good));
        let job = write_job(temp.path(), &paths);
        let transport = MemoryTransport::with_files(&["/out/a.txt"]);
        let runner = runner(JobKind::Download, &job, &transport);

        match runner.run_blocking() {
            RunOutcome::Completed(s) => {
                assert_eq!(s.paths_failed, 1);
                assert_eq!(s.paths_ok, 1);
                assert_eq!(s.files_transferred, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(good.join("a.txt").is_file());
    }

    #[test]
    fn test_session_failure_is_contained() {
        let temp = TempDir::new().unwrap();
        let job = write_job(temp.path(), &download_path(&temp.path().join("in")));
        let transport = MemoryTransport::with_files(&["/out/a.txt"]);
        transport.state().fail_open = true;
        let runner = runner(JobKind::Download, &job, &transport);

        match runner.run_blocking() {
            RunOutcome::Completed(s) => assert_eq!(s.paths_failed, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!runner.guard().is_running());
    }

    #[test]
    fn test_upload_job_pushes_files() {
        let temp = TempDir::new().unwrap();
        let outbox = temp.path().join("outbox");
        fs::create_dir(&outbox).unwrap();
        fs::write(outbox.join("a.csv"), b"a").unwrap();
        let paths = format!(
            r#"{{ "remoteFolder": "in", "localFolder": {:?}, "localMask": "*.csv" }}"#,
            outbox.to_string_lossy()
        );
        let job = write_job(temp.path(), &paths);
        let transport = MemoryTransport::new();
        let runner = runner(JobKind::Upload, &job, &transport);

        match runner.run_blocking() {
            RunOutcome::Completed(s) => assert_eq!(s.files_transferred, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(transport.state().files.contains_key("/in/a.csv"));
    }

    #[tokio::test]
    async fn test_async_run_uses_blocking_pool() {
        let temp = TempDir::new().unwrap();
        let job = write_job(temp.path(), &download_path(&temp.path().join("in")));
        let transport = MemoryTransport::with_files(&["/out/a.txt"]);
        let runner = runner(JobKind::Download, &job, &transport);

        let (first, second) = tokio::join!(runner.run(), runner.run());
        let completed = [&first, &second]
            .iter()
            .filter(|o| matches!(o, RunOutcome::Completed(_)))
            .count();
        let skipped = [&first, &second]
            .iter()
            .filter(|o| matches!(o, RunOutcome::AlreadyRunning))
            .count();
        // the runs may or may not overlap, but never both transfer the same file
        assert!(completed >= 1 && completed + skipped == 2);
        assert_eq!(transport.state().fetched, vec!["/out/a.txt"]);
    }
}
