//! Host-facing service: owns the download and upload runners and the
//! scheduler that fires them.

use crate::config::Config;
use crate::jobs::{JobKind, JobRunner, RunOutcome};
use crate::scheduler::TransferScheduler;
use crate::transport::Transport;
use crate::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct TransferService {
    download: Option<JobRunner>,
    upload: Option<JobRunner>,
    scheduler: Option<TransferScheduler>,
}

impl TransferService {
    /// Runners are only created for jobs enabled in `config`.
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let download = config
            .download
            .enabled
            .then(|| JobRunner::new(JobKind::Download, &config.download.config, transport.clone()));
        let upload = config
            .upload
            .enabled
            .then(|| JobRunner::new(JobKind::Upload, &config.upload.config, transport.clone()));
        Self {
            download,
            upload,
            scheduler: None,
        }
    }

    /// Run the download job now. `None` when the job is disabled.
    pub async fn run_download_job(&self) -> Option<RunOutcome> {
        Some(self.download.as_ref()?.run().await)
    }

    /// Run the upload job now. `None` when the job is disabled.
    pub async fn run_upload_job(&self) -> Option<RunOutcome> {
        Some(self.upload.as_ref()?.run().await)
    }

    fn runners(&self) -> impl Iterator<Item = &JobRunner> {
        self.download.iter().chain(self.upload.iter())
    }

    /// Schedule every enabled job whose file loads, then start firing.
    ///
    /// Returns the number of jobs scheduled. A job whose file cannot be read
    /// is logged and left unscheduled; the other job still starts.
    pub async fn start(&mut self) -> Result<usize> {
        if self.download.is_none() && self.upload.is_none() {
            info!("Neither download nor upload job enabled");
            return Ok(0);
        }

        let scheduler = TransferScheduler::new().await?;
        let mut count = 0;
        for runner in self.runners() {
            let config = match runner.load_config() {
                Ok(config) => config,
                Err(e) => {
                    error!(
                        fatal = true,
                        job = %runner.kind(),
                        config = %runner.config_path().display(),
                        error = %e,
                        "Job configuration can not be loaded, job not scheduled"
                    );
                    continue;
                }
            };
            match scheduler
                .schedule_job(Arc::new(runner.clone()), &config.schedule)
                .await
            {
                Ok(id) => {
                    count += 1;
                    if let Ok(Some(at)) = scheduler.next_fire(id).await {
                        info!(job = %runner.kind(), next = %at, "Next scheduled run");
                    }
                }
                Err(e) => error!(job = %runner.kind(), error = %e, "Failed to schedule job"),
            }
        }

        scheduler.start().await?;
        info!(count, "Schedules initialized");
        self.scheduler = Some(scheduler);
        Ok(count)
    }

    /// Stop scheduling and wait for running jobs to finish.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(scheduler) = self.scheduler.take() else {
            return Ok(());
        };
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Scheduler shutdown error");
            return Err(e);
        }
        info!("Scheduler stopped");
        Ok(())
    }
}
