//! Schedule engine.
//!
//! Cron jobs are registered with `tokio-cron-scheduler`. Interval jobs run on
//! a tokio ticker that skips missed ticks, so a stalled process resumes its
//! cadence instead of replaying or losing fires. Every job additionally fires
//! once right after [`TransferScheduler::start`]. Every fire is tracked so
//! shutdown can wait for in-flight runs.

pub mod schedule;

use crate::jobs::JobRunner;
use crate::Result;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

pub use schedule::{Schedule, MAX_INTERVAL};

/// Something the scheduler can fire.
pub trait ScheduledJob: Send + Sync + 'static {
    fn name(&self) -> String;
    fn fire(&self) -> BoxFuture<'static, ()>;
}

impl ScheduledJob for JobRunner {
    fn name(&self) -> String {
        self.kind().to_string()
    }

    fn fire(&self) -> BoxFuture<'static, ()> {
        let runner = self.clone();
        Box::pin(async move {
            runner.run().await;
        })
    }
}

type NextTicks = Arc<Mutex<HashMap<Uuid, Option<DateTime<Utc>>>>>;

pub struct TransferScheduler {
    scheduler: Mutex<JobScheduler>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    startup: Mutex<Vec<Arc<dyn ScheduledJob>>>,
    intervals: Mutex<Vec<(Uuid, Arc<dyn ScheduledJob>, Duration)>>,
    next_ticks: NextTicks,
}

impl TransferScheduler {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            startup: Mutex::new(Vec::new()),
            intervals: Mutex::new(Vec::new()),
            next_ticks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn schedule_job(&self, job: Arc<dyn ScheduledJob>, schedule: &Schedule) -> Result<Uuid> {
        let id = match schedule {
            Schedule::Cron(expr) => {
                let (job, tracker) = (job.clone(), self.tracker.clone());
                let trigger =
                    Job::new_async(expr.as_str(), move |_uuid, _lock| fire_tracked(&job, &tracker))?;
                self.scheduler.lock().await.add(trigger).await?
            }
            Schedule::Interval(every) => {
                let every = bounded(*every);
                let id = Uuid::new_v4();
                self.next_ticks.lock().await.insert(id, after(every));
                self.intervals.lock().await.push((id, job.clone(), every));
                id
            }
        };

        tracing::info!(job = %job.name(), schedule = %schedule, "Job scheduled");
        self.startup.lock().await.push(job);
        Ok(id)
    }

    /// Start firing, and run every scheduled job once right away.
    pub async fn start(&self) -> Result<()> {
        self.scheduler.lock().await.start().await?;

        for (id, job, every) in self.intervals.lock().await.drain(..) {
            self.spawn_ticker(id, job, every);
        }
        for job in self.startup.lock().await.drain(..) {
            tracing::info!(job = %job.name(), "Initial run at startup");
            self.tracker.spawn(job.fire());
        }
        Ok(())
    }

    fn spawn_ticker(&self, id: Uuid, job: Arc<dyn ScheduledJob>, every: Duration) {
        let tracker = self.tracker.clone();
        let cancel = self.cancel.clone();
        let next_ticks = self.next_ticks.clone();

        self.tracker.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tracker.spawn(job.fire());
                        next_ticks.lock().await.insert(id, after(every));
                    }
                }
            }
        });
    }

    pub async fn next_fire(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        if let Some(next) = self.next_ticks.lock().await.get(&id) {
            return Ok(*next);
        }
        Ok(self.scheduler.lock().await.next_tick_for_job(id).await?)
    }

    /// Tracked tasks still running, interval tickers included.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop firing, then wait for runs already in progress to finish.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        self.scheduler.lock().await.shutdown().await?;
        self.tracker.close();
        if !self.tracker.is_empty() {
            tracing::info!(in_flight = self.in_flight(), "Waiting for running jobs to finish");
        }
        self.tracker.wait().await;
        Ok(())
    }
}

fn fire_tracked(job: &Arc<dyn ScheduledJob>, tracker: &TaskTracker) -> BoxFuture<'static, ()> {
    let fire = tracker.track_future(job.fire());
    Box::pin(fire)
}

/// Keep hand-built intervals inside what the timer can represent.
fn bounded(every: Duration) -> Duration {
    if every.is_zero() || every > MAX_INTERVAL {
        tracing::warn!(?every, "Interval out of range, using the default");
        Duration::from_secs(crate::model::DEFAULT_INTERVAL_SECS as u64)
    } else {
        every
    }
}

fn after(every: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(every)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
}
