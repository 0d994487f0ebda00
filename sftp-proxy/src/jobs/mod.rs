//! Transfer jobs: the per-path strategies, the single-flight guard and the
//! runner that ties them together.

pub mod download;
pub mod guard;
pub mod runner;
pub mod upload;

use std::fmt;

pub use guard::{RunGuard, RunToken};
pub use runner::{JobRunner, RunOutcome, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Download,
    Upload,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Download => f.write_str("download"),
            JobKind::Upload => f.write_str("upload"),
        }
    }
}

/// What happened to the files of one path pair in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathReport {
    /// Source paths that transferred
    pub transferred: Vec<String>,
    /// Source paths that did not, with the reason
    pub failed: Vec<(String, String)>,
}

impl PathReport {
    fn success(&mut self, source: &str) {
        self.transferred.push(source.to_string());
    }

    fn failure(&mut self, source: &str, reason: impl ToString) {
        self.failed.push((source.to_string(), reason.to_string()));
    }
}
