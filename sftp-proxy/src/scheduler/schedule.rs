use crate::model::DEFAULT_INTERVAL_SECS;
use std::fmt;
use std::time::Duration;
use tokio_cron_scheduler::Job;

/// Longest accepted interval (one year).
pub const MAX_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// When a job fires. Resolved once when the job file is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fire every `Duration`
    Interval(Duration),
    /// Fire on a cron expression (seconds field first)
    Cron(String),
}

impl Schedule {
    /// A well-formed cron expression wins over the interval. Blank or
    /// unparsable expressions fall back to the interval; a non-positive or
    /// longer than [`MAX_INTERVAL`] interval falls back to one hour.
    pub fn resolve(interval_secs: i64, cron: Option<&str>) -> Self {
        if let Some(expr) = cron.map(str::trim).filter(|e| !e.is_empty()) {
            if is_valid_cron(expr) {
                return Schedule::Cron(expr.to_string());
            }
            tracing::warn!(cron = %expr, "Ignoring malformed cron expression, using interval schedule");
        }

        let secs = if interval_secs <= 0 {
            DEFAULT_INTERVAL_SECS
        } else if interval_secs as u64 > MAX_INTERVAL.as_secs() {
            tracing::warn!(
                interval = interval_secs,
                max = MAX_INTERVAL.as_secs(),
                "Interval too long, using the default"
            );
            DEFAULT_INTERVAL_SECS
        } else {
            interval_secs
        };
        Schedule::Interval(Duration::from_secs(secs as u64))
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Interval(every) => write!(f, "every {}s", every.as_secs()),
            Schedule::Cron(expr) => write!(f, "cron '{expr}'"),
        }
    }
}

fn is_valid_cron(expr: &str) -> bool {
    Job::new(expr, |_uuid, _lock| {}).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_wins_over_interval() {
        assert_eq!(
            Schedule::resolve(60, Some("0 30 1 * * *")),
            Schedule::Cron("0 30 1 * * *".into())
        );
    }

    #[test]
    fn test_blank_cron_uses_interval() {
        assert_eq!(
            Schedule::resolve(60, Some("   ")),
            Schedule::Interval(Duration::from_secs(60))
        );
        assert_eq!(
            Schedule::resolve(60, None),
            Schedule::Interval(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_malformed_cron_uses_interval() {
        assert_eq!(
            Schedule::resolve(120, Some("every tuesday-ish")),
            Schedule::Interval(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_non_positive_interval_defaults_to_an_hour() {
        assert_eq!(
            Schedule::resolve(0, None),
            Schedule::Interval(Duration::from_secs(3600))
        );
        assert_eq!(
            Schedule::resolve(-5, None),
            Schedule::Interval(Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_oversized_interval_defaults_to_an_hour() {
        assert_eq!(
            Schedule::resolve(i64::MAX / 100, None),
            Schedule::Interval(Duration::from_secs(3600))
        );
        assert_eq!(
            Schedule::resolve(MAX_INTERVAL.as_secs() as i64, None),
            Schedule::Interval(MAX_INTERVAL)
        );
    }
}
