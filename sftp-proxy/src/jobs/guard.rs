//! Single-flight guard: at most one run of a job at a time.

use std::sync::atomic::{AtomicBool, Ordering};

/// Per-job run state, `idle` or `running`.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the job. `None` means another run holds it; the caller skips this
    /// fire instead of waiting.
    pub fn try_acquire(&self) -> Option<RunToken<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunToken { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Held for the duration of a run. Dropping it returns the guard to idle,
/// whether the run finished, failed or panicked.
#[derive(Debug)]
pub struct RunToken<'a> {
    guard: &'a RunGuard,
}

impl Drop for RunToken<'_> {
    fn drop(&mut self) {
        self.guard.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_second_claim_fails_while_held() {
        let guard = RunGuard::new();
        let token = guard.try_acquire();
        assert!(token.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(token);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_release_on_panic() {
        let guard = RunGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _token = guard.try_acquire().unwrap();
            panic!("transfer blew up");
        }));
        assert!(result.is_err());
        assert!(!guard.is_running());
    }

    #[test]
    fn test_concurrent_claims_admit_one() {
        const THREADS: usize = 16;
        let guard = Arc::new(RunGuard::new());
        let start = Arc::new(Barrier::new(THREADS));
        let done = Arc::new(Barrier::new(THREADS));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let guard = guard.clone();
                let start = start.clone();
                let done = done.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    start.wait();
                    let token = guard.try_acquire();
                    if token.is_some() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    // hold the token until every thread has tried
                    done.wait();
                    drop(token);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!guard.is_running());
    }
}
