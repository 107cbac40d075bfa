//! Initial build gate.
//!
//! A one-time latch over the files enumerated at startup. Each file
//! reports once it reaches a terminal state (built, failed or skipped);
//! when the last one reports, the gate opens after a short grace delay.
//! Waiters arriving after that return immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::sync::watch;

pub struct InitialBuild {
    pending: Mutex<FxHashSet<String>>,
    total: usize,
    grace: Duration,
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

impl InitialBuild {
    pub fn new<I>(keys: I, grace: Duration) -> Arc<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let pending: FxHashSet<String> = keys.into_iter().collect();
        let total = pending.len();
        let (tx, _) = watch::channel(false);
        let gate = Arc::new(Self {
            pending: Mutex::new(pending),
            total,
            grace,
            fired: AtomicBool::new(false),
            tx,
        });

        if total == 0 {
            gate.fire_now();
        }
        gate
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.pending.lock().len()
    }

    /// Report a file as terminal. Repeated reports and files outside the
    /// initial set are ignored. Returns true for the report that
    /// completed the set.
    pub fn mark_done(self: &Arc<Self>, key: &str) -> bool {
        let completed = {
            let mut pending = self.pending.lock();
            pending.remove(key) && pending.is_empty()
        };

        if completed && !self.fired.swap(true, Ordering::SeqCst) {
            self.schedule_open();
            return true;
        }
        false
    }

    fn schedule_open(self: &Arc<Self>) {
        if self.grace.is_zero() {
            self.open();
            return;
        }
        let gate = Arc::clone(self);
        let grace = self.grace;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    gate.open();
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(grace);
                    gate.open();
                });
            }
        }
    }

    fn fire_now(&self) {
        self.fired.store(true, Ordering::SeqCst);
        self.open();
    }

    fn open(&self) {
        crate::debug!("build"; "initial build complete ({} files)", self.total);
        self.tx.send_replace(true);
    }

    pub fn is_complete(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the gate has opened.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("app/{i}.view")).collect()
    }

    #[tokio::test]
    async fn test_fires_once_after_all_terminal() {
        let gate = InitialBuild::new(keys(3), Duration::from_millis(10));
        assert!(!gate.mark_done("app/0.view"));
        assert!(!gate.mark_done("app/0.view"));
        assert!(!gate.mark_done("app/1.view"));
        assert!(!gate.is_complete());

        assert!(gate.mark_done("app/2.view"));
        assert!(!gate.mark_done("app/2.view"));

        gate.wait().await;
        assert!(gate.is_complete());
        assert_eq!(gate.remaining(), 0);
    }

    #[tokio::test]
    async fn test_unknown_files_do_not_count() {
        let gate = InitialBuild::new(keys(1), Duration::ZERO);
        assert!(!gate.mark_done("app/new.view"));
        assert_eq!(gate.remaining(), 1);
    }

    #[tokio::test]
    async fn test_grace_delays_open() {
        let gate = InitialBuild::new(keys(1), Duration::from_millis(200));
        gate.mark_done("app/0.view");
        assert!(!gate.is_complete());
        gate.wait().await;
        assert!(gate.is_complete());
    }

    #[tokio::test]
    async fn test_late_waiter_returns_immediately() {
        let gate = InitialBuild::new(keys(1), Duration::ZERO);
        gate.mark_done("app/0.view");
        gate.wait().await;

        let late = tokio::time::timeout(Duration::from_millis(50), gate.wait()).await;
        assert!(late.is_ok());
    }

    #[tokio::test]
    async fn test_empty_set_is_open() {
        let gate = InitialBuild::new(Vec::new(), Duration::from_secs(10));
        assert!(gate.is_complete());
        gate.wait().await;
    }

    #[test]
    fn test_concurrent_reports_fire_once() {
        let gate = InitialBuild::new(keys(64), Duration::ZERO);
        let fired = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for key in keys(64) {
                let gate = &gate;
                let fired = &fired;
                s.spawn(move || {
                    if gate.mark_done(&key) {
                        fired.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
