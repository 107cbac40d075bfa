//! One-shot rollback observers.
//!
//! A Changed registration arms an observer for its view name. The next
//! render completion settles the observers:
//!
//! - render succeeded: every observer detaches
//! - render failed in an armed view: only that observer fires and its
//!   name is handed back for rollback; the rest stay armed until the retry
//! - render failed anywhere else: every observer detaches, nothing rolls back
//!
//! Arming a name that is already armed keeps a single observer.

use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct RollbackObservers {
    armed: FxHashSet<String>,
}

impl RollbackObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, name: &str) {
        self.armed.insert(name.to_string());
    }

    /// The view went away before the next render.
    pub fn disarm(&mut self, name: &str) {
        self.armed.remove(name);
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.armed.contains(name)
    }

    /// Settle after a render. `failed` names the view whose render threw.
    /// Returns the name to roll back, if that view was armed.
    pub fn settle(&mut self, failed: Option<&str>) -> Option<String> {
        match failed {
            Some(name) if self.is_armed(name) => {
                self.armed.remove(name);
                Some(name.to_string())
            }
            _ => {
                self.armed.clear();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_detaches() {
        let mut observers = RollbackObservers::new();
        observers.arm("Y");
        assert_eq!(observers.settle(None), None);
        assert!(!observers.is_armed("Y"));
    }

    #[test]
    fn test_failure_fires_only_failing_view() {
        let mut observers = RollbackObservers::new();
        observers.arm("Y");
        observers.arm("X");
        assert_eq!(observers.settle(Some("Y")), Some("Y".to_string()));
        assert!(!observers.is_armed("Y"));
        assert!(observers.is_armed("X"));
        // Fired once
        assert_eq!(observers.settle(Some("Y")), None);
        assert!(!observers.is_armed("X"));
    }

    #[test]
    fn test_failure_in_unarmed_view_detaches_all() {
        let mut observers = RollbackObservers::new();
        observers.arm("X");
        assert_eq!(observers.settle(Some("New")), None);
        assert!(!observers.is_armed("X"));
    }

    #[test]
    fn test_rearm_does_not_accumulate() {
        let mut observers = RollbackObservers::new();
        observers.arm("Y");
        observers.arm("Y");
        observers.disarm("Y");
        assert!(!observers.is_armed("Y"));
    }
}
