//! Memoization slots: interactive state that survives hot swaps.
//!
//! A slot is keyed by (instance path, variable) and holds the live value
//! plus the initial value computed when the owning view was last defined.
//! How an evaluation treats an existing slot depends on how the view was
//! last registered:
//!
//! | Mode       | Slot exists                                               |
//! |------------|-----------------------------------------------------------|
//! | `Fresh`    | recompute, replace live and initial                      |
//! | `Preserve` | return live, no recomputation                            |
//! | `Reset`    | recompute; equal to old initial -> keep live, else replace |

use rustc_hash::FxHashMap;

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoMode {
    /// Newly registered view
    Fresh,
    /// Unchanged view, or any render after the first one of a definition
    Preserve,
    /// Changed view: selective reset
    Reset,
}

#[derive(Debug, Clone)]
struct Slot {
    live: Value,
    initial: Value,
}

#[derive(Debug, Clone, Default)]
pub struct MemoStore {
    slots: FxHashMap<(String, String), Slot>,
}

impl MemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        instance: &str,
        var: &str,
        mode: MemoMode,
        compute: impl FnOnce() -> Value,
    ) -> Value {
        let key = (instance.to_string(), var.to_string());

        let Some(slot) = self.slots.get_mut(&key) else {
            let value = compute();
            self.slots.insert(
                key,
                Slot {
                    live: value.clone(),
                    initial: value.clone(),
                },
            );
            return value;
        };

        match mode {
            MemoMode::Preserve => slot.live.clone(),
            MemoMode::Reset => {
                let fresh = compute();
                if fresh.same_primitive(&slot.initial) {
                    slot.live.clone()
                } else {
                    slot.live = fresh.clone();
                    slot.initial = fresh.clone();
                    fresh
                }
            }
            MemoMode::Fresh => {
                let fresh = compute();
                slot.live = fresh.clone();
                slot.initial = fresh.clone();
                fresh
            }
        }
    }

    /// Write the live value of an existing slot. The initial value is
    /// left alone.
    pub fn set(&mut self, instance: &str, var: &str, value: Value) -> bool {
        match self.slots.get_mut(&(instance.to_string(), var.to_string())) {
            Some(slot) => {
                slot.live = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, instance: &str, var: &str) -> Option<&Value> {
        self.slots
            .get(&(instance.to_string(), var.to_string()))
            .map(|s| &s.live)
    }

    /// Drop every slot of an instance.
    pub fn forget_instance(&mut self, instance: &str) {
        self.slots.retain(|(path, _), _| path != instance);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> impl FnOnce() -> Value {
        move || Value::Number(n)
    }

    fn eval(store: &mut MemoStore, mode: MemoMode, init: f64) -> String {
        store.evaluate("Main", "count", mode, num(init)).to_string()
    }

    #[test]
    fn test_first_evaluation_computes() {
        let mut store = MemoStore::new();
        assert_eq!(eval(&mut store, MemoMode::Preserve, 0.0), "0");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_preserve_skips_compute() {
        let mut store = MemoStore::new();
        eval(&mut store, MemoMode::Fresh, 0.0);
        store.set("Main", "count", Value::Number(5.0));
        let value = store.evaluate("Main", "count", MemoMode::Preserve, || {
            panic!("must not recompute")
        });
        assert_eq!(value.to_string(), "5");
    }

    #[test]
    fn test_reset_same_initializer_keeps_live() {
        let mut store = MemoStore::new();
        eval(&mut store, MemoMode::Fresh, 0.0);
        store.set("Main", "count", Value::Number(5.0));
        assert_eq!(eval(&mut store, MemoMode::Reset, 0.0), "5");
    }

    #[test]
    fn test_reset_new_initializer_replaces() {
        let mut store = MemoStore::new();
        eval(&mut store, MemoMode::Fresh, 0.0);
        store.set("Main", "count", Value::Number(5.0));
        assert_eq!(eval(&mut store, MemoMode::Reset, 10.0), "10");
        // The new initializer becomes the comparison base
        store.set("Main", "count", Value::Number(7.0));
        assert_eq!(eval(&mut store, MemoMode::Reset, 10.0), "7");
    }

    #[test]
    fn test_reset_composite_always_replaces() {
        let mut store = MemoStore::new();
        let list = || Value::from_json(&serde_json::json!([1]));
        store.evaluate("Main", "items", MemoMode::Fresh, list);
        store.set("Main", "items", Value::Number(9.0));
        let value = store.evaluate("Main", "items", MemoMode::Reset, list);
        assert_eq!(value.to_string(), "[1]");
    }

    #[test]
    fn test_fresh_replaces_existing() {
        let mut store = MemoStore::new();
        eval(&mut store, MemoMode::Fresh, 0.0);
        store.set("Main", "count", Value::Number(5.0));
        assert_eq!(eval(&mut store, MemoMode::Fresh, 0.0), "0");
    }

    #[test]
    fn test_set_unknown_slot() {
        let mut store = MemoStore::new();
        assert!(!store.set("Main", "count", Value::Number(1.0)));
    }

    #[test]
    fn test_instances_are_separate() {
        let mut store = MemoStore::new();
        store.evaluate("Main/A#1", "n", MemoMode::Fresh, num(1.0));
        store.evaluate("Main/A#2", "n", MemoMode::Fresh, num(2.0));
        store.forget_instance("Main/A#1");
        assert!(store.get("Main/A#1", "n").is_none());
        assert_eq!(store.get("Main/A#2", "n").unwrap().to_string(), "2");
    }
}
