//! Live view registry.
//!
//! One record per view name. A record holds the installed implementation,
//! the hash it was defined with, the file that defined it and the memo
//! mode its next render evaluates with. Last known good implementations
//! are kept in a separate table and survive removal of the live record.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::memo::MemoMode;
use crate::compiler::syntax::Template;

/// A compiled view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewImpl {
    pub name: String,
    pub hash: String,
    pub file: String,
    pub template: Template,
}

/// What a name resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Implementation {
    View(Arc<ViewImpl>),
    /// Two views with this name were defined in the first load pass
    DefinedTwice(String),
    NotFound(String),
}

impl Implementation {
    pub fn view(&self) -> Option<&Arc<ViewImpl>> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn hash(&self) -> Option<&str> {
        self.view().map(|v| v.hash.as_str())
    }
}

/// How an incoming definition relates to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Duplicate,
    Unchanged,
    Changed,
}

impl Classification {
    pub const fn memo_mode(self) -> MemoMode {
        match self {
            Self::New | Self::Duplicate => MemoMode::Fresh,
            Self::Unchanged => MemoMode::Preserve,
            Self::Changed => MemoMode::Reset,
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    implementation: Implementation,
    owner: String,
    mode: MemoMode,
}

#[derive(Debug, Default)]
pub struct ViewRegistry {
    records: FxHashMap<String, Record>,
    last_good: FxHashMap<String, Arc<ViewImpl>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a definition of `name` with `hash`.
    ///
    /// `first_pass` is true until the process renders for the first
    /// time; only then can a repeated name be a duplicate.
    pub fn classify(&self, name: &str, hash: &str, first_pass: bool) -> Classification {
        match self.records.get(name) {
            None => Classification::New,
            Some(_) if first_pass => Classification::Duplicate,
            Some(record) if record.implementation.hash() == Some(hash) => {
                Classification::Unchanged
            }
            Some(_) => Classification::Changed,
        }
    }

    /// Install a definition. Duplicates install a placeholder instead.
    pub fn register(&mut self, view: ViewImpl, classification: Classification) {
        let name = view.name.clone();
        let owner = view.file.clone();
        let implementation = match classification {
            Classification::Duplicate => Implementation::DefinedTwice(name.clone()),
            _ => Implementation::View(Arc::new(view)),
        };
        crate::debug!("registry"; "{} {:?}", name, classification);
        self.records.insert(
            name,
            Record {
                implementation,
                owner,
                mode: classification.memo_mode(),
            },
        );
    }

    /// Reinstall the last known good implementation. False without one.
    pub fn roll_back(&mut self, name: &str) -> bool {
        let Some(good) = self.last_good.get(name).cloned() else {
            return false;
        };
        crate::debug!("registry"; "{} rolled back to {}", name, good.hash);
        self.records.insert(
            name.to_string(),
            Record {
                owner: good.file.clone(),
                implementation: Implementation::View(good),
                mode: MemoMode::Preserve,
            },
        );
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.records.remove(name).is_some()
    }

    /// Look up `name` as seen from inside `parent`: `Parent.Name` first,
    /// then the bare name, then a not-found placeholder.
    pub fn resolve(&self, name: &str, parent: Option<&str>) -> Implementation {
        if let Some(parent) = parent
            && let Some(record) = self.records.get(&format!("{parent}.{name}"))
        {
            return record.implementation.clone();
        }
        match self.records.get(name) {
            Some(record) => record.implementation.clone(),
            None => Implementation::NotFound(name.to_string()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn owner(&self, name: &str) -> Option<&str> {
        self.records.get(name).map(|r| r.owner.as_str())
    }

    pub fn mode(&self, name: &str) -> MemoMode {
        self.records
            .get(name)
            .map_or(MemoMode::Fresh, |r| r.mode)
    }

    /// A view that rendered successfully evaluates with `Preserve` from
    /// then on.
    pub fn settle(&mut self, name: &str) {
        if let Some(record) = self.records.get_mut(name) {
            record.mode = MemoMode::Preserve;
        }
    }

    pub fn mark_good(&mut self, view: &Arc<ViewImpl>) {
        self.last_good.insert(view.name.clone(), Arc::clone(view));
    }

    pub fn last_good(&self, name: &str) -> Option<&Arc<ViewImpl>> {
        self.last_good.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.records.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
