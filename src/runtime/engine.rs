//! Runtime hot-update engine.
//!
//! Owns the live registry, the memo store, rollback observers and the
//! render scheduler. Single-threaded: the runtime actor is the only
//! caller. A load pass classifies every definition of one file, diffs
//! the file's names against its previous pass and requests one render;
//! the render happens on the next tick.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::lifecycle::{LifeState, Lifecycle};
use super::memo::MemoStore;
use super::registry::{Classification, Implementation, ViewImpl, ViewRegistry};
use super::render::{Instance, RenderError, Rendered, Renderer, placeholder};
use super::rollback::RollbackObservers;
use super::schedule::RenderScheduler;
use super::script::Definition;
use super::surface::Surface;
use super::value::Value;
use crate::bridge::{Bridge, BridgeMessage};
use crate::cache::ErrorRecord;
use crate::compiler::syntax::parse_body;
use crate::freshness::now_millis;

/// What one load pass did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub classified: Vec<(String, Classification)>,
    /// Names unregistered by removal diffing
    pub removed: Vec<String>,
    /// Definitions whose body failed to parse
    pub invalid: Vec<String>,
}

/// A presented render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub html: String,
    /// Views put back to their last known good implementation
    pub rolled_back: Vec<String>,
    /// Failure that triggered the rollback
    pub error: Option<RenderError>,
}

pub struct Engine {
    entry: String,
    registry: ViewRegistry,
    memo: MemoStore,
    rollback: RollbackObservers,
    scheduler: RenderScheduler,
    tick: bool,
    /// True until the first render attempt
    first_pass: bool,
    /// File -> names defined in its last load pass
    file_views: FxHashMap<String, Vec<String>>,
    instances: FxHashMap<String, Lifecycle>,
    prop_hashes: FxHashMap<String, String>,
    surface: Box<dyn Surface>,
    bridge: Arc<dyn Bridge>,
    last_output: Option<String>,
}

impl Engine {
    pub fn new(entry: impl Into<String>, surface: Box<dyn Surface>, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            entry: entry.into(),
            registry: ViewRegistry::new(),
            memo: MemoStore::new(),
            rollback: RollbackObservers::new(),
            scheduler: RenderScheduler::new(),
            tick: false,
            first_pass: true,
            file_views: FxHashMap::default(),
            instances: FxHashMap::default(),
            prop_hashes: FxHashMap::default(),
            surface,
            bridge,
            last_output: None,
        }
    }

    // =========================================================================
    // Load passes
    // =========================================================================

    /// Install the definitions of one file.
    pub fn load_file(&mut self, file: &str, defs: Vec<Definition>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut defined: Vec<String> = Vec::new();

        for def in defs {
            let template = match parse_body(&def.body, 1) {
                Ok(template) => template,
                Err(e) => {
                    crate::log!("runtime"; "{}: view `{}` skipped: {}", file, def.name, e);
                    let record = ErrorRecord::new(file, format!("view `{}`: {}", def.name, e), now_millis());
                    self.bridge.publish(BridgeMessage::error(record));
                    report.invalid.push(def.name);
                    continue;
                }
            };

            let classification = self.registry.classify(&def.name, &def.hash, self.first_pass);
            match classification {
                Classification::Duplicate => {
                    crate::log!("runtime"; "view `{}` is defined twice", def.name);
                    let record = ErrorRecord::new(
                        file,
                        format!("view `{}` is defined twice", def.name),
                        now_millis(),
                    );
                    self.bridge.publish(BridgeMessage::warning(record));
                }
                Classification::Changed => self.rollback.arm(&def.name),
                Classification::New | Classification::Unchanged => {}
            }

            self.registry.register(
                ViewImpl {
                    name: def.name.clone(),
                    hash: def.hash,
                    file: file.to_string(),
                    template,
                },
                classification,
            );
            if !defined.contains(&def.name) {
                defined.push(def.name.clone());
            }
            report.classified.push((def.name, classification));
        }

        let previous = self
            .file_views
            .insert(file.to_string(), defined.clone())
            .unwrap_or_default();
        for name in previous {
            if !defined.contains(&name) && self.unregister(file, &name) {
                report.removed.push(name);
            }
        }

        self.request_render();
        report
    }

    /// Tear down every view whose owning file is `file`.
    pub fn delete_file(&mut self, file: &str) -> Vec<String> {
        let names = self.file_views.remove(file).unwrap_or_default();
        let removed: Vec<String> = names
            .into_iter()
            .filter(|name| self.unregister(file, name))
            .collect();
        if !removed.is_empty() {
            self.request_render();
        }
        removed
    }

    /// Remove `name` if `file` still owns it.
    fn unregister(&mut self, file: &str, name: &str) -> bool {
        if self.registry.owner(name) != Some(file) {
            return false;
        }
        self.rollback.disarm(name);
        crate::debug!("runtime"; "remove {}", name);
        self.registry.remove(name)
    }

    /// Write the live value of a memo slot and request a render.
    pub fn set(&mut self, instance: &str, var: &str, value: Value) -> bool {
        let found = self.memo.set(instance, var, value);
        if found {
            self.request_render();
        }
        found
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn request_render(&mut self) {
        if self.scheduler.request() {
            self.tick = true;
        }
    }

    /// Whether the caller has to queue a tick. Reading clears it.
    pub fn take_tick(&mut self) -> bool {
        std::mem::take(&mut self.tick)
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Tick: render if something requested it since the last render.
    pub fn run_pending(&mut self) -> Option<Result<Frame, RenderError>> {
        if !self.scheduler.begin() {
            return None;
        }
        let result = self.render_pass();
        self.scheduler.finish();
        Some(result)
    }

    /// Render immediately, consuming any pending request.
    pub fn render_now(&mut self) -> Result<Frame, RenderError> {
        if !self.scheduler.begin_now() {
            return Err(RenderError::Reentered);
        }
        let result = self.render_pass();
        self.scheduler.finish();
        result
    }

    fn render_pass(&mut self) -> Result<Frame, RenderError> {
        self.first_pass = false;

        let error = match self.try_render() {
            Ok(rendered) => {
                self.rollback.settle(None);
                return Ok(self.commit(rendered, Vec::new(), None));
            }
            Err(error) => error,
        };

        self.report_failure(&error);
        let name = match self.rollback.settle(error.view()) {
            Some(name) if self.registry.roll_back(&name) => name,
            _ => {
                self.rollback.settle(None);
                return Err(error);
            }
        };

        crate::log!("runtime"; "rolled back {}", name);
        let retry = self.try_render();
        self.rollback.settle(None);
        match retry {
            Ok(rendered) => Ok(self.commit(rendered, vec![name], Some(error))),
            Err(retry) => {
                self.report_failure(&retry);
                Err(retry)
            }
        }
    }

    /// Render the entry view. Memo writes of a failed render are undone.
    fn try_render(&mut self) -> Result<Rendered, RenderError> {
        let root = match self.registry.resolve(&self.entry, None) {
            Implementation::View(view) => view,
            other => match self.registry.last_good(&self.entry) {
                Some(good) => Arc::clone(good),
                None => {
                    return Ok(Rendered {
                        html: placeholder(&other).unwrap_or_default(),
                        ..Rendered::default()
                    });
                }
            },
        };

        let memo = self.memo.clone();
        let hashes = self.prop_hashes.clone();
        let result =
            Renderer::new(&self.registry, &mut self.memo, &mut self.prop_hashes).render_root(&root);
        if result.is_err() {
            self.memo = memo;
            self.prop_hashes = hashes;
        }
        result
    }

    fn commit(
        &mut self,
        rendered: Rendered,
        rolled_back: Vec<String>,
        error: Option<RenderError>,
    ) -> Frame {
        for view in &rendered.views {
            self.registry.mark_good(view);
            self.registry.settle(&view.name);
        }
        self.reconcile(&rendered.instances);

        if let Err(e) = self.surface.present(&rendered.html) {
            crate::log!("runtime"; "{:#}", e);
        }
        self.bridge.publish(BridgeMessage::rendered());
        self.last_output = Some(rendered.html.clone());

        Frame {
            html: rendered.html,
            rolled_back,
            error,
        }
    }

    /// Drive lifecycle hooks: new instances mount, surviving ones
    /// update, missing ones unmount and lose their memo slots.
    fn reconcile(&mut self, rendered: &[Instance]) {
        let current: FxHashSet<&str> = rendered.iter().map(|i| i.path.as_str()).collect();

        for instance in rendered {
            let lifecycle = self.instances.entry(instance.path.clone()).or_default();
            let result = if lifecycle.is_live() {
                lifecycle.update()
            } else {
                lifecycle.mount()
            };
            if let Err(e) = result {
                crate::debug!("runtime"; "{}: {}", instance.path, e);
            }
        }

        let gone: Vec<String> = self
            .instances
            .keys()
            .filter(|path| !current.contains(path.as_str()))
            .cloned()
            .collect();
        for path in gone {
            if let Some(mut lifecycle) = self.instances.remove(&path)
                && let Err(e) = lifecycle.unmount()
            {
                crate::debug!("runtime"; "{}: {}", path, e);
            }
            self.memo.forget_instance(&path);
        }
    }

    fn report_failure(&self, error: &RenderError) {
        let file = error
            .view()
            .and_then(|name| self.registry.owner(name))
            .or_else(|| self.registry.owner(&self.entry))
            .unwrap_or_default();
        crate::log!("runtime"; "render failed: {}", error);
        let record = ErrorRecord::new(file, error.to_string(), now_millis());
        self.bridge.publish(BridgeMessage::error(record));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn resolve(&self, name: &str, parent: Option<&str>) -> Implementation {
        self.registry.resolve(name, parent)
    }

    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    pub fn memo_value(&self, instance: &str, var: &str) -> Option<&Value> {
        self.memo.get(instance, var)
    }

    pub fn lifecycle(&self, instance: &str) -> Option<LifeState> {
        self.instances.get(instance).map(Lifecycle::state)
    }

    /// Instance paths currently mounted, sorted.
    pub fn instances(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.instances.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn views_of(&self, file: &str) -> &[String] {
        self.file_views.get(file).map_or(&[], Vec::as_slice)
    }
}
