//! Per-file build pipeline.
//!
//! ```text
//! read ─► Reset ─► PreHook ─► Transform ─► CacheUpdate ─► PostHook
//!                                                            │
//!        Write ◄─ Classify ◄─ OutsideSource ◄────────────────┘
//! ```
//!
//! Stages run strictly in order for one file. The first failing stage
//! aborts the rest of that file's stages only; other files in flight are
//! unaffected. Every run ends in exactly one [`FileOutcome`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::CompileError;
use super::gate::InitialBuild;
use super::hooks::Hooks;
use super::outside::outside_source;
use super::transform::{Transformed, ViewDef, transform};
use super::write::{RunStamp, WriteGuard, remove_artifact, write_artifact};
use crate::bridge::{Bridge, BridgeMessage};
use crate::cache::BuildCache;
use crate::collab::Installer;
use crate::config::HotviewConfig;
use crate::core::BuildMode;
use crate::freshness::{get_mtime, hash_str, millis_since_epoch, now_millis};
use crate::logger;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reset,
    PreHook,
    Transform,
    CacheUpdate,
    PostHook,
    OutsideSource,
    Classify,
    Write,
}

pub const STAGES: [Stage; 8] = [
    Stage::Reset,
    Stage::PreHook,
    Stage::Transform,
    Stage::CacheUpdate,
    Stage::PostHook,
    Stage::OutsideSource,
    Stage::Classify,
    Stage::Write,
];

impl Stage {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::PreHook => "pre-hook",
            Self::Transform => "transform",
            Self::CacheUpdate => "cache-update",
            Self::PostHook => "post-hook",
            Self::OutsideSource => "outside-source",
            Self::Classify => "classify",
            Self::Write => "write",
        }
    }
}

/// Terminal state of one pipeline run.
#[derive(Debug)]
pub enum FileOutcome {
    Built(Built),
    Failed {
        key: String,
        error: CompileError,
    },
    /// Same content as the last successful run; nothing was touched.
    Unchanged { key: String },
    /// Source is gone: artifact and cache entry were dropped.
    Removed { key: String },
}

#[derive(Debug)]
pub struct Built {
    pub key: String,
    /// Final artifact code (after the post hook)
    pub code: String,
    pub views: Vec<ViewDef>,
    pub internal: bool,
    /// Code outside view bodies differs from the previous run
    pub outside_changed: bool,
    /// Artifact path (`None` in package mode)
    pub output: Option<PathBuf>,
    /// False when a later run had already written the same path
    pub wrote: bool,
    pub elapsed: Duration,
}

impl FileOutcome {
    pub fn key(&self) -> &str {
        match self {
            Self::Built(built) => &built.key,
            Self::Failed { key, .. } | Self::Unchanged { key } | Self::Removed { key } => key,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Mutable state threaded through the stages of one run.
struct FileRun<'a> {
    path: &'a Path,
    key: String,
    stamp: RunStamp,
    started: Instant,
    text: String,
    transformed: Transformed,
    code: String,
    outside_changed: bool,
    output: Option<PathBuf>,
    wrote: bool,
}

pub struct Pipeline {
    config: Arc<HotviewConfig>,
    cache: Arc<BuildCache>,
    bridge: Arc<dyn Bridge>,
    installer: Arc<dyn Installer>,
    hooks: Hooks,
    guard: WriteGuard,
    gate: Arc<InitialBuild>,
    mode: BuildMode,
}

impl Pipeline {
    pub fn new(
        config: Arc<HotviewConfig>,
        cache: Arc<BuildCache>,
        bridge: Arc<dyn Bridge>,
        installer: Arc<dyn Installer>,
        gate: Arc<InitialBuild>,
        mode: BuildMode,
    ) -> Self {
        let hooks = Hooks::from_config(&config.build.hooks, &config.root);
        Self {
            config,
            cache,
            bridge,
            installer,
            hooks,
            guard: WriteGuard::new(),
            gate,
            mode,
        }
    }

    /// Same cache, bridge and gate under a reloaded configuration.
    pub fn with_config(&self, config: Arc<HotviewConfig>) -> Self {
        Self::new(
            config,
            Arc::clone(&self.cache),
            Arc::clone(&self.bridge),
            Arc::clone(&self.installer),
            Arc::clone(&self.gate),
            self.mode,
        )
    }

    pub fn config(&self) -> &Arc<HotviewConfig> {
        &self.config
    }

    #[cfg(test)]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn cache(&self) -> &Arc<BuildCache> {
        &self.cache
    }

    pub fn gate(&self) -> &Arc<InitialBuild> {
        &self.gate
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Run one source file through every stage.
    pub fn run(&self, path: &Path) -> FileOutcome {
        let outcome = self.run_inner(path);
        self.gate.mark_done(outcome.key());
        outcome
    }

    fn run_inner(&self, path: &Path) -> FileOutcome {
        let key = self.cache.key(path);

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                crate::debug!("pipeline"; "{}: src file removed", key);
                return self.remove(path);
            }
            Err(e) => return self.fail(path, key, CompileError::io(path, e)),
        };

        let hash = hash_str(&text);
        if self.mode.is_watch() && self.is_unchanged(path, hash) {
            crate::debug!("pipeline"; "{}: unchanged", key);
            return FileOutcome::Unchanged { key };
        }
        let modified = get_mtime(path).map(millis_since_epoch).unwrap_or_default();
        self.cache.set_source(path, hash, modified);

        let mut run = FileRun {
            path,
            key,
            stamp: self.guard.begin(),
            started: Instant::now(),
            text,
            transformed: Transformed::default(),
            code: String::new(),
            outside_changed: false,
            output: None,
            wrote: false,
        };

        for stage in STAGES {
            if let Err(error) = self.stage(stage, &mut run) {
                crate::debug!("pipeline"; "{}: {} failed", run.key, stage.name());
                return self.fail(path, run.key, error);
            }
        }

        self.succeed(run)
    }

    fn stage(&self, stage: Stage, run: &mut FileRun<'_>) -> Result<(), CompileError> {
        match stage {
            Stage::Reset => {
                run.started = Instant::now();
                self.cache.clear_error(run.path);
            }
            Stage::PreHook => {
                let text = std::mem::take(&mut run.text);
                run.text = self.hooks.pre.apply(&run.key, text)?;
            }
            Stage::Transform => {
                run.transformed = transform(&run.text)?;
                run.code = run.transformed.code.clone();
            }
            Stage::CacheUpdate => {
                let spans = run.transformed.spans();
                let imports = run.transformed.imports.clone();
                self.cache.set_views(run.path, &spans);
                self.cache.set_file_imports(run.path, imports.clone());
                if self.gate.is_complete() {
                    self.bridge
                        .publish(BridgeMessage::metadata(&run.key, spans, imports));
                }
            }
            Stage::PostHook => {
                let code = std::mem::take(&mut run.code);
                run.code = self.hooks.post.apply(&run.key, code)?;
            }
            Stage::OutsideSource => {
                let outside = outside_source(&run.text, &run.transformed.spans());
                run.outside_changed = self.cache.set_outside_src(run.path, outside);
                if run.outside_changed && self.gate.is_complete() {
                    self.bridge.publish(BridgeMessage::outside_change(&run.key));
                }
            }
            Stage::Classify => {
                let internal = run.transformed.internal;
                self.cache.set_internal(run.path, internal);
                if !self.mode.is_watch() {
                    return Ok(());
                }
                let (output, stale) = if internal {
                    (
                        self.config.internal_output_for(run.path),
                        self.config.output_for(run.path),
                    )
                } else {
                    (
                        self.config.output_for(run.path),
                        self.config.internal_output_for(run.path),
                    )
                };
                if let Some(stale) = stale {
                    self.remove_stale(&stale);
                }
                run.output = output;
            }
            Stage::Write => {
                let Some(output) = &run.output else {
                    return Ok(());
                };
                if self.guard.claim(output, run.stamp) {
                    write_artifact(output, &run.code)?;
                    run.wrote = true;
                } else {
                    crate::debug!("pipeline"; "{}: newer write exists, skipped", run.key);
                }
            }
        }
        Ok(())
    }

    /// A file that switched between internal and app code leaves its
    /// artifact behind in the other tree.
    fn remove_stale(&self, stale: &Path) {
        match remove_artifact(stale) {
            Ok(true) => crate::debug!("pipeline"; "removed {}", stale.display()),
            Ok(false) => {}
            Err(e) => crate::log!("pipeline"; "failed to remove {}: {}", stale.display(), e),
        }
        self.guard.forget(stale);
    }

    fn is_unchanged(&self, path: &Path, hash: crate::freshness::ContentHash) -> bool {
        let Some(entry) = self.cache.get(path) else {
            return false;
        };
        if entry.hash != Some(hash) || entry.has_error() || entry.added == 0 {
            return false;
        }
        let output = if entry.internal {
            self.config.internal_output_for(path)
        } else {
            self.config.output_for(path)
        };
        output.is_some_and(|o| o.exists())
    }

    fn succeed(&self, run: FileRun<'_>) -> FileOutcome {
        let elapsed = run.started.elapsed();

        self.cache.update(run.path);
        self.cache.serialize();
        logger::good_file(&run.key, Some(elapsed));

        self.bridge.publish(BridgeMessage::compiled(&run.key));
        if let Some(pending) = self.cache.get_last_error() {
            self.bridge.publish(BridgeMessage::error(pending));
        }

        if run.wrote
            && !run.transformed.internal
            && self.gate.is_complete()
            && self.cache.contains(run.path)
            && !self.installer.is_installing()
            && let Some(output) = &run.output
        {
            let rel = self.config.rel_key(output);
            self.bridge.publish(BridgeMessage::script_add(&run.key, rel));
        }

        FileOutcome::Built(Built {
            key: run.key,
            code: run.code,
            views: run.transformed.views,
            internal: run.transformed.internal,
            outside_changed: run.outside_changed,
            output: run.output,
            wrote: run.wrote,
            elapsed,
        })
    }

    fn fail(&self, path: &Path, key: String, error: CompileError) -> FileOutcome {
        let record = error.to_record(&key, now_millis());
        self.cache.add_error(path, record.clone());
        self.cache.serialize();

        logger::bad_file(&key);
        crate::log!("error"; "{}", error);
        self.bridge.publish(BridgeMessage::error(record));

        FileOutcome::Failed { key, error }
    }

    /// Drop a deleted source: remove its artifacts and its cache entry.
    /// Bypasses every stage.
    pub fn remove(&self, path: &Path) -> FileOutcome {
        let key = self.cache.key(path);
        let outputs = [
            self.config.output_for(path),
            self.config.internal_output_for(path),
        ];
        for output in outputs.into_iter().flatten() {
            match remove_artifact(&output) {
                Ok(true) => crate::debug!("pipeline"; "deleted {}", output.display()),
                Ok(false) => {}
                Err(e) => crate::log!("pipeline"; "failed to delete {}: {}", output.display(), e),
            }
            self.guard.forget(&output);
        }
        self.cache.remove(path);
        self.cache.serialize();
        FileOutcome::Removed { key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryBridge;
    use crate::collab::NoInstaller;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        config: Arc<HotviewConfig>,
        cache: Arc<BuildCache>,
        bridge: Arc<MemoryBridge>,
        gate: Arc<InitialBuild>,
    }

    fn fixture(initial: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(HotviewConfig::for_root(dir.path()));
        fs::create_dir_all(&config.build.app).unwrap();
        let cache = Arc::new(BuildCache::new(&config.root));
        let keys = initial.iter().map(|k| format!("app/{k}"));
        let gate = InitialBuild::new(keys, Duration::ZERO);
        Fixture {
            _dir: dir,
            config,
            cache,
            bridge: Arc::new(MemoryBridge::new()),
            gate,
        }
    }

    impl Fixture {
        fn pipeline(&self, mode: BuildMode) -> Pipeline {
            Pipeline::new(
                Arc::clone(&self.config),
                Arc::clone(&self.cache),
                self.bridge.clone(),
                Arc::new(NoInstaller),
                Arc::clone(&self.gate),
                mode,
            )
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let path = self.config.build.app.join(name);
            fs::write(&path, text).unwrap();
            path
        }
    }

    const MAIN: &str = "import x from 'lib'\nview Main {\n  render <p>hi</p>\n}\n";

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = STAGES.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "reset",
                "pre-hook",
                "transform",
                "cache-update",
                "post-hook",
                "outside-source",
                "classify",
                "write"
            ]
        );
    }

    #[test]
    fn test_success_writes_and_updates_cache() {
        let fx = fixture(&[]);
        let path = fx.write("main.view", MAIN);
        let outcome = fx.pipeline(BuildMode::Watch).run(&path);

        let FileOutcome::Built(built) = outcome else {
            panic!("expected built");
        };
        assert!(built.wrote);
        let output = fx.config.build.out.join("main.js");
        assert_eq!(built.output.as_deref(), Some(output.as_path()));
        assert!(fs::read_to_string(&output).unwrap().contains("View.define(\"Main\""));

        let entry = fx.cache.get(&path).unwrap();
        assert_eq!(entry.view_names(), vec!["Main"]);
        assert_eq!(entry.imports, vec!["lib"]);
        assert!(entry.added > 0);
        assert!(!entry.has_error());
    }

    #[test]
    fn test_failure_keeps_previous_artifact() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", MAIN);
        assert!(!pipeline.run(&path).is_failed());
        let output = fx.config.build.out.join("main.js");
        let before = fs::read_to_string(&output).unwrap();

        fx.write("main.view", "view Main {\n  render <p>\n");
        let outcome = pipeline.run(&path);
        assert!(outcome.is_failed());
        assert_eq!(fs::read_to_string(&output).unwrap(), before);

        let entry = fx.cache.get(&path).unwrap();
        assert_eq!(entry.error.unwrap().line, Some(1));
        assert_eq!(fx.cache.get_last_error().unwrap().file, "app/main.view");
        assert_eq!(fx.bridge.kinds().last(), Some(&"error"));
    }

    #[test]
    fn test_error_clears_on_next_success() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", "view Main {\n  oops\n}\n");
        assert!(pipeline.run(&path).is_failed());

        fx.write("main.view", MAIN);
        assert!(!pipeline.run(&path).is_failed());
        assert!(fx.cache.get_last_error().is_none());
    }

    #[test]
    fn test_success_reemits_other_pending_error() {
        let fx = fixture(&["pending.view"]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let bad = fx.write("bad.view", "view Bad {\n  oops\n}\n");
        let good = fx.write("good.view", MAIN);
        pipeline.run(&bad);
        fx.bridge.take();

        pipeline.run(&good);
        let messages = fx.bridge.take();
        let kinds: Vec<_> = messages.iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec!["success", "error"]);
        assert_eq!(messages[1].file(), Some("app/bad.view"));
    }

    #[test]
    fn test_unchanged_content_is_skipped() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", MAIN);
        pipeline.run(&path);
        let added = fx.cache.get(&path).unwrap().added;
        fx.bridge.take();

        let outcome = pipeline.run(&path);
        assert!(matches!(outcome, FileOutcome::Unchanged { .. }));
        assert_eq!(fx.cache.get(&path).unwrap().added, added);
        assert!(fx.bridge.take().is_empty());
    }

    #[test]
    fn test_messages_before_and_after_initial_build() {
        let fx = fixture(&["main.view"]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", MAIN);

        pipeline.run(&path);
        assert_eq!(fx.bridge.kinds(), vec!["success"]);
        assert!(fx.gate.is_complete());
        fx.bridge.take();

        fx.write("main.view", &MAIN.replace("hi", "hello"));
        pipeline.run(&path);
        assert_eq!(fx.bridge.kinds(), vec!["metadata", "success", "script-add"]);
    }

    #[test]
    fn test_outside_change_detected() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", MAIN);
        pipeline.run(&path);
        fx.bridge.take();

        fx.write("main.view", &MAIN.replace("hi", "hello"));
        let FileOutcome::Built(built) = pipeline.run(&path) else {
            panic!("expected built");
        };
        assert!(!built.outside_changed);

        fx.write("main.view", &MAIN.replace("'lib'", "'lib2'"));
        let FileOutcome::Built(built) = pipeline.run(&path) else {
            panic!("expected built");
        };
        assert!(built.outside_changed);
        assert!(fx.bridge.kinds().contains(&"outside-change"));
    }

    #[test]
    fn test_internal_file_goes_to_internal_tree() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("theme.view", "view Theme {\n  render x\n}\n");
        pipeline.run(&path);
        let main_out = fx.config.build.out.join("theme.js");
        assert!(main_out.exists());

        fx.write("theme.view", "export const c = 1\nview Theme {\n  render x\n}\n");
        let FileOutcome::Built(built) = pipeline.run(&path) else {
            panic!("expected built");
        };
        assert!(built.internal);
        assert!(!main_out.exists());
        assert!(fx.config.build.internal.join("theme.js").exists());
        assert!(fx.cache.get(&path).unwrap().internal);
    }

    #[test]
    fn test_file_leaving_internal_tree() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("theme.view", "export const c = 1\nview Theme {\n  render x\n}\n");
        pipeline.run(&path);
        let internal_out = fx.config.build.internal.join("theme.js");
        assert!(internal_out.exists());

        fx.write("theme.view", "view Theme {\n  render x\n}\n");
        let FileOutcome::Built(built) = pipeline.run(&path) else {
            panic!("expected built");
        };
        assert!(!built.internal);
        assert!(!internal_out.exists());
        assert!(fx.config.build.out.join("theme.js").exists());

        // A restart reads a single artifact for the file
        let artifacts = crate::compiler::startup::load_artifacts(&fx.config);
        let keys: Vec<_> = artifacts.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["app/theme.view"]);
    }

    #[test]
    fn test_failed_transform_keeps_imports() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", MAIN);
        assert!(!pipeline.run(&path).is_failed());

        fx.write("main.view", "import x from 'lib'\nview Main {\n  render <p>\n");
        assert!(pipeline.run(&path).is_failed());

        let entry = fx.cache.get(&path).unwrap();
        assert!(entry.has_error());
        assert_eq!(entry.imports, vec!["lib"]);
        assert!(fx.cache.get_imports(None).contains(&"lib".to_string()));
    }

    #[test]
    fn test_package_mode_writes_nothing() {
        let fx = fixture(&[]);
        let path = fx.write("main.view", MAIN);
        let FileOutcome::Built(built) = fx.pipeline(BuildMode::Package).run(&path) else {
            panic!("expected built");
        };
        assert!(built.output.is_none());
        assert!(!built.wrote);
        assert!(!fx.config.build.out.exists());
    }

    #[test]
    fn test_missing_source_is_removed() {
        let fx = fixture(&["gone.view"]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.config.build.app.join("gone.view");
        let outcome = pipeline.run(&path);
        assert!(matches!(outcome, FileOutcome::Removed { .. }));
        assert!(fx.gate.is_complete());
    }

    #[test]
    fn test_remove_deletes_artifact_and_entry() {
        let fx = fixture(&[]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let path = fx.write("main.view", MAIN);
        pipeline.run(&path);
        let output = fx.config.build.out.join("main.js");
        assert!(output.exists());

        pipeline.remove(&path);
        assert!(!output.exists());
        assert!(!fx.cache.contains(&path));
    }

    #[test]
    fn test_failure_counts_toward_gate() {
        let fx = fixture(&["a.view", "b.view"]);
        let pipeline = fx.pipeline(BuildMode::Watch);
        let a = fx.write("a.view", "view A {\n  oops\n}\n");
        let b = fx.write("b.view", MAIN);
        pipeline.run(&a);
        assert!(!fx.gate.is_complete());
        pipeline.run(&b);
        assert!(fx.gate.is_complete());
    }

    struct FailingHook(AtomicBool);

    impl crate::compiler::hooks::TransformHook for FailingHook {
        fn apply(&self, _file: &str, _text: String) -> Result<String, CompileError> {
            self.0.store(true, Ordering::SeqCst);
            Err(CompileError::Hook {
                phase: "post",
                message: "exit 1".into(),
            })
        }
    }

    #[test]
    fn test_post_hook_failure_after_cache_update() {
        let fx = fixture(&[]);
        let hook = Arc::new(FailingHook(AtomicBool::new(false)));
        let hooks = Hooks {
            pre: Box::new(crate::compiler::hooks::NoopHook),
            post: Box::new(ArcHook(Arc::clone(&hook))),
        };
        let pipeline = fx.pipeline(BuildMode::Watch).with_hooks(hooks);
        let path = fx.write("main.view", MAIN);

        assert!(pipeline.run(&path).is_failed());
        assert!(hook.0.load(Ordering::SeqCst));
        // Metadata from the transform survives the later failure
        assert_eq!(fx.cache.get(&path).unwrap().view_names(), vec!["Main"]);
        assert!(!fx.config.build.out.join("main.js").exists());
    }

    struct ArcHook(Arc<FailingHook>);

    impl crate::compiler::hooks::TransformHook for ArcHook {
        fn apply(&self, file: &str, text: String) -> Result<String, CompileError> {
            self.0.apply(file, text)
        }
    }
}
