use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CompilerActor;
use super::tasks::{build_batch, remove_batch};
use crate::actor::messages::RuntimeMsg;
use crate::compiler::FileOutcome;
use crate::compiler::startup::{collect_sources, load_artifacts};
use crate::logger::{self, Status};
use crate::runtime::{Definition, parse_defines};
use crate::utils::plural_count;

impl CompilerActor {
    pub(super) async fn on_build(&mut self, paths: Vec<PathBuf>) {
        let start = Instant::now();
        let initial = !self.pipeline.gate().is_complete();
        crate::debug!("compile"; "{} files (initial: {})", paths.len(), initial);

        let outcomes = build_batch(Arc::clone(&self.pipeline), paths, initial).await;
        report(&outcomes, start.elapsed(), initial);
        for outcome in outcomes {
            self.route(outcome).await;
        }
    }

    pub(super) async fn on_remove(&mut self, paths: Vec<PathBuf>) {
        crate::debug!("watch"; "{} sources removed", paths.len());
        for outcome in remove_batch(Arc::clone(&self.pipeline), paths).await {
            crate::log!("watch"; "removed {}", outcome.key());
            self.route(outcome).await;
        }
    }

    /// Load every artifact on disk into the runtime, then render once.
    pub(super) async fn on_initial_load(&mut self) {
        if self.live {
            return;
        }
        let config = Arc::clone(self.pipeline.config());
        let artifacts = tokio::task::spawn_blocking(move || load_artifacts(&config))
            .await
            .unwrap_or_default();

        let count = artifacts.len();
        for (file, code) in artifacts {
            let defs = parse_defines(&code);
            let _ = self.runtime_tx.send(RuntimeMsg::Load { file, defs }).await;
        }
        let _ = self.runtime_tx.send(RuntimeMsg::Render).await;
        self.live = true;
        crate::log!("serve"; "{} loaded", plural_count(count, "file"));
    }

    /// Reload `hotview.toml` and rebuild every source under it.
    pub(super) async fn on_config_changed(&mut self) {
        match crate::config::reload_config() {
            Ok(true) => {
                let config = crate::config::cfg();
                crate::log!("watch"; "config changed, rebuilding");
                self.pipeline = Arc::new(self.pipeline.with_config(Arc::clone(&config)));
                let sources = collect_sources(&config);
                self.on_build(sources).await;
            }
            Ok(false) => crate::debug!("watch"; "config unchanged"),
            Err(e) => logger::status(Status::Failed {
                summary: "config reload failed",
                detail: &format!("{e:#}"),
            }),
        }
    }

    async fn route(&mut self, outcome: FileOutcome) {
        if !self.live {
            return;
        }
        let msg = match outcome {
            FileOutcome::Built(built) => RuntimeMsg::Load {
                defs: built.views.iter().map(Definition::from).collect(),
                file: built.key,
            },
            FileOutcome::Removed { key } => RuntimeMsg::Delete { file: key },
            FileOutcome::Failed { .. } | FileOutcome::Unchanged { .. } => return,
        };
        let _ = self.runtime_tx.send(msg).await;
    }
}

/// One summary per batch: a log line for the initial build, the status
/// block afterwards.
fn report(outcomes: &[FileOutcome], elapsed: Duration, initial: bool) {
    let mut built = 0;
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Built(_) => built += 1,
            FileOutcome::Failed { key, error } => failed.push((key, error)),
            FileOutcome::Unchanged { .. } | FileOutcome::Removed { .. } => {}
        }
    }

    if initial {
        crate::log!(
            "build";
            "{} built, {} failed{}",
            built,
            failed.len(),
            logger::elapsed_ms(elapsed)
        );
        return;
    }

    match failed.first() {
        Some((key, error)) => {
            let summary = match failed.len() {
                1 => format!("failed: {key}"),
                n => format!("{n} files failed, first: {key}"),
            };
            logger::status(Status::Failed {
                summary: &summary,
                detail: &error.to_string(),
            });
        }
        None if built == 0 => logger::status(Status::Idle("no changes")),
        None => logger::status(Status::Rebuilt(&format!(
            "rebuilt {}{}",
            plural_count(built, "file"),
            logger::elapsed_ms(elapsed)
        ))),
    }
}
