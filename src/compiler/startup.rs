//! Startup: orphan cleanup and the initial build plan.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::collect_all_files;
use super::write::remove_artifact;
use crate::cache::BuildCache;
use crate::config::HotviewConfig;
use crate::core::BuildMode;
use crate::freshness::{Staleness, get_mtime};

/// Every view source under the app dir, sorted.
pub fn collect_sources(config: &HotviewConfig) -> Vec<PathBuf> {
    let mut sources: Vec<_> = collect_all_files(&config.build.app)
        .into_iter()
        .filter(|p| config.is_source(p))
        .collect();
    sources.sort();
    sources
}

/// Delete artifacts whose source was removed while nothing was watching,
/// in both the out and the internal tree. Source maps are left alone.
/// Returns the number of files deleted.
pub fn cleanup_orphans(config: &HotviewConfig) -> usize {
    let mut removed = 0;
    for tree in [&config.build.out, &config.build.internal] {
        for output in collect_all_files(tree) {
            if output.extension().is_none_or(|ext| ext != "js") {
                continue;
            }
            if source_in_tree(config, tree, &output).is_some() {
                continue;
            }
            match remove_artifact(&output) {
                Ok(true) => {
                    crate::debug!("startup"; "removed orphan {}", config.rel_key(&output));
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => crate::log!("startup"; "failed to remove {}: {}", output.display(), e),
            }
        }
    }
    removed
}

/// Which initially enumerated files go through the pipeline.
#[derive(Debug, Default)]
pub struct InitialPlan {
    pub build: Vec<PathBuf>,
    /// Output and cache are current
    pub fresh: Vec<PathBuf>,
    /// Source could not be stat'd
    pub removed: Vec<PathBuf>,
}

impl InitialPlan {
    /// Files that reach a terminal state without running the pipeline.
    pub fn skipped(&self) -> impl Iterator<Item = &Path> {
        self.fresh.iter().chain(&self.removed).map(PathBuf::as_path)
    }
}

/// Decide, per source, whether the initial build may skip it.
///
/// Skipping needs `build.cached` and watch mode. Otherwise every file is
/// carried over from the previous snapshot and rebuilt.
pub fn plan_initial(
    config: &HotviewConfig,
    cache: &BuildCache,
    mode: BuildMode,
    sources: Vec<PathBuf>,
) -> InitialPlan {
    let mut plan = InitialPlan::default();

    if !config.build.cached || !mode.allows_skip() {
        for source in &sources {
            cache.restore_previous(source);
        }
        plan.build = sources;
        return plan;
    }

    for source in sources {
        if cache.get_previous(&source).is_some_and(|prev| prev.internal) {
            cache.restore_previous(&source);
            plan.fresh.push(source);
            continue;
        }

        let Some(output) = config.output_for(&source) else {
            plan.build.push(source);
            continue;
        };

        match cache.staleness(&source, &output) {
            Staleness::Fresh => {
                cache.restore_previous(&source);
                plan.fresh.push(source);
            }
            Staleness::Removed => {
                crate::debug!("startup"; "{}: src file removed", cache.key(&source));
                plan.removed.push(source);
            }
            stale @ Staleness::Stale(_) => {
                crate::debug!("startup"; "{}: {}", cache.key(&source), stale.label());
                plan.build.push(source);
            }
        }
    }

    crate::debug!(
        "startup";
        "{} to build, {} fresh, {} removed",
        plan.build.len(),
        plan.fresh.len(),
        plan.removed.len()
    );
    plan
}

/// Built artifacts as `(source key, code)`, internal tree first.
///
/// Used to hand the runtime every definition once the initial build
/// gate opens, including files the initial build skipped.
pub fn load_artifacts(config: &HotviewConfig) -> Vec<(String, String)> {
    let mut artifacts: Vec<(String, String, Option<SystemTime>)> = Vec::new();
    for tree in [&config.build.internal, &config.build.out] {
        let mut outputs: Vec<_> = collect_all_files(tree)
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "js"))
            .collect();
        outputs.sort();

        for output in outputs {
            let Some(source) = source_in_tree(config, tree, &output) else {
                continue;
            };
            let code = match std::fs::read_to_string(&output) {
                Ok(code) => code,
                Err(e) => {
                    crate::log!("startup"; "failed to read {}: {}", output.display(), e);
                    continue;
                }
            };
            let key = config.rel_key(&source);
            let modified = get_mtime(&output);
            // A source has one artifact; a leftover in the other tree loses to the newer one
            match artifacts.iter_mut().find(|(k, _, _)| *k == key) {
                Some(existing) => {
                    crate::debug!("startup"; "{} has artifacts in both trees", key);
                    if modified > existing.2 {
                        *existing = (key, code, modified);
                    }
                }
                None => artifacts.push((key, code, modified)),
            }
        }
    }
    artifacts.into_iter().map(|(key, code, _)| (key, code)).collect()
}

fn source_in_tree(config: &HotviewConfig, tree: &Path, output: &Path) -> Option<PathBuf> {
    let rel = output.strip_prefix(tree).ok()?;
    config
        .build
        .extensions
        .iter()
        .map(|ext| config.build.app.join(rel).with_extension(ext))
        .find(|candidate| candidate.exists())
}
