//! Packaged build.
//!
//! Phases:
//! - **Collect** - every source under the app dir
//! - **Transform** - parallel pipeline runs, nothing written per file
//! - **Package** - concatenate, minify, emit `<dist>/<name>.js` + map

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use rayon::prelude::*;

use crate::bridge::MemoryBridge;
use crate::cache::BuildCache;
use crate::collab::NoInstaller;
use crate::compiler::bundle;
use crate::compiler::startup::collect_sources;
use crate::compiler::{Built, FileOutcome, InitialBuild, Pipeline};
use crate::config::HotviewConfig;
use crate::core::{BuildMode, is_shutdown};
use crate::logger::{self, ProgressLine};
use crate::utils::plural_count;

/// Build the packaged bundle. Returns the bundle path.
pub fn build_package(config: Arc<HotviewConfig>, name: &str, quiet: bool) -> Result<PathBuf> {
    let started = Instant::now();
    let sources = collect_sources(&config);
    if sources.is_empty() {
        bail!("no sources found in {}", config.build.app.display());
    }

    let cache = Arc::new(BuildCache::new(&config.root));
    let gate = InitialBuild::new(sources.iter().map(|s| cache.key(s)), Duration::ZERO);
    let pipeline = Pipeline::new(
        Arc::clone(&config),
        cache,
        Arc::new(MemoryBridge::new()),
        Arc::new(NoInstaller),
        gate,
        BuildMode::Package,
    );

    let progress = (!quiet).then(|| ProgressLine::new("files", sources.len()));
    let outcomes: Vec<FileOutcome> = sources
        .par_iter()
        .map(|path| {
            let outcome = pipeline.run(path);
            if let Some(p) = &progress {
                p.inc();
            }
            outcome
        })
        .collect();
    if let Some(p) = progress {
        p.finish();
    }

    if is_shutdown() {
        bail!("build interrupted");
    }

    let (built, failed) = split_outcomes(outcomes);
    for (key, error) in &failed {
        crate::log!("error"; "{}: {}", key, error);
    }
    if !failed.is_empty() {
        bail!("{} failed to compile", plural_count(failed.len(), "file"));
    }

    let package = bundle::package(&built, name, config.build.minify)?;
    let path = bundle::write_bundle(&config.build.dist, &package)?;

    crate::log!(
        "build";
        "{} -> {}{}",
        plural_count(built.len(), "file"),
        config.rel_key(&path),
        logger::elapsed_ms(started.elapsed())
    );
    Ok(path)
}

fn split_outcomes(outcomes: Vec<FileOutcome>) -> (Vec<Built>, Vec<(String, String)>) {
    let mut built = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Built(b) => built.push(b),
            FileOutcome::Failed { key, error } => failed.push((key, error.to_string())),
            FileOutcome::Unchanged { .. } | FileOutcome::Removed { .. } => {}
        }
    }
    (built, failed)
}
