//! Global config with atomic reload support.
//!
//! `arc-swap` gives lock-free reads and atomic replacement, so
//! `hotview.toml` can be reloaded while the watcher runs.

use super::HotviewConfig;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

static CONFIG: LazyLock<ArcSwap<HotviewConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(HotviewConfig::default()));

/// Hash of the config file content currently loaded.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn cfg() -> Arc<HotviewConfig> {
    CONFIG.load_full()
}

pub fn init_config(config: HotviewConfig) -> Arc<HotviewConfig> {
    if let Ok(content) = std::fs::read_to_string(&config.config_path) {
        CONFIG_HASH.store(crate::utils::hash::compute(&content), Ordering::Relaxed);
    }

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

/// Reload config from disk if its content changed.
///
/// Returns `Ok(true)` if the config was replaced.
pub fn reload_config() -> Result<bool> {
    let current = cfg();
    let cli = current.cli.context("config was not loaded from the CLI")?;

    let content = std::fs::read_to_string(&current.config_path)?;
    let new_hash = crate::utils::hash::compute(&content);
    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let new_config = HotviewConfig::load(cli)?;
    CONFIG.store(Arc::new(new_config));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);
    Ok(true)
}
