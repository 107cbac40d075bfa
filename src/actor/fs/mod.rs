//! FileSystem Actor
//!
//! Watches the app dir and the config file, and sends debounced changes
//! to the CompilerActor. The watcher is attached before the initial
//! build starts, so edits made during that build are not lost.
//!
//! ```text
//! Watcher → Debouncer (timing) → Classifier (sources, cache) → CompilerMsg
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::CompilerMsg;
use crate::cache::BuildCache;
use crate::config::HotviewConfig;

// Raw changes -> actionable changes.
mod classifier;
// Timing and per-path merging.
mod debouncer;
// Actionable changes -> CompilerMsg.
mod router;
mod types;
// Watch root attach/re-attach.
mod watch_roots;


use classifier::EventClassifier;
use debouncer::Debouncer;
use router::{events_to_messages, log_events};
use watch_roots::WatchRoots;

pub struct FsActor {
    /// notify callback -> actor (sync side)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Must stay alive for events to flow
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    compiler_tx: mpsc::Sender<CompilerMsg>,
    debouncer: Debouncer,
    config: Arc<HotviewConfig>,
    cache: Arc<BuildCache>,
}

impl FsActor {
    /// Start watching immediately; events buffer until `run` is polled.
    pub fn new(
        paths: Vec<PathBuf>,
        compiler_tx: mpsc::Sender<CompilerMsg>,
        config: Arc<HotviewConfig>,
        cache: Arc<BuildCache>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(paths);
        watch_roots.attach_existing(&mut watcher)?;
        crate::debug!("watch"; "watching {} roots", watch_roots.attached());

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            compiler_tx,
            debouncer: Debouncer::new(),
            config,
            cache,
        })
    }

    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            compiler_tx,
            mut debouncer,
            config,
            cache,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    if process_changes(&mut debouncer, &compiler_tx, &config, &cache).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Returns `Err(())` once the CompilerActor is gone.
async fn process_changes(
    debouncer: &mut Debouncer,
    compiler_tx: &mpsc::Sender<CompilerMsg>,
    config: &HotviewConfig,
    cache: &BuildCache,
) -> Result<(), ()> {
    if crate::core::is_shutdown() {
        return Err(());
    }

    let Some(raw) = debouncer.take_if_ready() else {
        return Ok(());
    };
    let Some(events) = EventClassifier::classify(raw, config, cache) else {
        return Ok(());
    };

    log_events(&events);
    for msg in events_to_messages(events, config) {
        compiler_tx.send(msg).await.map_err(|_| ())?;
    }
    Ok(())
}
