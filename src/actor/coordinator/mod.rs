//! Actor Coordinator - Wires up Watch Mode
//!
//! Startup, in order:
//! 1. Bind the bridge server and wait for its handshake
//! 2. Open the cache and delete orphaned artifacts
//! 3. Attach the watcher (edits from here on are buffered)
//! 4. Plan the initial build; skipped files report to the gate at once
//! 5. Start the actors and queue the initial build
//! 6. When the gate opens, the runtime receives every artifact and renders

mod spawn;
mod watch_paths;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::{mpsc, oneshot};

use super::compiler::CompilerActor;
use super::fs::FsActor;
use super::messages::{CompilerMsg, RuntimeMsg, WsMsg};
use super::runtime::RuntimeActor;
use super::ws::WsActor;
use crate::bridge::server::spawn_bridge_server;
use crate::bridge::{Bridge, BridgeMessage, ChannelBridge};
use crate::cache::BuildCache;
use crate::collab::{CommandInstaller, await_startup};
use crate::compiler::startup::{cleanup_orphans, collect_sources, plan_initial};
use crate::compiler::{InitialBuild, Pipeline};
use crate::config::HotviewConfig;
use crate::core::BuildMode;
use crate::runtime::{Engine, FileSurface};

const CHANNEL_BUFFER: usize = 32;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Coordinator {
    config: Arc<HotviewConfig>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn with_config(config: Arc<HotviewConfig>) -> Self {
        Self {
            config,
            shutdown_rx: None,
        }
    }

    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    pub async fn run(mut self) -> Result<()> {
        let config = Arc::clone(&self.config);
        let (compiler_tx, compiler_rx) = mpsc::channel::<CompilerMsg>(CHANNEL_BUFFER);
        let (runtime_tx, runtime_rx) = mpsc::channel::<RuntimeMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::unbounded_channel::<WsMsg>();
        let bridge: Arc<dyn Bridge> = Arc::new(ChannelBridge::new(ws_tx.clone()));

        let (ready_tx, ready_rx) = oneshot::channel();
        spawn_bridge_server(config.serve.interface, config.serve.port, ws_tx.clone(), ready_tx);
        match await_startup(ready_rx, HANDSHAKE_TIMEOUT).await {
            Ok(handshake) => crate::log!("bridge"; "listening on ws://{}", handshake.url()),
            Err(e) => crate::log!("bridge"; "server not started: {}", e),
        }

        let cache = Arc::new(BuildCache::open(&config.root));
        let orphans = cleanup_orphans(&config);
        if orphans > 0 {
            crate::log!("serve"; "removed {} orphaned artifacts", orphans);
        }

        let fs = if config.serve.watch {
            let paths = watch_paths::collect_watch_paths(&config);
            let actor = FsActor::new(paths, compiler_tx.clone(), Arc::clone(&config), Arc::clone(&cache))
                .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
            Some(actor)
        } else {
            None
        };

        let sources = collect_sources(&config);
        let gate = InitialBuild::new(sources.iter().map(|s| cache.key(s)), config.build.grace());
        let plan = plan_initial(&config, &cache, BuildMode::Watch, sources);
        for path in plan.skipped() {
            gate.mark_done(&cache.key(path));
        }
        crate::log!(
            "serve";
            "{} files: {} to build, {} fresh",
            gate.total(),
            plan.build.len(),
            plan.fresh.len()
        );

        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&config),
            Arc::clone(&cache),
            Arc::clone(&bridge),
            Arc::new(CommandInstaller::new(&config.root)),
            Arc::clone(&gate),
            BuildMode::Watch,
        ));

        let surface = FileSurface::new(config.surface_path(), config.build.entry.clone());
        let engine = Engine::new(config.build.entry.clone(), Box::new(surface), Arc::clone(&bridge));

        let pending = cache.get_last_error().map(BridgeMessage::error);
        let actors = spawn::Actors {
            fs,
            compiler: CompilerActor::new(compiler_rx, runtime_tx.clone(), pipeline),
            runtime: RuntimeActor::new(runtime_rx, engine),
            ws: WsActor::new(ws_rx)
                .with_pending_error(pending)
                .with_runtime(runtime_tx.clone()),
        };

        if !plan.removed.is_empty() {
            compiler_tx.send(CompilerMsg::Remove(plan.removed)).await?;
        }
        if !plan.build.is_empty() {
            compiler_tx.send(CompilerMsg::Build(plan.build)).await?;
        }
        let loader_tx = compiler_tx.clone();
        tokio::spawn(async move {
            gate.wait().await;
            let _ = loader_tx.send(CompilerMsg::InitialLoad).await;
        });

        crate::debug!("actor"; "start");
        let senders = spawn::Senders {
            compiler: compiler_tx,
            runtime: runtime_tx,
            ws: ws_tx,
        };
        spawn::run_actors(actors, senders, self.shutdown_rx.take()).await?;

        cache.flush_now();
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
