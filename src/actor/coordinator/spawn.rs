use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::compiler::CompilerActor;
use crate::actor::fs::FsActor;
use crate::actor::messages::{CompilerMsg, RuntimeMsg, WsMsg};
use crate::actor::runtime::RuntimeActor;
use crate::actor::ws::WsActor;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

pub(super) struct Actors {
    pub fs: Option<FsActor>,
    pub compiler: CompilerActor,
    pub runtime: RuntimeActor,
    pub ws: WsActor,
}

pub(super) struct Senders {
    pub compiler: mpsc::Sender<CompilerMsg>,
    pub runtime: mpsc::Sender<RuntimeMsg>,
    pub ws: mpsc::UnboundedSender<WsMsg>,
}

/// Run all actors until the shutdown signal, then stop them in
/// pipeline order so the last build reaches the runtime.
pub(super) async fn run_actors(
    actors: Actors,
    senders: Senders,
    shutdown_rx: Option<Receiver<()>>,
) -> Result<()> {
    let Actors {
        fs,
        compiler,
        runtime,
        ws,
    } = actors;

    let fs_handle = fs.map(|fs| tokio::spawn(fs.run()));
    let compiler_handle = tokio::spawn(compiler.run());
    let runtime_handle = tokio::spawn(runtime.run());
    let ws_handle = tokio::spawn(ws.run());

    match shutdown_rx {
        Some(rx) => loop {
            if rx.try_recv().is_ok() || crate::core::is_shutdown() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            tokio::time::sleep(SHUTDOWN_POLL).await;
        },
        None => {
            let _ = runtime_handle.await;
            return Ok(());
        }
    }

    if let Some(handle) = fs_handle {
        handle.abort();
    }
    let _ = senders.compiler.send(CompilerMsg::Shutdown).await;
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, compiler_handle).await;
    let _ = senders.runtime.send(RuntimeMsg::Shutdown).await;
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, runtime_handle).await;
    let _ = senders.ws.send(WsMsg::Shutdown);
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, ws_handle).await;

    Ok(())
}
