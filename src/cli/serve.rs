//! Watch mode: incremental builds with hot-swapped views.

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel;

use crate::actor::Coordinator;
use crate::config::HotviewConfig;
use crate::core::register_shutdown;

/// Run the actor system until Ctrl+C.
pub fn serve(config: Arc<HotviewConfig>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
    register_shutdown(shutdown_tx);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        Coordinator::with_config(config)
            .with_shutdown_signal(shutdown_rx)
            .run()
            .await
    })
}
