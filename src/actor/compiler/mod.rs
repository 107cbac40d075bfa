//! Compiler Actor - Pipeline Driver
//!
//! Runs batches of sources through the per-file pipeline on the
//! blocking pool and forwards results to the runtime:
//! - `Built` -> `Load` with the file's current definitions
//! - `Removed` -> `Delete`
//!
//! Nothing is forwarded until the runtime holds the initial artifacts
//! (`InitialLoad`); before that the artifacts on disk are the source of
//! truth.

mod dispatch;
mod handlers;
mod tasks;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::mpsc;

use super::messages::{CompilerMsg, RuntimeMsg};
use crate::compiler::Pipeline;

pub struct CompilerActor {
    pub(super) rx: mpsc::Receiver<CompilerMsg>,
    pub(super) runtime_tx: mpsc::Sender<RuntimeMsg>,
    pub(super) pipeline: Arc<Pipeline>,
    /// Runtime has been handed the initial artifacts
    pub(super) live: bool,
}

impl CompilerActor {
    pub fn new(
        rx: mpsc::Receiver<CompilerMsg>,
        runtime_tx: mpsc::Sender<RuntimeMsg>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Self {
            rx,
            runtime_tx,
            pipeline,
            live: false,
        }
    }
}
