//! Runtime Actor - owns the hot-update engine.
//!
//! Load passes and mutations only request a render; the render itself
//! runs once the inbox is drained, so a burst of loads produces a single
//! render. Ticks are held back until the first `Render`, which the
//! compiler sends after the initial artifacts.

use tokio::sync::mpsc;

use super::messages::RuntimeMsg;
use crate::logger::{self, Status};
use crate::runtime::{Engine, Frame, RenderError};
use crate::utils::plural_count;

pub struct RuntimeActor {
    rx: mpsc::Receiver<RuntimeMsg>,
    engine: Engine,
    started: bool,
    tick: bool,
}

impl RuntimeActor {
    pub fn new(rx: mpsc::Receiver<RuntimeMsg>, engine: Engine) -> Self {
        Self {
            rx,
            engine,
            started: false,
            tick: false,
        }
    }

    pub async fn run(mut self) -> Engine {
        loop {
            tokio::select! {
                biased;
                msg = self.rx.recv() => {
                    let Some(msg) = msg else { break };
                    if !self.handle(msg) {
                        break;
                    }
                    self.tick |= self.engine.take_tick();
                }
                () = std::future::ready(()), if self.started && self.tick => {
                    self.tick = false;
                    if let Some(result) = self.engine.run_pending() {
                        report(result);
                    }
                }
            }
        }
        crate::debug!("runtime"; "stopped");
        self.engine
    }

    /// Returns false on shutdown.
    fn handle(&mut self, msg: RuntimeMsg) -> bool {
        match msg {
            RuntimeMsg::Load { file, defs } => {
                let report = self.engine.load_file(&file, defs);
                crate::debug!(
                    "runtime";
                    "{}: {} defined, {} removed",
                    file,
                    report.classified.len(),
                    report.removed.len()
                );
            }
            RuntimeMsg::Delete { file } => {
                let removed = self.engine.delete_file(&file);
                crate::debug!("runtime"; "{}: {} torn down", file, plural_count(removed.len(), "view"));
            }
            RuntimeMsg::Set {
                instance,
                var,
                value,
            } => {
                if !self.engine.set(&instance, &var, value) {
                    crate::log!("runtime"; "no variable `{}` on {}", var, instance);
                }
            }
            RuntimeMsg::Render => {
                self.started = true;
                report(self.engine.render_now());
            }
            RuntimeMsg::Shutdown => return false,
        }
        true
    }
}

fn report(result: Result<Frame, RenderError>) {
    match result {
        Ok(frame) if frame.rolled_back.is_empty() => crate::debug!("runtime"; "rendered"),
        Ok(frame) => {
            let cause = frame.error.map(|e| e.to_string()).unwrap_or_default();
            logger::status(Status::RolledBack(&format!(
                "rolled back {}\n{}",
                frame.rolled_back.join(", "),
                cause
            )));
        }
        Err(RenderError::Reentered) => crate::debug!("runtime"; "render already running"),
        Err(e) => logger::status(Status::Failed {
            summary: "render failed",
            detail: &e.to_string(),
        }),
    }
}
