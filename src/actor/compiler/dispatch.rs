use super::CompilerActor;
use crate::actor::messages::CompilerMsg;

impl CompilerActor {
    /// Main event loop. Batches run one at a time, so per-file results
    /// reach the runtime in the order the files were built.
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            if !self.dispatch(msg).await {
                break;
            }
        }
        self.pipeline.cache().flush_now();
        crate::debug!("compile"; "stopped");
    }

    /// Returns false on shutdown.
    async fn dispatch(&mut self, msg: CompilerMsg) -> bool {
        match msg {
            CompilerMsg::Build(paths) => self.on_build(paths).await,
            CompilerMsg::Remove(paths) => self.on_remove(paths).await,
            CompilerMsg::InitialLoad => self.on_initial_load().await,
            CompilerMsg::ConfigChanged => self.on_config_changed().await,
            CompilerMsg::Shutdown => {
                crate::debug!("compile"; "shutting down");
                return false;
            }
        }
        true
    }
}
