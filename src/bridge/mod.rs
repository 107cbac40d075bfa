//! One-way notification channel to an observing console.
//!
//! ```text
//! Orchestrator --+
//!                +--[BridgeMessage]--> Bridge --> WsActor --> console clients
//! Engine --------+
//! ```
//!
//! Publishing never blocks and never fails the caller: a bridge with no
//! listener drops messages. Messages are delivered in publish order, so
//! per-file order is preserved.

mod message;
pub mod server;

pub use message::{BridgeMessage, Payload, Severity};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;

pub trait Bridge: Send + Sync {
    fn publish(&self, message: BridgeMessage);
}

/// Forwards messages to the WebSocket actor.
#[derive(Clone)]
pub struct ChannelBridge {
    tx: mpsc::UnboundedSender<WsMsg>,
}

impl ChannelBridge {
    pub fn new(tx: mpsc::UnboundedSender<WsMsg>) -> Self {
        Self { tx }
    }
}

impl Bridge for ChannelBridge {
    fn publish(&self, message: BridgeMessage) {
        crate::debug!("bridge"; "{} {}", message.kind(), message.file().unwrap_or("-"));
        let _ = self.tx.send(WsMsg::Publish(message));
    }
}

/// Collects messages in memory (packaged builds and tests).
#[derive(Default)]
pub struct MemoryBridge {
    messages: Mutex<Vec<BridgeMessage>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<BridgeMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.messages.lock().iter().map(BridgeMessage::kind).collect()
    }
}

impl Bridge for MemoryBridge {
    fn publish(&self, message: BridgeMessage) {
        self.messages.lock().push(message);
    }
}
