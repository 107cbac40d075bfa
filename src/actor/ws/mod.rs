//! WebSocket Actor - Console Bridge Delivery
//!
//! This actor is responsible for:
//! - Managing console client connections
//! - Broadcasting bridge messages to every client, in publish order
//! - Replaying the pending error to clients that connect late
//! - Forwarding `set` requests from clients to the runtime
//!
//! # Architecture
//!
//! ```text
//! Pipeline/Engine --[Publish]--> WsActor --[broadcast]--> Clients
//!                                   |                        |
//!       RuntimeActor <--[Set]-------+--------[set]-----------+
//! ```

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::messages::{RuntimeMsg, WsMsg};
use crate::bridge::BridgeMessage;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

pub struct WsActor {
    rx: mpsc::UnboundedReceiver<WsMsg>,
    clients: Clients,
    /// Error still showing on the console, replayed to new clients
    pending_error: Option<BridgeMessage>,
    runtime_tx: Option<mpsc::Sender<RuntimeMsg>>,
}

impl WsActor {
    pub fn new(rx: mpsc::UnboundedReceiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: None,
            runtime_tx: None,
        }
    }

    /// Error restored from the cache snapshot.
    pub fn with_pending_error(mut self, error: Option<BridgeMessage>) -> Self {
        self.pending_error = error;
        self
    }

    /// Accept `set` requests from clients.
    pub fn with_runtime(mut self, tx: mpsc::Sender<RuntimeMsg>) -> Self {
        self.runtime_tx = Some(tx);
        self
    }

    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        let runtime_tx = self.runtime_tx.clone();
        std::thread::spawn(move || {
            client_io::client_reader_loop(clients_for_reader, runtime_tx);
        });

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Publish(message) => {
                    self.track_pending(&message);
                    self.broadcast(Message::Text(message.to_json().into()));
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    let mut clients = self.clients.lock();
                    for mut ws in clients.drain(..) {
                        let _ = ws.close(None);
                    }
                    break;
                }
            }
        }
    }

    /// The pending error is the last error published; a success for the
    /// same file clears it.
    fn track_pending(&mut self, message: &BridgeMessage) {
        if message.is_error() {
            self.pending_error = Some(message.clone());
            return;
        }
        if message.kind() == "success"
            && let Some(pending) = &self.pending_error
            && pending.file() == message.file()
        {
            self.pending_error = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ErrorRecord;

    fn actor() -> WsActor {
        let (_tx, rx) = mpsc::unbounded_channel();
        WsActor::new(rx)
    }

    #[test]
    fn test_pending_error_cleared_by_same_file() {
        let mut ws = actor();
        ws.track_pending(&BridgeMessage::error(ErrorRecord::new("app/a.view", "boom", 1)));
        ws.track_pending(&BridgeMessage::compiled("app/b.view"));
        assert!(ws.pending_error.is_some());

        ws.track_pending(&BridgeMessage::compiled("app/a.view"));
        assert!(ws.pending_error.is_none());
    }

    #[test]
    fn test_warning_is_not_pending() {
        let mut ws = actor();
        ws.track_pending(&BridgeMessage::warning(ErrorRecord::new("app/a.view", "twice", 1)));
        assert!(ws.pending_error.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(WsActor::new(rx).run());
        tx.send(WsMsg::Publish(BridgeMessage::rendered())).unwrap();
        tx.send(WsMsg::Shutdown).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
