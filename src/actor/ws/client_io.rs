use std::net::TcpStream;
use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::protocol::Message;

use super::{Clients, WsActor};
use crate::actor::messages::RuntimeMsg;
use crate::runtime::Value;

const READ_POLL: Duration = Duration::from_millis(100);

impl WsActor {
    /// Complete the WebSocket handshake and register the client.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Blocking during the handshake, non-blocking for polled reads after.
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        if let Some(pending) = &self.pending_error {
            if let Err(e) = ws.send(Message::Text(pending.to_json().into())) {
                crate::log!("ws"; "failed to send pending error: {}", e);
                return;
            }
            crate::debug!("ws"; "sent pending error to new client");
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }
}

/// Background thread polling clients for requests and disconnects.
pub(super) fn client_reader_loop(clients: Clients, runtime_tx: Option<mpsc::Sender<RuntimeMsg>>) {
    while !crate::core::is_shutdown() {
        std::thread::sleep(READ_POLL);

        let mut requests = Vec::new();
        {
            let mut guard = clients.lock();
            guard.retain_mut(|ws| match ws.read() {
                Ok(Message::Text(text)) => {
                    if let Some(request) = parse_set_request(&text) {
                        requests.push(request);
                    }
                    true
                }
                Ok(Message::Close(_)) => false,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    true
                }
                Err(_) => false,
                Ok(_) => true,
            });
        }

        let Some(tx) = &runtime_tx else {
            continue;
        };
        for request in requests {
            if tx.blocking_send(request).is_err() {
                return;
            }
        }
    }
}

/// `{"type": "set", "instance": "Main/Counter#ab12", "var": "n", "value": 5}`
fn parse_set_request(text: &str) -> Option<RuntimeMsg> {
    let json = serde_json::from_str::<serde_json::Value>(text).ok()?;
    if json.get("type").and_then(|t| t.as_str()) != Some("set") {
        return None;
    }
    let instance = json.get("instance")?.as_str()?.to_string();
    let var = json.get("var")?.as_str()?.to_string();
    let value = Value::from_json(json.get("value")?);
    crate::debug!("ws"; "set {} {} = {}", instance, var, value);
    Some(RuntimeMsg::Set {
        instance,
        var,
        value,
    })
}
