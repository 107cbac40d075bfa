//! WebSocket listener for bridge clients.
//!
//! Accepted streams are handed to `WsActor`, which owns the handshake
//! and all writes. Once bound, the listener reports its address as a
//! startup handshake.

use std::net::{IpAddr, TcpListener};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

use crate::actor::messages::WsMsg;
use crate::collab::Handshake;

/// Ports tried after the configured one is taken
const MAX_PORT_RETRIES: u16 = 10;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Bind the listener on a background thread.
///
/// The bound address (or nothing, if binding failed) is reported through
/// `ready`; the caller awaits it with `collab::await_startup`.
pub fn spawn_bridge_server(
    interface: IpAddr,
    base_port: u16,
    ws_tx: mpsc::UnboundedSender<WsMsg>,
    ready: oneshot::Sender<Handshake>,
) {
    std::thread::spawn(move || {
        let listener = match try_bind_port(interface, base_port, MAX_PORT_RETRIES) {
            Ok(listener) => listener,
            Err(e) => {
                crate::log!("bridge"; "{}", e);
                return;
            }
        };

        let port = listener.local_addr().map(|a| a.port()).unwrap_or(base_port);
        if listener.set_nonblocking(true).is_err()
            || ready.send(Handshake::new(port, interface.to_string())).is_err()
        {
            return;
        }

        accept_loop(&listener, &ws_tx);
    });
}

fn accept_loop(listener: &TcpListener, ws_tx: &mpsc::UnboundedSender<WsMsg>) {
    while !crate::core::is_shutdown() {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("bridge"; "client connected: {}", addr);
                let _ = stream.set_nonblocking(false);
                if ws_tx.send(WsMsg::AddClient(stream)).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                crate::log!("bridge"; "accept error: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Bind `base_port`, or the next free port after it.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<TcpListener> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind bridge server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
