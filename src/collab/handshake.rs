//! Startup handshake.
//!
//! A collaborator that starts a server reports `{port, host}` once it is
//! listening. The initiator waits for it with a timeout; a collaborator
//! that dies or stays silent rejects the wait with `HandshakeError`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("no startup report within {0:?}")]
    Timeout(Duration),

    #[error("process exited before reporting startup")]
    Closed,

    #[error("malformed startup report")]
    Malformed(#[from] serde_json::Error),
}

impl Handshake {
    pub fn new(port: u16, host: impl Into<String>) -> Self {
        Self {
            port,
            host: host.into(),
        }
    }

    /// Parse a `{"port": .., "host": ..}` process message.
    pub fn parse(message: &str) -> Result<Self, HandshakeError> {
        Ok(serde_json::from_str(message)?)
    }

    /// `host[:port]`; port 80 is left implicit.
    pub fn url(&self) -> String {
        match self.port {
            0 | 80 => self.host.clone(),
            port => format!("{}:{}", self.host, port),
        }
    }
}

/// Wait for the startup report.
pub async fn await_startup(
    rx: oneshot::Receiver<Handshake>,
    timeout: Duration,
) -> Result<Handshake, HandshakeError> {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(handshake)) => Ok(handshake),
        Ok(Err(_)) => Err(HandshakeError::Closed),
        Err(_) => Err(HandshakeError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        assert_eq!(Handshake::new(80, "localhost").url(), "localhost");
        assert_eq!(Handshake::new(4000, "localhost").url(), "localhost:4000");
    }

    #[test]
    fn test_parse() {
        let hs = Handshake::parse(r#"{"port": 4000, "host": "0.0.0.0"}"#).unwrap();
        assert_eq!(hs, Handshake::new(4000, "0.0.0.0"));
        assert!(matches!(
            Handshake::parse("{\"port\": 1}"),
            Err(HandshakeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_await_startup_reported() {
        let (tx, rx) = oneshot::channel();
        tx.send(Handshake::new(5283, "127.0.0.1")).unwrap();
        let hs = await_startup(rx, Duration::from_secs(1)).await.unwrap();
        assert_eq!(hs.port, 5283);
    }

    #[tokio::test]
    async fn test_await_startup_closed() {
        let (tx, rx) = oneshot::channel::<Handshake>();
        drop(tx);
        assert!(matches!(
            await_startup(rx, Duration::from_secs(1)).await,
            Err(HandshakeError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_await_startup_timeout() {
        let (_tx, rx) = oneshot::channel::<Handshake>();
        assert!(matches!(
            await_startup(rx, Duration::from_millis(20)).await,
            Err(HandshakeError::Timeout(_))
        ));
    }
}
