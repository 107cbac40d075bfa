//! Actor Message Definitions
//!
//! ```text
//! FsActor --Build/Remove--> CompilerActor --Load/Delete--> RuntimeActor
//!                                 |                             |
//!                                 +--------[Publish]--> WsActor <+
//! ```

use std::net::TcpStream;
use std::path::PathBuf;

use crate::bridge::BridgeMessage;
use crate::runtime::{Definition, Value};

// =============================================================================
// CompilerActor Messages
// =============================================================================

#[derive(Debug)]
pub enum CompilerMsg {
    /// Run created or modified sources through the pipeline
    Build(Vec<PathBuf>),
    /// Sources deleted from disk
    Remove(Vec<PathBuf>),
    /// The initial build gate opened: hand the runtime every artifact
    InitialLoad,
    /// `hotview.toml` changed
    ConfigChanged,
    Shutdown,
}

// =============================================================================
// RuntimeActor Messages
// =============================================================================

#[derive(Debug)]
pub enum RuntimeMsg {
    /// One load pass: every definition a file currently has
    Load { file: String, defs: Vec<Definition> },
    /// A source was deleted; tear its views down
    Delete { file: String },
    /// Write the live value of a memoized variable
    Set {
        instance: String,
        var: String,
        value: Value,
    },
    /// Render immediately instead of waiting for the next tick
    Render,
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

pub enum WsMsg {
    /// Forward a bridge message to every console client
    Publish(BridgeMessage),
    /// Accepted connection, handshake pending
    AddClient(TcpStream),
    Shutdown,
}
