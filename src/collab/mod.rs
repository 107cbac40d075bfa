//! Collaborators at the edge of the build: the package installer and the
//! startup handshake of the bridge server.

mod handshake;
mod installer;

pub use handshake::{Handshake, HandshakeError, await_startup};
pub use installer::{CommandInstaller, Installer, NoInstaller, PeerVersion};
