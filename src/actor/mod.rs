//! Actor System for Watch Mode
//!
//! Message-passing concurrency between the build side and the runtime:
//!
//! ```text
//! FsActor --> CompilerActor --> RuntimeActor
//! (watch)      (pipeline)     (engine, render)
//!                   \              /
//!                    +--> WsActor <+   (bridge messages to the console)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing
//! - `compiler` - Per-file pipeline driver
//! - `runtime` - Hot-update engine owner
//! - `ws` - Bridge delivery to console clients
//! - `coordinator` - Wires up and runs actors

pub mod compiler;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod runtime;
pub mod ws;

pub use coordinator::Coordinator;
