//! Core types shared by the build and runtime sides.

mod driver;
mod state;

pub use driver::BuildMode;
pub use state::{is_shutdown, register_shutdown, request_shutdown, setup_shutdown_handler};
