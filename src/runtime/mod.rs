//! Runtime side: live view registry and hot swapping.
//!
//! ```text
//! artifact ──parse_defines──► Engine::load_file
//!                                │ classify: New | Duplicate | Unchanged | Changed
//!                                │ register, arm rollback, diff removed names
//!                                ▼
//!                          RenderScheduler (one render per tick)
//!                                │
//!                                ▼
//!                    Renderer ── MemoStore (per-instance slots)
//!                                │ fail -> roll back armed views, retry once
//!                                ▼
//!                             Surface
//! ```

pub mod engine;
pub mod lifecycle;
pub mod memo;
pub mod registry;
pub mod render;
pub mod rollback;
pub mod schedule;
pub mod script;
pub mod surface;
pub mod value;

pub use engine::{Engine, Frame, LoadReport};
pub use registry::{Classification, Implementation};
pub use render::RenderError;
pub use script::{Definition, parse_defines};
pub use surface::{FileSurface, MemorySurface, Surface};
pub use value::Value;
