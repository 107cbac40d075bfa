//! `[build]` and `[serve]` sections.
//!
//! ```toml
//! [build]
//! app = "app"                 # View sources
//! out = ".hotview/out"        # One artifact per source file
//! internal = ".hotview/internal"
//! dist = "dist"               # Packaged bundle
//! extensions = ["view"]
//! cached = true               # Skip fresh files on startup
//! minify = true
//! entry = "Main"
//!
//! [build.hooks]
//! pre = ["node", "scripts/pre.js"]
//! post = []
//!
//! [serve]
//! interface = "127.0.0.1"
//! port = 5283
//! watch = true
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub app: PathBuf,
    pub out: PathBuf,
    pub internal: PathBuf,
    pub dist: PathBuf,
    /// Source extensions (without the dot)
    pub extensions: Vec<String>,
    /// Skip files whose output and cache entry are current
    pub cached: bool,
    pub minify: bool,
    /// View rendered at the top of the tree
    pub entry: String,
    /// Grace delay (ms) before the initial build gate opens
    pub grace_ms: u64,
    pub hooks: HooksConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            app: "app".into(),
            out: ".hotview/out".into(),
            internal: ".hotview/internal".into(),
            dist: "dist".into(),
            extensions: vec!["view".into()],
            cached: true,
            minify: true,
            entry: "Main".into(),
            grace_ms: 100,
            hooks: HooksConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// External filter commands run around the transform stage.
///
/// Each command receives the file text on stdin and prints the new
/// text; an empty list disables the hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    pub pre: Vec<String>,
    pub post: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Interface the bridge WebSocket binds to
    pub interface: IpAddr,
    /// Bridge WebSocket port (0 = pick a free one)
    pub port: u16,
    pub watch: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5283,
            watch: true,
        }
    }
}
