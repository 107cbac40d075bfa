//! Project configuration (`hotview.toml`).
//!
//! ```text
//! config/
//! ├── section.rs   # [build], [build.hooks], [serve]
//! ├── handle.rs    # Global config handle (arc-swap)
//! ├── error.rs     # ConfigError
//! └── util.rs      # Config file discovery
//! ```
//!
//! | Section          | Purpose                                          |
//! |------------------|--------------------------------------------------|
//! | `[build]`        | Source/output dirs, staleness skip, minify, entry |
//! | `[build.hooks]`  | External pre/post transform filters              |
//! | `[serve]`        | Bridge WebSocket address, file watching          |

mod error;
mod handle;
mod section;
mod util;

pub use error::ConfigError;
pub use handle::{cfg, init_config, reload_config};
pub use section::{BuildConfig, HooksConfig, ServeConfig};

use crate::cli::{Cli, Commands};
use crate::log;
use crate::utils::path::{has_extension, normalize_path, with_ext};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use util::find_config_file;

/// Root configuration (`hotview.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotviewConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root - parent of the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl HotviewConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file; without one the
    /// defaults apply with cwd as the project root.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        config.config_path = config_path;
        config.cli = Some(cli);

        let root = config
            .config_path
            .parent()
            .map_or(cwd, Path::to_path_buf);
        config.finalize(&root);
        config.apply_command_options(cli);
        config.validate()?;
        Ok(config)
    }

    /// Default configuration rooted at `root`, with all paths resolved.
    pub fn for_root(root: &Path) -> Self {
        let mut config = Self::default();
        config.config_path = root.join("hotview.toml");
        config.finalize(root);
        config
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, _) = Self::parse_with_ignored(content)?;
        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Resolve the root and make every configured directory absolute.
    fn finalize(&mut self, root: &Path) {
        let root = normalize_path(root);
        let build = &mut self.build;
        for dir in [
            &mut build.app,
            &mut build.out,
            &mut build.internal,
            &mut build.dist,
        ] {
            *dir = root.join(&*dir);
        }
        self.root = root;
    }

    /// CLI flags override file values.
    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        match &cli.command {
            Commands::Build { no_minify, .. } => {
                if *no_minify {
                    self.build.minify = false;
                }
            }
            Commands::Serve {
                interface,
                port,
                watch,
                no_cache,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
                if *no_cache {
                    self.build.cached = false;
                }
            }
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.build.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "build.extensions must not be empty".into(),
            ));
        }
        if self.build.entry.trim().is_empty() {
            return Err(ConfigError::Validation("build.entry must name a view".into()));
        }
        if self.build.out == self.build.app || self.build.internal == self.build.app {
            return Err(ConfigError::Validation(
                "build.out and build.internal must differ from build.app".into(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Paths
    // ========================================================================

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the project root, `/`-separated.
    pub fn rel_key(&self, path: &Path) -> String {
        crate::utils::path::rel_key(&self.root, path)
    }

    /// Whether `path` is a view source under the app dir.
    pub fn is_source(&self, path: &Path) -> bool {
        path.starts_with(&self.build.app) && has_extension(path, &self.build.extensions)
    }

    /// Artifact path of a source in the main output tree.
    pub fn output_for(&self, source: &Path) -> Option<PathBuf> {
        with_ext(source, &self.build.app, &self.build.out, "js")
    }

    /// Artifact path of a source in the internal output tree.
    pub fn internal_output_for(&self, source: &Path) -> Option<PathBuf> {
        with_ext(source, &self.build.app, &self.build.internal, "js")
    }

    /// Source path an output artifact was produced from, for every
    /// configured extension that exists on disk.
    pub fn source_for(&self, output: &Path) -> Option<PathBuf> {
        let rel = output.strip_prefix(&self.build.out).ok()?;
        self.build
            .extensions
            .iter()
            .map(|ext| self.build.app.join(rel).with_extension(ext))
            .find(|candidate| candidate.exists())
    }

    /// Where watch mode presents rendered markup.
    pub fn surface_path(&self) -> PathBuf {
        self.build.out.join("index.html")
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config, panicking on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> HotviewConfig {
    let (parsed, ignored) = HotviewConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
