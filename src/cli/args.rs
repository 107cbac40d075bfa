//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Incremental view compiler with a hot-swapping runtime
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hotview.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "hotview.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build a single packaged bundle with a source map
    #[command(visible_alias = "b")]
    Build {
        /// Skip minification of the bundle
        #[arg(long)]
        no_minify: bool,

        /// Bundle file name (without extension)
        #[arg(short, long, default_value = "app")]
        name: String,
    },

    /// Build incrementally, watch for changes and hot-swap views
    #[command(visible_alias = "s")]
    Serve {
        /// Interface for the bridge WebSocket (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port for the bridge WebSocket
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,

        /// Rebuild every file instead of skipping fresh ones
        #[arg(long)]
        no_cache: bool,
    },
}

impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["hotview", "serve", "--port", "9000", "--no-cache", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { port, no_cache, watch, .. } => {
                assert_eq!(port, Some(9000));
                assert!(no_cache);
                assert_eq!(watch, None);
            }
            Commands::Build { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_build_defaults() {
        let cli = Cli::parse_from(["hotview", "build"]);
        assert_eq!(cli.config, PathBuf::from("hotview.toml"));
        match cli.command {
            Commands::Build { no_minify, name } => {
                assert!(!no_minify);
                assert_eq!(name, "app");
            }
            Commands::Serve { .. } => panic!("expected build"),
        }
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
