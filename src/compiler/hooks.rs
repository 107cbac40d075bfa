//! Pre/post transform hooks.
//!
//! The pre hook sees the raw source text, the post hook the generated
//! code. Both return the text to continue with.

use std::path::{Path, PathBuf};

use super::error::CompileError;
use crate::config::HooksConfig;
use crate::utils::exec::Cmd;

pub trait TransformHook: Send + Sync {
    fn apply(&self, file: &str, text: String) -> Result<String, CompileError>;
}

/// Passes text through unchanged.
pub struct NoopHook;

impl TransformHook for NoopHook {
    fn apply(&self, _file: &str, text: String) -> Result<String, CompileError> {
        Ok(text)
    }
}

/// Pipes text through an external command (stdin -> stdout).
///
/// The command runs in the project root with `HOTVIEW_FILE` set to the
/// root-relative path of the file being built.
pub struct CommandHook {
    phase: &'static str,
    command: Vec<String>,
    root: PathBuf,
}

impl CommandHook {
    pub fn new(phase: &'static str, command: Vec<String>, root: &Path) -> Self {
        Self {
            phase,
            command,
            root: root.to_path_buf(),
        }
    }
}

impl TransformHook for CommandHook {
    fn apply(&self, file: &str, text: String) -> Result<String, CompileError> {
        let hook_err = |message: String| CompileError::Hook {
            phase: self.phase,
            message,
        };

        let output = Cmd::from_slice(&self.command)
            .cwd(&self.root)
            .env("HOTVIEW_FILE", file)
            .stdin(text)
            .run()
            .map_err(|e| hook_err(e.to_string()))?;

        String::from_utf8(output.stdout).map_err(|_| hook_err("output is not UTF-8".into()))
    }
}

pub struct Hooks {
    pub pre: Box<dyn TransformHook>,
    pub post: Box<dyn TransformHook>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            pre: Box::new(NoopHook),
            post: Box::new(NoopHook),
        }
    }
}

impl Hooks {
    pub fn from_config(config: &HooksConfig, root: &Path) -> Self {
        let make = |phase: &'static str, command: &[String]| -> Box<dyn TransformHook> {
            if command.is_empty() {
                Box::new(NoopHook)
            } else {
                Box::new(CommandHook::new(phase, command.to_vec(), root))
            }
        };
        Self {
            pre: make("pre", &config.pre),
            post: make("post", &config.post),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_noop_passes_through() {
        assert_eq!(NoopHook.apply("a.view", "x".into()).unwrap(), "x");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_hook_filters() {
        let dir = TempDir::new().unwrap();
        let hook = CommandHook::new("pre", vec!["tr".into(), "a-z".into(), "A-Z".into()], dir.path());
        assert_eq!(hook.apply("a.view", "abc".into()).unwrap(), "ABC");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_hook_sees_file() {
        let dir = TempDir::new().unwrap();
        let hook = CommandHook::new(
            "post",
            vec!["sh".into(), "-c".into(), "printf %s \"$HOTVIEW_FILE\"".into()],
            dir.path(),
        );
        assert_eq!(hook.apply("app/a.view", String::new()).unwrap(), "app/a.view");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_hook_is_compile_error() {
        let dir = TempDir::new().unwrap();
        let hook = CommandHook::new("pre", vec!["false".into()], dir.path());
        let err = hook.apply("a.view", "x".into()).unwrap_err();
        assert!(err.to_string().starts_with("pre hook failed"));
    }

    #[test]
    fn test_from_config_empty_is_noop() {
        let hooks = Hooks::from_config(&HooksConfig::default(), Path::new("/"));
        assert_eq!(hooks.pre.apply("a", "t".into()).unwrap(), "t");
    }
}
