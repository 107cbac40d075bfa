//! Package installer.
//!
//! The build only needs two things from it: the ability to install
//! imports it discovers, and whether an install is running right now
//! (script-add notifications are held back meanwhile).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::utils::exec::Cmd;

/// `(package, version range)` of a peer dependency.
pub type PeerVersion = (String, String);

pub trait Installer: Send + Sync {
    fn install(&self, name: &str) -> Result<()>;

    fn uninstall(&self, name: &str) -> Result<()>;

    /// Install the peer dependencies declared by an installed package.
    ///
    /// `on_started` receives the full list up front; `on_progress` is
    /// called per package with its error, if any. Without `on_progress`
    /// the first failure is returned instead.
    fn install_peer_dependencies(
        &self,
        name: &str,
        on_started: Option<&(dyn Fn(&[PeerVersion]) + Sync)>,
        on_progress: Option<&(dyn Fn(&str, Option<&anyhow::Error>) + Sync)>,
        on_complete: Option<&(dyn Fn() + Sync)>,
    ) -> Result<()>;

    fn is_installing(&self) -> bool;
}

/// Installer for projects that do not manage packages.
#[derive(Debug, Default)]
pub struct NoInstaller;

impl Installer for NoInstaller {
    fn install(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn uninstall(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn install_peer_dependencies(
        &self,
        _name: &str,
        on_started: Option<&(dyn Fn(&[PeerVersion]) + Sync)>,
        _on_progress: Option<&(dyn Fn(&str, Option<&anyhow::Error>) + Sync)>,
        on_complete: Option<&(dyn Fn() + Sync)>,
    ) -> Result<()> {
        if let Some(cb) = on_started {
            cb(&[]);
        }
        if let Some(cb) = on_complete {
            cb();
        }
        Ok(())
    }

    fn is_installing(&self) -> bool {
        false
    }
}

/// Runs a package manager command (`npm` by default) in the project root.
pub struct CommandInstaller {
    root: PathBuf,
    program: Vec<String>,
    running: AtomicUsize,
}

/// Marks an install as running for its lifetime.
struct Running<'a>(&'a AtomicUsize);

impl<'a> Running<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CommandInstaller {
    pub fn new(root: &Path) -> Self {
        Self::with_program(root, vec!["npm".into()])
    }

    pub fn with_program(root: &Path, program: Vec<String>) -> Self {
        Self {
            root: root.to_path_buf(),
            program,
            running: AtomicUsize::new(0),
        }
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        let _running = Running::start(&self.running);
        Cmd::from_slice(&self.program)
            .args(args)
            .cwd(&self.root)
            .run()
            .map(|_| ())
    }

    /// Peer dependencies from `node_modules/<name>/package.json`.
    fn peer_dependencies(&self, name: &str) -> Result<Vec<PeerVersion>> {
        let manifest = self.root.join("node_modules").join(name).join("package.json");
        let content = fs::read_to_string(&manifest)
            .with_context(|| format!("failed to read {}", manifest.display()))?;

        #[derive(serde::Deserialize)]
        struct Manifest {
            #[serde(default, rename = "peerDependencies")]
            peer_dependencies: FxHashMap<String, String>,
        }

        let manifest: Manifest = serde_json::from_str(&content)?;
        let mut peers: Vec<_> = manifest.peer_dependencies.into_iter().collect();
        peers.sort();
        Ok(peers)
    }
}

impl Installer for CommandInstaller {
    fn install(&self, name: &str) -> Result<()> {
        crate::log!("install"; "{}", name);
        self.run(&["install", "--save", name])
    }

    fn uninstall(&self, name: &str) -> Result<()> {
        crate::log!("install"; "removing {}", name);
        self.run(&["uninstall", "--save", name])
    }

    fn install_peer_dependencies(
        &self,
        name: &str,
        on_started: Option<&(dyn Fn(&[PeerVersion]) + Sync)>,
        on_progress: Option<&(dyn Fn(&str, Option<&anyhow::Error>) + Sync)>,
        on_complete: Option<&(dyn Fn() + Sync)>,
    ) -> Result<()> {
        let peers = self.peer_dependencies(name)?;
        if let Some(cb) = on_started {
            cb(&peers);
        }

        peers.par_iter().try_for_each(|(peer, range)| {
            let spec = format!("{peer}@{range}");
            let result = self.run(&["install", &spec]);
            match (on_progress, result) {
                (Some(cb), result) => {
                    cb(peer, result.as_ref().err());
                    Ok(())
                }
                (None, result) => result,
            }
        })?;

        if let Some(cb) = on_complete {
            cb();
        }
        Ok(())
    }

    fn is_installing(&self) -> bool {
        self.running.load(Ordering::SeqCst) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    fn with_peers(dir: &TempDir, peers: &str) {
        let pkg = dir.path().join("node_modules/ui-kit");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            format!(r#"{{"name": "ui-kit", "peerDependencies": {peers}}}"#),
        )
        .unwrap();
    }

    #[test]
    fn test_no_installer_reports_empty() {
        let started = Mutex::new(None);
        let on_started = |peers: &[PeerVersion]| *started.lock() = Some(peers.len());
        NoInstaller
            .install_peer_dependencies("x", Some(&on_started), None, None)
            .unwrap();
        assert_eq!(*started.lock(), Some(0));
        assert!(!NoInstaller.is_installing());
    }

    #[test]
    fn test_peer_dependencies_sorted() {
        let dir = TempDir::new().unwrap();
        with_peers(&dir, r#"{"react": "^18", "lodash": "4"}"#);
        let installer = CommandInstaller::new(dir.path());
        assert_eq!(
            installer.peer_dependencies("ui-kit").unwrap(),
            vec![
                ("lodash".to_string(), "4".to_string()),
                ("react".to_string(), "^18".to_string())
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_peer_install_reports_progress() {
        let dir = TempDir::new().unwrap();
        with_peers(&dir, r#"{"a": "1", "b": "2"}"#);
        // `true` accepts any arguments and succeeds
        let installer = CommandInstaller::with_program(dir.path(), vec!["true".into()]);

        let done = Mutex::new(Vec::new());
        let completed = Mutex::new(false);
        let on_progress = |name: &str, err: Option<&anyhow::Error>| {
            done.lock().push((name.to_string(), err.is_none()));
        };
        let on_complete = || *completed.lock() = true;

        installer
            .install_peer_dependencies("ui-kit", None, Some(&on_progress), Some(&on_complete))
            .unwrap();

        let mut done = done.into_inner();
        done.sort();
        assert_eq!(done, vec![("a".to_string(), true), ("b".to_string(), true)]);
        assert!(*completed.lock());
        assert!(!installer.is_installing());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_peer_without_progress_is_error() {
        let dir = TempDir::new().unwrap();
        with_peers(&dir, r#"{"a": "1"}"#);
        let installer = CommandInstaller::with_program(dir.path(), vec!["false".into()]);
        assert!(installer
            .install_peer_dependencies("ui-kit", None, None, None)
            .is_err());
    }
}
