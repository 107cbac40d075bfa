use std::path::PathBuf;

use crate::config::HotviewConfig;
use crate::utils::path::normalize_path;

/// The app dir and the config file. Output trees are never watched: the
/// pipeline writes there itself.
pub(super) fn collect_watch_paths(config: &HotviewConfig) -> Vec<PathBuf> {
    let mut paths = vec![config.build.app.clone()];
    if config.config_path.exists() {
        paths.push(normalize_path(&config.config_path));
    }
    paths.retain(|p| !p.starts_with(&config.build.out) && !p.starts_with(&config.build.internal));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_dir_and_existing_config() {
        let dir = TempDir::new().unwrap();
        let config = HotviewConfig::for_root(dir.path());
        assert_eq!(collect_watch_paths(&config), vec![config.build.app.clone()]);

        std::fs::write(&config.config_path, "").unwrap();
        let paths = collect_watch_paths(&config);
        assert_eq!(paths.len(), 2);
        assert!(paths[1].ends_with("hotview.toml"));
    }
}
