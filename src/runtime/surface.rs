//! Where rendered markup goes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Rendering backend. Only successful renders are presented, so a failed
/// render leaves the previous output in place.
pub trait Surface: Send {
    fn present(&mut self, html: &str) -> Result<()>;
}

/// Writes a standalone page, rewritten on every render.
pub struct FileSurface {
    path: PathBuf,
    title: String,
}

impl FileSurface {
    pub fn new(path: PathBuf, title: impl Into<String>) -> Self {
        Self {
            path,
            title: title.into(),
        }
    }

    fn page(&self, body: &str) -> String {
        format!(
            "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            self.title, body
        )
    }
}

impl Surface for FileSurface {
    fn present(&mut self, html: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, self.page(html))
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Keeps every presented frame (tests, headless runs).
#[derive(Clone, Default)]
pub struct MemorySurface {
    frames: Arc<Mutex<Vec<String>>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.frames.lock().last().cloned()
    }
}

impl Surface for MemorySurface {
    fn present(&mut self, html: &str) -> Result<()> {
        self.frames.lock().push(html.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_surface_writes_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/index.html");
        let mut surface = FileSurface::new(path.clone(), "app");
        surface.present("<p>hi</p>").unwrap();
        let page = std::fs::read_to_string(path).unwrap();
        assert!(page.contains("<title>app</title>"));
        assert!(page.contains("<body>\n<p>hi</p>\n</body>"));
    }

    #[test]
    fn test_memory_surface_shares_frames() {
        let surface = MemorySurface::new();
        let mut handle = surface.clone();
        handle.present("a").unwrap();
        handle.present("b").unwrap();
        assert_eq!(surface.frames(), vec!["a", "b"]);
        assert_eq!(surface.last().as_deref(), Some("b"));
    }
}
