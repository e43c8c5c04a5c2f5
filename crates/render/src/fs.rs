//! Build output filesystem.
//!
//! Paths are `/`-separated and relative to the build root, e.g.
//! `server/render.js` or `client/assets/app.css`.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Read-only view of a build output.
pub trait BuildFs: Send + Sync {
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    fn is_dir(&self, path: &str) -> bool;

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        String::from_utf8(self.read(path)?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<T: BuildFs + ?Sized> BuildFs for Arc<T> {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        (**self).is_dir(path)
    }
}

/// Shared handle to a build output.
pub type SharedFs = Arc<dyn BuildFs>;

/// Reject absolute paths, empty segments and `.`/`..` segments.
pub fn check_path(path: &str) -> io::Result<()> {
    let valid = !path.is_empty()
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("invalid build path: {path:?}"),
        ))
    }
}

/// Build output in a directory on disk.
#[derive(Clone, Debug)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        check_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, s| acc.join(s)))
    }
}

impl BuildFs for DirFs {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }
}

/// Build output held in memory. Directories are implied by file paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryFs {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl BuildFs for MemoryFs {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        check_path(path)?;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    fn is_dir(&self, path: &str) -> bool {
        if check_path(path).is_err() {
            return false;
        }
        let prefix = format!("{path}/");
        self.files.keys().any(|key| key.starts_with(&prefix))
    }
}

/// View of one subdirectory, such as `server` or `client`.
#[derive(Clone)]
pub struct SubFs {
    inner: SharedFs,
    prefix: String,
}

impl SubFs {
    pub fn new(inner: SharedFs, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn join(&self, path: &str) -> io::Result<String> {
        check_path(path)?;
        Ok(format!("{}/{path}", self.prefix))
    }
}

impl BuildFs for SubFs {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.inner.read(&self.join(path)?)
    }

    fn is_dir(&self, path: &str) -> bool {
        match self.join(path) {
            Ok(full) => self.inner.is_dir(&full),
            Err(_) => false,
        }
    }
}
