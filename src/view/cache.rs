//! Compiled view cache.
//!
//! One JSON file per view, named by the SHA1 of the view's path relative to
//! its root. Files are written atomically so concurrent compiles of the same
//! view are harmless: the last writer wins and the content is identical.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use super::compiler::CompiledView;
use super::{ViewError, ViewResult};

#[derive(Debug, Clone)]
pub struct ViewCache {
    dir: PathBuf,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ViewError + '_ {
    move |source| ViewError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Cache key for a view path relative to its root.
pub fn cache_key(relative: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(relative.replace('\\', "/").as_bytes());
    format!("{:x}", hasher.finalize())
}

impl ViewCache {
    /// Open the cache, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> ViewResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, relative: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(relative)))
    }

    /// Whether `cached` must be rebuilt from `source`.
    ///
    /// A missing cache file, an unreadable timestamp or a source at least as
    /// new as the cache all count as stale.
    pub fn is_stale(&self, source: &Path, cached: &Path) -> bool {
        match (modified(source), modified(cached)) {
            (Some(source), Some(cached)) => source >= cached,
            _ => true,
        }
    }

    /// Load a cached view; a corrupt file is reported and treated as a miss.
    pub fn load(&self, cached: &Path) -> Option<CompiledView> {
        let content = fs::read_to_string(cached).ok()?;
        match serde_json::from_str(&content) {
            Ok(view) => Some(view),
            Err(e) => {
                warn!(path = %cached.display(), error = %e, "Discarding corrupt compiled view");
                None
            }
        }
    }

    /// Write `json` to `cached` through a temporary file in the cache directory.
    pub fn store(&self, cached: &Path, json: &str) -> ViewResult<()> {
        let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_error(&self.dir))?;
        file.write_all(json.as_bytes()).map_err(io_error(cached))?;
        file.persist(cached).map_err(|e| ViewError::Io {
            path: cached.to_path_buf(),
            source: e.error,
        })?;
        debug!(path = %cached.display(), "Stored compiled view");
        Ok(())
    }

    /// Delete every compiled view. Returns how many files were removed.
    pub fn clear(&self) -> ViewResult<usize> {
        let mut removed = 0;
        let entries = fs::read_dir(&self.dir).map_err(io_error(&self.dir))?;
        for entry in entries {
            let path = entry.map_err(io_error(&self.dir))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path).map_err(io_error(&path))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
