//! Thumbnail directory bookkeeping across runs.
//!
//! When a run starts, every file already in the thumbnail directory becomes
//! a *removal candidate*. Each input file claims its thumbnail (and raw
//! preview) name as it is processed, whether that file is reused or
//! regenerated. Whatever is still unclaimed when the run ends belonged to
//! inputs that are gone, and [`ThumbnailStore::sweep`] deletes it.
//!
//! Hidden files and the location cache are never candidates.

use crate::cache::CACHE_FILENAME;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-directory thumbnail cache next to the sources, checked before
/// generating anything locally.
pub const SIBLING_CACHE_DIR: &str = ".thumbnails";

#[derive(Debug)]
pub struct ThumbnailStore {
    dir: PathBuf,
    candidates: BTreeSet<String>,
}

impl ThumbnailStore {
    /// Create `dir` if needed and index its current contents.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut candidates = BTreeSet::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name == CACHE_FILENAME {
                continue;
            }
            candidates.insert(name);
        }
        debug!(dir = %dir.display(), existing = candidates.len(), "indexed thumbnails");
        Ok(Self {
            dir: dir.to_path_buf(),
            candidates,
        })
    }

    #[cfg(test)]
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Whether `name` can be used as-is: reuse is on and the file predates
    /// this run without having been claimed yet.
    pub fn is_reusable(&self, name: &str, reuse: bool) -> bool {
        reuse && self.candidates.contains(name)
    }

    /// Protect `name` from the end-of-run sweep. Returns `true` if it was a
    /// pre-existing file.
    pub fn claim(&mut self, name: &str) -> bool {
        self.candidates.remove(name)
    }

    /// Unclaimed pre-existing names, sorted.
    #[cfg(test)]
    pub(crate) fn unclaimed(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }

    /// Delete every unclaimed candidate. Returns the removed paths.
    pub fn sweep(self) -> io::Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for name in &self.candidates {
            let path = self.dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale thumbnail");
                    removed.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}

/// `<source dir>/.thumbnails/<name>`, if such a file exists.
pub fn sibling_thumbnail(source: &Path, name: &str) -> Option<PathBuf> {
    let candidate = source.parent()?.join(SIBLING_CACHE_DIR).join(name);
    candidate.is_file().then_some(candidate)
}
