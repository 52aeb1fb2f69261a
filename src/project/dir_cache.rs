//! LRU cache of directory listings, invalidated by directory mtime.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use lru::LruCache;
use parking_lot::Mutex;

use super::fs::modified;
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn is_go_file(&self) -> bool {
        !self.is_dir && self.name.ends_with(".go")
    }

    pub fn is_test_file(&self) -> bool {
        self.name.ends_with("_test.go")
    }
}

struct Listing {
    modified: SystemTime,
    entries: Arc<[DirEntry]>,
}

pub struct DirCache {
    listings: Mutex<LruCache<PathBuf, Listing>>,
}

impl DirCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            listings: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Entries of `dir`, sorted by name.
    ///
    /// A cached listing is reused until the directory's modification time
    /// moves forward.
    pub fn read_dir(&self, dir: &Path) -> Result<Arc<[DirEntry]>> {
        let stamp = match modified(dir) {
            Ok(stamp) => stamp,
            Err(err) => {
                self.listings.lock().pop(dir);
                return Err(err);
            }
        };
        if let Some(listing) = self.listings.lock().get(dir) {
            if stamp <= listing.modified {
                return Ok(listing.entries.clone());
            }
        }

        let entries = list(dir)?;
        tracing::trace!(dir = %dir.display(), entries = entries.len(), "directory listed");
        self.listings.lock().put(
            dir.to_path_buf(),
            Listing {
                modified: stamp,
                entries: entries.clone(),
            },
        );
        Ok(entries)
    }

    /// `.go` files of `dir`, with or without `_test.go` files.
    pub fn go_files(&self, dir: &Path, include_tests: bool) -> Result<Vec<PathBuf>> {
        Ok(self
            .read_dir(dir)?
            .iter()
            .filter(|e| e.is_go_file() && (include_tests || !e.is_test_file()))
            .map(|e| dir.join(&e.name))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.listings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.listings.lock().clear();
    }
}

fn list(dir: &Path) -> Result<Arc<[DirEntry]>> {
    let read = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut entries = Vec::new();
    for entry in read {
        // Entries that vanish or cannot be stat-ed are skipped.
        let Ok(entry) = entry else { continue };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let is_dir = if file_type.is_symlink() {
            entry.path().is_dir()
        } else {
            file_type.is_dir()
        };
        if !is_dir && !file_type.is_file() && !file_type.is_symlink() {
            continue;
        }
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries.into())
}
