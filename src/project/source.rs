//! Stable ids for source file paths.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::base::FileId;

/// Assigns each path a [`FileId`] the first time it is seen.
///
/// Ids are never reused, so declarations cached under an id stay tied to
/// the file they came from for the life of the engine.
#[derive(Debug, Default)]
pub struct FileSet {
    paths: RwLock<IndexSet<PathBuf>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the id of `path`.
    pub fn file_id(&self, path: &Path) -> FileId {
        // Fast path: read lock
        if let Some(index) = self.paths.read().get_index_of(path) {
            return Self::id_at(index);
        }

        let mut paths = self.paths.write();
        // Another thread may have inserted it between the two locks.
        let (index, _) = paths.insert_full(path.to_path_buf());
        Self::id_at(index)
    }

    /// Ids saturate at `u32::MAX` instead of wrapping onto earlier files.
    fn id_at(index: usize) -> FileId {
        FileId::new(u32::try_from(index).unwrap_or(u32::MAX))
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.paths.read().get_index(file.index() as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
