//! Per-file cache of top-level declarations.
//!
//! Sibling files of the package being edited are parsed once and reused
//! until they change on disk. Freshness is checked in two steps: the
//! modification time first, then, if it moved, a content fingerprint, so
//! touching a file without editing it does not cost a reparse.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::fs::{Fingerprint, ReadGate, modified};
use super::source::FileSet;
use super::stats::Counters;
use crate::base::FileId;
use crate::error::Result;
use crate::hir::{DeclMap, Origin, lower_file};
use crate::syntax::{ImportSpec, SourceParser};

/// Top-level declarations and imports of one file.
#[derive(Debug)]
pub struct FileDecls {
    pub path: PathBuf,
    pub file_id: FileId,
    /// Declared package name; empty when the clause is missing.
    pub package: SmolStr,
    pub decls: DeclMap,
    pub imports: Vec<ImportSpec>,
}

impl FileDecls {
    fn empty(path: &Path, file_id: FileId) -> Self {
        Self {
            path: path.to_path_buf(),
            file_id,
            package: SmolStr::default(),
            decls: DeclMap::new(),
            imports: Vec::new(),
        }
    }

    /// Lower a parsed file.
    pub fn from_source(
        path: &Path,
        file_id: FileId,
        file: &crate::syntax::SourceFile,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            file_id,
            package: file.package.clone().unwrap_or_default(),
            decls: lower_file(file, &Origin::File(file_id)),
            imports: file.imports.clone(),
        }
    }
}

struct CachedFile {
    modified: SystemTime,
    fingerprint: Fingerprint,
    decls: Arc<FileDecls>,
}

type Slot = Arc<Mutex<Option<CachedFile>>>;

pub struct DeclCache {
    slots: Mutex<FxHashMap<PathBuf, Slot>>,
    files: Arc<FileSet>,
    parser: Arc<dyn SourceParser>,
    gate: Arc<ReadGate>,
    counters: Arc<Counters>,
}

impl DeclCache {
    pub(crate) fn new(
        files: Arc<FileSet>,
        parser: Arc<dyn SourceParser>,
        gate: Arc<ReadGate>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
            files,
            parser,
            gate,
            counters,
        }
    }

    /// Declarations of `path`, reparsing only if its content changed.
    ///
    /// A file that cannot be read yields its previous declarations, or an
    /// empty set if there are none; the failure is logged, not returned.
    pub fn get_and_update(&self, path: &Path) -> Arc<FileDecls> {
        // Only the store lock is held here; the entry lock below serializes
        // refreshes of one file without blocking other files.
        let slot = self
            .slots
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        let mut cached = slot.lock();
        match self.refresh(path, &mut cached) {
            Ok(decls) => decls,
            Err(err) => {
                tracing::debug!(path = %path.display(), "cannot refresh file: {err}");
                match cached.as_ref() {
                    Some(entry) => entry.decls.clone(),
                    None => Arc::new(FileDecls::empty(path, self.files.file_id(path))),
                }
            }
        }
    }

    fn refresh(&self, path: &Path, cached: &mut Option<CachedFile>) -> Result<Arc<FileDecls>> {
        let stamp = modified(path)?;
        if let Some(entry) = cached.as_ref() {
            if entry.modified == stamp {
                tracing::trace!(path = %path.display(), "file cache hit");
                return Ok(entry.decls.clone());
            }
        }

        let bytes = self.gate.read(path)?;
        let fingerprint = Fingerprint::of(&bytes);
        if let Some(entry) = cached.as_mut() {
            if entry.fingerprint == fingerprint {
                tracing::trace!(path = %path.display(), "content unchanged, keeping declarations");
                entry.modified = stamp;
                self.counters.checksum_hit();
                return Ok(entry.decls.clone());
            }
        }

        let text = String::from_utf8_lossy(&bytes);
        let file = self.parser.parse_file(&text);
        let file_id = self.files.file_id(path);
        let decls = Arc::new(FileDecls::from_source(path, file_id, &file));
        self.counters.file_parsed();
        tracing::trace!(
            path = %path.display(),
            decls = decls.decls.len(),
            errors = file.errors.len(),
            "file parsed"
        );

        *cached = Some(CachedFile {
            modified: stamp,
            fingerprint,
            decls: decls.clone(),
        });
        Ok(decls)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}
