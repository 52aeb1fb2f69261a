//! Cache instrumentation counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the engine's cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Sibling files parsed because they were new or changed.
    pub file_parses: u64,
    /// Sibling files whose mtime moved but whose bytes did not.
    pub checksum_hits: u64,
    /// Packages decoded from their artifact.
    pub package_imports: u64,
    /// Packages whose artifact mtime moved but whose content did not.
    pub package_checksum_hits: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    file_parses: AtomicU64,
    checksum_hits: AtomicU64,
    package_imports: AtomicU64,
    package_checksum_hits: AtomicU64,
}

impl Counters {
    pub(crate) fn file_parsed(&self) {
        self.file_parses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn checksum_hit(&self) {
        self.checksum_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn package_imported(&self) {
        self.package_imports.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn package_checksum_hit(&self) {
        self.package_checksum_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            file_parses: self.file_parses.load(Ordering::Relaxed),
            checksum_hits: self.checksum_hits.load(Ordering::Relaxed),
            package_imports: self.package_imports.load(Ordering::Relaxed),
            package_checksum_hits: self.package_checksum_hits.load(Ordering::Relaxed),
        }
    }
}
