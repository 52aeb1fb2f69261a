//! Identifiers for source files and declarations.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Handle for a source file known to the engine.
///
/// Paths are mapped to ids by [`crate::project::FileSet`]; everything
/// downstream (declaration origins, per-file scopes) keys on the id.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new FileId from a raw index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

static NEXT_DECL: AtomicU32 = AtomicU32::new(1);

/// Identity of a declaration entity.
///
/// Copies made during merge keep the id of the entity they extend, so a
/// visited set keyed on `DeclId` recognises the same type no matter which
/// snapshot of it a traversal reaches.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DeclId(u32);

impl DeclId {
    /// Allocate a fresh, process-unique id.
    pub fn fresh() -> Self {
        Self(NEXT_DECL.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclId({})", self.0)
    }
}
