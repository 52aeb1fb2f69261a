//! Disk access: bounded reads, modification times, content fingerprints.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Counting gate bounding how many files are read at once.
///
/// Package imports and sibling parsing fan out over many files; the gate
/// keeps the number of open descriptors below a fixed limit.
#[derive(Debug)]
pub struct ReadGate {
    available: Mutex<usize>,
    released: Condvar,
}

/// Permission to read one file; dropping it frees the slot.
pub struct ReadPermit<'a> {
    gate: &'a ReadGate,
}

impl ReadGate {
    /// Create a gate admitting `capacity` concurrent readers (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            available: Mutex::new(capacity.max(1)),
            released: Condvar::new(),
        }
    }

    /// Block until a slot is free.
    pub fn acquire(&self) -> ReadPermit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        ReadPermit { gate: self }
    }

    /// Read a whole file while holding a permit.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let _permit = self.acquire();
        fs::read(path).map_err(|e| Error::io(path, e))
    }
}

impl Default for ReadGate {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Drop for ReadPermit<'_> {
    fn drop(&mut self) {
        *self.gate.available.lock() += 1;
        self.gate.released.notify_one();
    }
}

/// Last modification time of `path`.
pub fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| Error::io(path, e))
}

/// Content identity: a blake3 digest plus the byte length.
///
/// Used to skip reparsing when a file's timestamp moved but its bytes did
/// not (a `touch`, a checkout of the same revision).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    digest: blake3::Hash,
    len: u64,
}

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            digest: blake3::hash(bytes),
            len: bytes.len() as u64,
        }
    }

    /// Fingerprint of several files taken together, in the given order.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        let mut len = 0u64;
        for part in parts {
            // Length prefix keeps ("ab", "c") apart from ("a", "bc").
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
            len += part.len() as u64;
        }
        Self {
            digest: hasher.finalize(),
            len,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
