//! On-disk state: file and package declaration caches.
//!
//! Everything here is keyed by path and refreshed lazily: a request asks
//! for what it needs and each cache decides, per entry, whether the copy
//! it holds is still current.

mod dir_cache;
mod file_cache;
mod fs;
mod importer;
mod package_cache;
mod source;
mod stats;

pub use dir_cache::{DirCache, DirEntry};
pub use file_cache::{DeclCache, FileDecls};
pub use fs::{Fingerprint, ReadGate, ReadPermit, modified};
pub use importer::{
    ArtifactPart, DecodedPackage, PackageImporter, SourceImporter, default_package_name,
    vendorless_import_path,
};
pub use package_cache::{PackageCache, PackageRequest, PackageSnapshot};
pub use source::FileSet;
pub use stats::CacheStats;
pub(crate) use stats::Counters;
