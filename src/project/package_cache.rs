//! Cache of imported packages keyed by artifact path.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::fs::Fingerprint;
use super::importer::PackageImporter;
use super::stats::Counters;
use crate::error::{Error, Result};
use crate::hir::{Decl, DeclKind, Origin, PackageLookup, Scope};

/// An imported package as completion sees it.
#[derive(Debug)]
pub struct PackageSnapshot {
    /// Artifact path; also the `Origin::Package` key of every declaration.
    pub key: Arc<str>,
    pub import_path: SmolStr,
    /// Declared package name, the default alias of an import.
    pub name: SmolStr,
    /// Top-level scope, parented on the universe.
    pub scope: Arc<Scope>,
    /// Synthetic declaration whose children are the package members.
    pub root: Arc<Decl>,
    /// Alias to import path, for resolving the package's own imports.
    pub imports: FxHashMap<SmolStr, SmolStr>,
    /// Directory imports of this package are resolved from.
    pub dir: PathBuf,
}

struct CachedPackage {
    modified: SystemTime,
    fingerprint: Fingerprint,
    snapshot: Arc<PackageSnapshot>,
}

type Slot = Arc<Mutex<Option<CachedPackage>>>;

/// A package to bring up to date: where its artifact is and which import
/// path named it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageRequest {
    pub key: Arc<str>,
    pub import_path: SmolStr,
}

pub struct PackageCache {
    slots: Mutex<FxHashMap<Arc<str>, Slot>>,
    importer: Arc<dyn PackageImporter>,
    universe: Arc<Scope>,
    search_dirs: Vec<PathBuf>,
    pool: Arc<rayon::ThreadPool>,
    counters: Arc<Counters>,
}

impl PackageCache {
    pub(crate) fn new(
        importer: Arc<dyn PackageImporter>,
        universe: Arc<Scope>,
        search_dirs: Vec<PathBuf>,
        pool: Arc<rayon::ThreadPool>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
            importer,
            universe,
            search_dirs,
            pool,
            counters,
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Locate the artifact for `import_path` imported from `src_dir`.
    pub fn locate(&self, import_path: &str, src_dir: &Path) -> Option<PackageRequest> {
        let artifact = self
            .importer
            .find_package(import_path, src_dir, &self.search_dirs)?;
        Some(PackageRequest {
            key: Arc::from(artifact.to_string_lossy().as_ref()),
            import_path: SmolStr::new(import_path),
        })
    }

    /// Refresh every stale package of `requests` in parallel.
    ///
    /// All tasks run to completion; the call fails afterwards if any of
    /// them failed or panicked.
    pub fn ensure_fresh(&self, requests: &[PackageRequest]) -> Result<()> {
        let mut seen = FxHashSet::default();
        let unique: Vec<&PackageRequest> =
            requests.iter().filter(|r| seen.insert(r.key.clone())).collect();

        let results: Vec<Result<Arc<PackageSnapshot>>> = self.pool.install(|| {
            unique
                .par_iter()
                .map(|request| {
                    catch_unwind(AssertUnwindSafe(|| self.refresh(request)))
                        .unwrap_or_else(|payload| Err(Error::from_panic(payload)))
                })
                .collect()
        });
        Error::join(results).map(drop)
    }

    /// Current snapshot of an already imported package.
    pub fn get(&self, key: &str) -> Option<Arc<PackageSnapshot>> {
        let slot = self.slots.lock().get(key).cloned()?;
        let cached = slot.lock();
        cached.as_ref().map(|c| c.snapshot.clone())
    }

    /// Snapshot of `import_path`, importing it first if needed.
    ///
    /// Used for packages reached only through other packages' types.
    pub fn get_or_import(&self, import_path: &str, src_dir: &Path) -> Option<Arc<PackageSnapshot>> {
        let request = self.locate(import_path, src_dir)?;
        if let Some(snapshot) = self.get(&request.key) {
            return Some(snapshot);
        }
        match self.refresh(&request) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::debug!(import_path, "lazy import failed: {err}");
                None
            }
        }
    }

    fn refresh(&self, request: &PackageRequest) -> Result<Arc<PackageSnapshot>> {
        let slot = self
            .slots
            .lock()
            .entry(request.key.clone())
            .or_default()
            .clone();
        let mut cached = slot.lock();

        let artifact = Path::new(&*request.key);
        let stamp = self.importer.modified(artifact)?;
        if let Some(entry) = cached.as_ref() {
            if entry.modified == stamp {
                return Ok(entry.snapshot.clone());
            }
        }

        let parts = self.importer.read_artifact(artifact)?;
        let fingerprint = Fingerprint::of_parts(parts.iter().map(|p| p.bytes.as_slice()));
        if let Some(entry) = cached.as_mut() {
            if entry.fingerprint == fingerprint {
                tracing::trace!(package = %request.import_path, "package content unchanged");
                entry.modified = stamp;
                self.counters.package_checksum_hit();
                return Ok(entry.snapshot.clone());
            }
        }

        let decoded = self
            .importer
            .decode(&request.import_path, &request.key, &parts)?;
        self.counters.package_imported();
        tracing::trace!(
            package = %request.import_path,
            decls = decoded.decls.len(),
            "package imported"
        );

        let origin = Origin::Package(request.key.clone());
        let mut scope = Scope::with_capacity(Some(self.universe.clone()), decoded.decls.len());
        let mut root = Decl::new(decoded.name.clone(), DeclKind::Package, origin);
        for decl in decoded.decls.values() {
            scope.merge_decl(decl);
            root.add_child(decl.clone());
        }
        let snapshot = Arc::new(PackageSnapshot {
            key: request.key.clone(),
            import_path: request.import_path.clone(),
            name: decoded.name,
            scope: Arc::new(scope),
            root: Arc::new(root),
            imports: decoded.imports,
            dir: artifact.to_path_buf(),
        });
        *cached = Some(CachedPackage {
            modified: stamp,
            fingerprint,
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PackageLookup for PackageCache {
    fn package_scope(&self, key: &str) -> Option<Arc<Scope>> {
        self.get(key).map(|s| s.scope.clone())
    }

    fn import_of(&self, key: &str, alias: &str) -> Option<Arc<Decl>> {
        let snapshot = self.get(key)?;
        let import_path = snapshot.imports.get(alias)?;
        self.get_or_import(import_path, &snapshot.dir)
            .map(|imported| imported.root.clone())
    }

    fn package_name(&self, key: &str) -> Option<SmolStr> {
        self.get(key).map(|s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::universe;
    use crate::project::dir_cache::DirCache;
    use crate::project::fs::ReadGate;
    use crate::project::importer::{ArtifactPart, DecodedPackage, SourceImporter};
    use crate::syntax::GoParser;
    use std::fs;

    fn cache(search: PathBuf) -> (PackageCache, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let importer = SourceImporter::new(
            Arc::new(DirCache::new(16)),
            Arc::new(ReadGate::new(4)),
            Arc::new(GoParser),
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .expect("pool");
        let cache = PackageCache::new(
            Arc::new(importer),
            universe(),
            vec![search],
            Arc::new(pool),
            counters.clone(),
        );
        (cache, counters)
    }

    fn write_pkg(root: &Path, path: &str, src: &str) {
        let dir = root.join(path);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("pkg.go"), src).expect("write");
    }

    #[test]
    fn test_import_and_reuse() {
        let root = tempfile::tempdir().expect("tempdir");
        write_pkg(root.path(), "text/tmpl", "package tmpl\nfunc Must(t *T) *T { return t }\ntype T struct{}\n");
        write_pkg(root.path(), "fmtx", "package fmtx\nfunc Println(a ...any) {}\n");

        let (cache, counters) = cache(root.path().to_path_buf());
        let requests: Vec<_> = ["text/tmpl", "fmtx", "text/tmpl"]
            .iter()
            .filter_map(|p| cache.locate(p, root.path()))
            .collect();
        assert_eq!(requests.len(), 3);
        cache.ensure_fresh(&requests).expect("fresh");
        assert_eq!(counters.snapshot().package_imports, 2);

        let tmpl = cache.get(&requests[0].key).expect("tmpl");
        assert_eq!(tmpl.name, "tmpl");
        assert_eq!(tmpl.root.kind, DeclKind::Package);
        assert!(tmpl.root.child("Must").is_some());
        assert_eq!(cache.package_name(&requests[1].key).as_deref(), Some("fmtx"));

        cache.ensure_fresh(&requests).expect("fresh");
        assert_eq!(counters.snapshot().package_imports, 2);
    }

    #[test]
    fn test_transitive_import() {
        let root = tempfile::tempdir().expect("tempdir");
        write_pkg(root.path(), "io2", "package io2\ntype Reader interface{ Read(p []byte) (int, error) }\n");
        write_pkg(root.path(), "bufio2", "package bufio2\nimport \"io2\"\nfunc NewReader(r io2.Reader) {}\n");

        let (cache, _) = cache(root.path().to_path_buf());
        let bufio = cache.locate("bufio2", root.path()).expect("bufio2");
        cache.ensure_fresh(std::slice::from_ref(&bufio)).expect("fresh");
        let io = cache.import_of(&bufio.key, "io2").expect("io2 root");
        assert!(io.child("Reader").is_some());
    }

    struct Exploding;

    impl PackageImporter for Exploding {
        fn find_package(&self, path: &str, _: &Path, _: &[PathBuf]) -> Option<PathBuf> {
            Some(PathBuf::from(path))
        }
        fn modified(&self, artifact: &Path) -> Result<SystemTime> {
            if artifact == Path::new("boom") {
                panic!("importer exploded");
            }
            Ok(SystemTime::UNIX_EPOCH)
        }
        fn read_artifact(&self, _: &Path) -> Result<Vec<ArtifactPart>> {
            Ok(Vec::new())
        }
        fn decode(&self, path: &str, _: &Arc<str>, _: &[ArtifactPart]) -> Result<DecodedPackage> {
            Ok(DecodedPackage {
                name: SmolStr::new(path),
                ..DecodedPackage::default()
            })
        }
    }

    #[test]
    fn test_fan_out_failure_is_aggregated() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .expect("pool");
        let counters = Arc::new(Counters::default());
        let cache = PackageCache::new(
            Arc::new(Exploding),
            universe(),
            Vec::new(),
            Arc::new(pool),
            counters.clone(),
        );
        let requests: Vec<_> = ["ok1", "boom", "ok2"]
            .iter()
            .filter_map(|p| cache.locate(p, Path::new(".")))
            .collect();
        let err = cache.ensure_fresh(&requests).unwrap_err();
        assert!(matches!(err, Error::FanOut { failed: 1, .. }));
        // The healthy tasks still finished.
        assert_eq!(counters.snapshot().package_imports, 2);
        assert!(cache.get("ok1").is_some());
    }
}
