//! Locating and decoding imported packages.
//!
//! The [`PackageCache`](super::PackageCache) treats a package as an opaque
//! artifact with a modification time and a content identity; everything
//! toolchain-specific sits behind [`PackageImporter`]. The bundled
//! [`SourceImporter`] uses a package's source directory as its artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::dir_cache::DirCache;
use super::fs::{ReadGate, modified};
use crate::error::{Error, Result};
use crate::hir::{Decl, DeclMap, Origin, lower_items};
use crate::syntax::SourceParser;

/// One file of a package artifact.
#[derive(Debug)]
pub struct ArtifactPart {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Declarations decoded from a package artifact.
#[derive(Debug, Default)]
pub struct DecodedPackage {
    /// The name the package declares for itself.
    pub name: SmolStr,
    /// Every top-level declaration, exported or not, merged across files.
    pub decls: DeclMap,
    /// Imports of the package's own files: alias (or default name when no
    /// alias is given, keyed by the path's last element) to import path.
    pub imports: FxHashMap<SmolStr, SmolStr>,
}

pub trait PackageImporter: Send + Sync {
    /// Artifact for `import_path` as seen from a file in `src_dir`.
    fn find_package(&self, import_path: &str, src_dir: &Path, search_dirs: &[PathBuf])
    -> Option<PathBuf>;

    /// Modification time of the artifact.
    fn modified(&self, artifact: &Path) -> Result<SystemTime>;

    /// Raw content of the artifact.
    fn read_artifact(&self, artifact: &Path) -> Result<Vec<ArtifactPart>>;

    /// Turn artifact content into declarations whose origin is
    /// `Origin::Package(key)`.
    fn decode(&self, import_path: &str, key: &Arc<str>, parts: &[ArtifactPart])
    -> Result<DecodedPackage>;
}

/// Imports packages straight from their `.go` sources.
pub struct SourceImporter {
    dirs: Arc<DirCache>,
    gate: Arc<ReadGate>,
    parser: Arc<dyn SourceParser>,
}

impl SourceImporter {
    pub fn new(dirs: Arc<DirCache>, gate: Arc<ReadGate>, parser: Arc<dyn SourceParser>) -> Self {
        Self { dirs, gate, parser }
    }

    fn sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.dirs.go_files(dir, false)
    }

    fn is_package_dir(&self, dir: &Path) -> bool {
        dir.is_dir() && self.sources(dir).is_ok_and(|files| !files.is_empty())
    }
}

impl PackageImporter for SourceImporter {
    fn find_package(
        &self,
        import_path: &str,
        src_dir: &Path,
        search_dirs: &[PathBuf],
    ) -> Option<PathBuf> {
        if import_path.is_empty() || import_path == "C" {
            return None;
        }
        // Relative imports are resolved against the importing directory.
        if import_path.starts_with("./") || import_path.starts_with("../") {
            let dir = src_dir.join(import_path);
            return self.is_package_dir(&dir).then_some(dir);
        }
        // The nearest vendor directory wins over the search roots.
        for ancestor in src_dir.ancestors() {
            let candidate = ancestor.join("vendor").join(import_path);
            if self.is_package_dir(&candidate) {
                return Some(candidate);
            }
        }
        search_dirs
            .iter()
            .map(|root| root.join(import_path))
            .find(|dir| self.is_package_dir(dir))
    }

    fn modified(&self, artifact: &Path) -> Result<SystemTime> {
        // The directory's own stamp moves when files are added or removed.
        let mut newest = modified(artifact)?;
        for file in self.sources(artifact)? {
            newest = newest.max(modified(&file)?);
        }
        Ok(newest)
    }

    fn read_artifact(&self, artifact: &Path) -> Result<Vec<ArtifactPart>> {
        self.sources(artifact)?
            .into_iter()
            .map(|path| {
                let bytes = self.gate.read(&path)?;
                Ok(ArtifactPart { path, bytes })
            })
            .collect()
    }

    fn decode(
        &self,
        import_path: &str,
        key: &Arc<str>,
        parts: &[ArtifactPart],
    ) -> Result<DecodedPackage> {
        let origin = Origin::Package(key.clone());
        let mut name = SmolStr::default();
        let mut decls: IndexMap<SmolStr, Decl> = IndexMap::new();
        let mut imports = FxHashMap::default();

        for part in parts {
            let text = String::from_utf8_lossy(&part.bytes);
            let file = self.parser.parse_file(&text);
            let Some(package) = file.package.as_ref() else {
                tracing::debug!(path = %part.path.display(), "no package clause, skipped");
                continue;
            };
            if name.is_empty() {
                name = package.clone();
            } else if *package != name {
                // A stray `package main` helper or documentation file.
                continue;
            }
            for import in &file.imports {
                let alias = match &import.alias {
                    Some(alias) => alias.clone(),
                    None => default_package_name(&import.path),
                };
                imports.entry(alias).or_insert_with(|| import.path.clone());
            }
            lower_items(&file.items, &origin, &mut decls);
        }

        if name.is_empty() {
            return Err(Error::Import {
                path: import_path.to_owned(),
                message: "no Go files with a package clause".to_owned(),
            });
        }
        Ok(DecodedPackage {
            name,
            decls: decls.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
            imports,
        })
    }
}

/// Conventional package name for an import path: its last element, with
/// a `go-` prefix or `.go`/`-go` suffix dropped and a major-version
/// element (`/v2`) skipped.
pub fn default_package_name(import_path: &str) -> SmolStr {
    let mut elems = import_path.rsplit('/');
    let mut last = elems.next().unwrap_or(import_path);
    if is_major_version(last) {
        last = elems.next().unwrap_or(last);
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last
        .strip_suffix(".go")
        .or_else(|| last.strip_suffix("-go"))
        .unwrap_or(last);
    SmolStr::new(last)
}

fn is_major_version(elem: &str) -> bool {
    elem.strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Strip everything up to the last `vendor/` element: the path as it would
/// be written in an import statement.
///
/// Returns `None` for packages vendored under a tree that does not contain
/// `current_package`, since those are not importable from it.
pub fn vendorless_import_path(path: &str, current_package: &str) -> Option<String> {
    if !path.contains("vendor/") {
        return Some(path.to_owned());
    }
    let owner = path.split("vendor/").next().unwrap_or_default();
    if !current_package.is_empty() && !current_package.contains(owner) {
        return None;
    }
    if let Some(i) = path.rfind("/vendor/") {
        return Some(path[i + "/vendor/".len()..].to_owned());
    }
    Some(path.strip_prefix("vendor/").unwrap_or(path).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GoParser;
    use rstest::rstest;
    use std::fs;

    fn importer() -> SourceImporter {
        SourceImporter::new(
            Arc::new(DirCache::new(16)),
            Arc::new(ReadGate::new(4)),
            Arc::new(GoParser),
        )
    }

    #[rstest]
    #[case("strings", "strings")]
    #[case("github.com/user/go-yaml", "yaml")]
    #[case("gopkg.in/yaml.go", "yaml")]
    #[case("example.com/mod/v2", "mod")]
    #[case("example.com/thing-go", "thing")]
    fn test_default_package_name(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(default_package_name(path), expected);
    }

    #[rstest]
    #[case("a/b", "", Some("a/b"))]
    #[case("proj/vendor/lib/x", "proj/cmd", Some("lib/x"))]
    #[case("vendor/lib/x", "", Some("lib/x"))]
    #[case("other/vendor/lib/x", "proj/cmd", None)]
    fn test_vendorless(#[case] path: &str, #[case] current: &str, #[case] expected: Option<&str>) {
        assert_eq!(vendorless_import_path(path, current).as_deref(), expected);
    }

    #[test]
    fn test_find_prefers_vendor() {
        let root = tempfile::tempdir().expect("tempdir");
        let gopath = root.path().join("src");
        let project = gopath.join("proj");
        let vendored = project.join("vendor/lib");
        let global = gopath.join("lib");
        for dir in [&project, &vendored, &global] {
            fs::create_dir_all(dir).expect("mkdir");
        }
        fs::write(vendored.join("lib.go"), "package lib\n").expect("write");
        fs::write(global.join("lib.go"), "package lib\n").expect("write");
        fs::create_dir_all(gopath.join("empty")).expect("mkdir");

        let importer = importer();
        let search = [gopath.clone()];
        assert_eq!(importer.find_package("lib", &project, &search), Some(vendored));
        assert_eq!(importer.find_package("lib", &gopath, &search), Some(global));
        assert_eq!(importer.find_package("empty", &project, &search), None);
        assert_eq!(importer.find_package("C", &project, &search), None);
    }

    #[test]
    fn test_decode_merges_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("a.go"),
            "package shapes\nimport m \"math\"\ntype Circle struct{ R float64 }\n",
        )
        .expect("write");
        fs::write(
            dir.path().join("b.go"),
            "package shapes\nfunc (c Circle) Area() float64 { return m.Pi }\n",
        )
        .expect("write");
        fs::write(dir.path().join("b_test.go"), "package shapes\nfunc TestX() {}\n").expect("write");

        let importer = importer();
        let parts = importer.read_artifact(dir.path()).expect("read");
        assert_eq!(parts.len(), 2);
        let key: Arc<str> = Arc::from("shapes-key");
        let decoded = importer.decode("shapes", &key, &parts).expect("decode");
        assert_eq!(decoded.name, "shapes");
        let circle = &decoded.decls["Circle"];
        assert!(circle.child("R").is_some());
        assert!(circle.child("Area").is_some());
        assert_eq!(circle.origin, Origin::Package(key));
        assert_eq!(decoded.imports.get("m").map(|p| p.as_str()), Some("math"));
        assert!(!decoded.decls.contains_key("TestX"));
    }
}
