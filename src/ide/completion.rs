//! One completion request, end to end.
//!
//! ```text
//! buffer ─▶ rip ─▶ parse current file ─┐
//!                                      ├─▶ merge ─▶ file scopes ─▶ local scope
//! siblings ─▶ DeclCache (fan-out) ─────┤                              │
//! imports  ─▶ PackageCache (fan-out) ──┘                              ▼
//!                                   cursor context ─▶ CandidateCollector
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::collector::{Candidate, CandidateCollector, import_candidates};
use super::context::{CompletionMode, CursorContext, deduce_cursor_context};
use super::merge::{
    ResolvedImport, fixup_packages, merge_decls, merge_dot_imports, propagate_type_alias_methods,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hir::{
    Decl, DeclKind, Origin, Resolver, Scope, TypeResolver, local_scope, lower_items, universe,
};
use crate::project::{
    Counters, DeclCache, DirCache, FileDecls, FileSet, PackageCache, PackageImporter,
    PackageRequest, ReadGate, SourceImporter,
};
use crate::syntax::{Expr, ImportSpec, Ripper, SourceFile, SourceParser};

/// Answer to a completion request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Completion {
    /// Sorted by kind, then name.
    pub candidates: Vec<Candidate>,
    /// Characters before the cursor an accepted candidate replaces.
    pub replace_len: usize,
}

impl Completion {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The file under the cursor, parsed from the edit buffer.
struct CurrentFile {
    decls: FileDecls,
    /// The tree the cursor sits in: the ripped fragment, or the whole file.
    syntax: SourceFile,
    /// Cursor offset within `syntax`.
    cursor: usize,
}

/// Caches and collaborators shared by every request of one engine.
pub(crate) struct AutoCompleteContext {
    pub(crate) config: Config,
    files: Arc<FileSet>,
    dirs: Arc<DirCache>,
    decls: DeclCache,
    packages: PackageCache,
    parser: Arc<dyn SourceParser>,
    ripper: Ripper,
    universe: Arc<Scope>,
    pool: Arc<rayon::ThreadPool>,
}

impl AutoCompleteContext {
    /// Fresh caches for `config`. Without an explicit importer packages are
    /// read from source through the context's own directory cache.
    pub(crate) fn new(
        config: Config,
        parser: Arc<dyn SourceParser>,
        importer: Option<Arc<dyn PackageImporter>>,
        pool: Arc<rayon::ThreadPool>,
        counters: Arc<Counters>,
    ) -> Self {
        let files = Arc::new(FileSet::new());
        let dirs = Arc::new(DirCache::new(config.dir_cache_capacity));
        let gate = Arc::new(ReadGate::new(config.max_concurrent_reads));
        let importer = importer.unwrap_or_else(|| {
            Arc::new(SourceImporter::new(dirs.clone(), gate.clone(), parser.clone()))
        });
        let universe = universe();
        let decls = DeclCache::new(files.clone(), parser.clone(), gate, counters.clone());
        let packages = PackageCache::new(
            importer,
            universe.clone(),
            config.lib_paths.clone(),
            pool.clone(),
            counters,
        );
        Self {
            config,
            files,
            dirs,
            decls,
            packages,
            parser,
            ripper: Ripper::new(),
            universe,
            pool,
        }
    }

    /// Candidates at byte offset `cursor` of `src`, which must be a char
    /// boundary.
    pub(crate) fn apropos(&self, src: &str, filename: &Path, cursor: usize) -> Result<Completion> {
        if cursor > src.len() {
            return Err(Error::CursorOutOfRange {
                cursor,
                len: src.len(),
            });
        }
        let dir = filename
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let src_dir = dir.clone().unwrap_or_default();

        let current = self.parse_current(src, filename, cursor);
        let siblings = match &dir {
            Some(dir) => self.siblings(dir, filename, &current.decls.package)?,
            None => Vec::new(),
        };
        let current_id = current.decls.file_id;
        let files: Vec<&FileDecls> = siblings
            .iter()
            .map(Arc::as_ref)
            .chain(std::iter::once(&current.decls))
            .collect();

        let imports = self.resolve_imports(&files, &src_dir)?;

        // Siblings first: what the buffer says about a name wins.
        let mut package = Scope::with_capacity(
            Some(self.universe.clone()),
            files.iter().map(|f| f.decls.len()).sum(),
        );
        for (file, resolved) in files.iter().zip(&imports) {
            merge_decls(&mut package, &file.decls);
            merge_dot_imports(&mut package, resolved);
        }
        propagate_type_alias_methods(&mut package);
        let package = Arc::new(package);

        let mut file_scopes = FxHashMap::default();
        for (file, resolved) in files.iter().zip(&imports) {
            let mut scope = Scope::new(Some(package.clone()));
            fixup_packages(&mut scope, resolved);
            file_scopes.insert(file.file_id, Arc::new(scope));
        }
        let file_scope = file_scopes
            .get(&current_id)
            .cloned()
            .unwrap_or_else(|| package.clone());
        let local = current
            .syntax
            .funcs()
            .find_map(|func| local_scope(func, current.cursor, file_scope.clone()))
            .unwrap_or(file_scope);

        let Some(context) = deduce_cursor_context(src, cursor, self.parser.as_ref()) else {
            return Ok(Completion::default());
        };
        tracing::trace!(mode = ?context.mode, partial = %context.partial, "cursor context");

        let resolver = Resolver::new(
            self.universe.clone(),
            package,
            &file_scopes,
            local,
            &self.packages,
        );
        let mut candidates = self.collect(&context, &resolver, &src_dir, false);
        if candidates.is_empty() && !context.partial.is_empty() {
            candidates = self.collect(&context, &resolver, &src_dir, true);
        }
        Ok(Completion {
            candidates,
            replace_len: context.partial.chars().count(),
        })
    }

    /// Parse the buffer with a `;` at the cursor, so a dangling `x.` still
    /// ends a statement. When the cursor sits in a block, that block is
    /// parsed on its own and the rest of the file without it.
    fn parse_current(&self, src: &str, filename: &Path, cursor: usize) -> CurrentFile {
        let mut filesemi = String::with_capacity(src.len() + 1);
        filesemi.push_str(&src[..cursor]);
        filesemi.push(';');
        filesemi.push_str(&src[cursor..]);

        let file_id = self.files.file_id(filename);
        let Some(ripped) = self.ripper.rip(&filesemi, cursor) else {
            let syntax = self.parser.parse_file(&filesemi);
            return CurrentFile {
                decls: FileDecls::from_source(filename, file_id, &syntax),
                syntax,
                cursor,
            };
        };

        let outer = self.parser.parse_file(&ripped.remainder(&filesemi));
        let syntax = self.parser.parse_file(ripped.fragment(&filesemi));
        let mut decls = FileDecls::from_source(filename, file_id, &outer);

        let mut block: IndexMap<SmolStr, Decl> = IndexMap::new();
        lower_items(&syntax.items, &Origin::File(file_id), &mut block);
        for (name, decl) in block {
            let merged = match decls.decls.get(&name) {
                Some(existing) => existing.expanded(&decl),
                None => decl,
            };
            decls.decls.insert(name, Arc::new(merged));
        }
        CurrentFile {
            decls,
            syntax,
            cursor: ripped.cursor,
        }
    }

    /// Cached declarations of the other files of the package in `dir`.
    fn siblings(&self, dir: &Path, filename: &Path, package: &str) -> Result<Vec<Arc<FileDecls>>> {
        if package.is_empty() {
            return Ok(Vec::new());
        }
        let is_test = filename
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_test.go"));
        let paths: Vec<PathBuf> = match self.dirs.go_files(dir, is_test) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::debug!(dir = %dir.display(), "cannot list package directory: {err}");
                return Ok(Vec::new());
            }
        };
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .filter(|p| p.file_name() != filename.file_name())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.') && !n.starts_with('_'))
            })
            .collect();

        let results: Vec<Result<Arc<FileDecls>>> = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    catch_unwind(AssertUnwindSafe(|| self.decls.get_and_update(path)))
                        .map_err(Error::from_panic)
                })
                .collect()
        });
        let siblings = Error::join(results)?;
        Ok(siblings
            .into_iter()
            .filter(|file| file.package == package)
            .collect())
    }

    /// Bring every imported package up to date and bind it to its import
    /// spec, per file, in the order of `files`.
    fn resolve_imports(
        &self,
        files: &[&FileDecls],
        src_dir: &Path,
    ) -> Result<Vec<Vec<ResolvedImport>>> {
        let located: Vec<Vec<(&ImportSpec, PackageRequest)>> = files
            .iter()
            .map(|file| {
                file.imports
                    .iter()
                    .filter_map(|spec| {
                        let request = self.packages.locate(&spec.path, src_dir);
                        if request.is_none() {
                            tracing::debug!(import = %spec.path, "package not found");
                        }
                        request.map(|r| (spec, r))
                    })
                    .collect()
            })
            .collect();

        let requests: Vec<PackageRequest> = located
            .iter()
            .flatten()
            .map(|(_, request)| request.clone())
            .collect();
        self.packages.ensure_fresh(&requests)?;

        Ok(located
            .into_iter()
            .map(|specs| {
                specs
                    .into_iter()
                    .filter_map(|(spec, request)| {
                        let package = self.packages.get(&request.key)?;
                        Some(ResolvedImport {
                            alias: spec.alias.clone(),
                            package,
                        })
                    })
                    .collect()
            })
            .collect())
    }

    fn collect(
        &self,
        context: &CursorContext,
        resolver: &Resolver<'_>,
        src_dir: &Path,
        ignore_case: bool,
    ) -> Vec<Candidate> {
        if context.mode == CompletionMode::Import {
            let current = self.import_path_of(src_dir);
            return import_candidates(
                &self.dirs,
                &self.config.lib_paths,
                &context.partial,
                &current,
                ignore_case,
            );
        }

        let mut collector = CandidateCollector::new(
            resolver,
            &context.partial,
            context.kind_filter,
            self.config.propose_builtins,
            ignore_case,
        );
        match &context.mode {
            CompletionMode::Scope | CompletionMode::Import => {
                collector.from_scope(resolver.local_scope());
            }
            CompletionMode::Selector(expr) => {
                if let Some(subject) = self.subject(expr, resolver, src_dir) {
                    collector.from_decl(&subject, false);
                }
            }
            CompletionMode::StructField(ty) => match struct_literal_type(ty, resolver) {
                Some(subject) => collector.from_decl(&subject, true),
                None => collector.from_scope(resolver.local_scope()),
            },
        }
        collector.finish()
    }

    /// Declaration whose members follow `expr.`; with unimported packages
    /// enabled a bare unknown name may also be a package path.
    fn subject(&self, expr: &Expr, resolver: &Resolver<'_>, src_dir: &Path) -> Option<Arc<Decl>> {
        if let Some(decl) = resolver.resolve(expr) {
            return Some(decl);
        }
        if !self.config.unimported_packages {
            return None;
        }
        let name = expr.unparen().as_ident()?;
        if resolver.local_scope().lookup(name).is_some() {
            return None;
        }
        let package = self.packages.get_or_import(name, src_dir)?;
        tracing::trace!(package = %package.import_path, "completing unimported package");
        Some(package.root.clone())
    }

    /// Import path of the package in `dir`, relative to the first search
    /// root containing it.
    fn import_path_of(&self, dir: &Path) -> String {
        self.config
            .lib_paths
            .iter()
            .find_map(|root| dir.strip_prefix(root).ok())
            .map(|rel| {
                rel.components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => part.to_str(),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

/// The named struct type `ty` denotes, if it is one.
fn struct_literal_type(ty: &Expr, resolver: &Resolver<'_>) -> Option<Arc<Decl>> {
    let decl = resolver.type_to_decl(ty, &Origin::Local)?;
    let decl = resolver.dealias(decl)?;
    if decl.kind != DeclKind::Type {
        return None;
    }
    let underlying = resolver.advance_to_struct_or_interface(&decl)?;
    matches!(underlying.ty.as_ref().map(Expr::unparen), Some(Expr::StructType(_))).then_some(decl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GoParser;
    use std::fs;

    fn context(config: Config) -> AutoCompleteContext {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .expect("pool");
        AutoCompleteContext::new(
            config,
            Arc::new(GoParser),
            None,
            Arc::new(pool),
            Arc::new(Counters::default()),
        )
    }

    fn complete(ctx: &AutoCompleteContext, path: &Path, marked: &str) -> Completion {
        let cursor = marked.find('‸').expect("cursor marker");
        let src = marked.replace('‸', "");
        ctx.apropos(&src, path, cursor).expect("apropos")
    }

    fn names(completion: &Completion) -> Vec<&str> {
        completion.candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_selector_on_local() {
        let ctx = context(Config::default());
        let got = complete(
            &ctx,
            Path::new("main.go"),
            "package p\ntype T struct{ X int }\nfunc f(){ var t T; t.‸ }",
        );
        assert_eq!(names(&got), ["X"]);
        assert_eq!(got.candidates[0].kind, DeclKind::Var);
        assert_eq!(got.replace_len, 0);
    }

    #[test]
    fn test_scope_sees_locals_and_package() {
        let ctx = context(Config::default());
        let got = complete(
            &ctx,
            Path::new("main.go"),
            "package p\nvar counter int\nfunc f(count int) {\n\tcountAll := 0\n\tco‸\n}\nfunc g() { later := 1 }\n",
        );
        assert_eq!(names(&got), ["count", "countAll", "counter"]);
        assert_eq!(got.replace_len, 2);
    }

    #[test]
    fn test_siblings_and_imports() {
        let root = tempfile::tempdir().expect("tempdir");
        let lib = root.path().join("lib");
        let shapes = lib.join("shapes");
        let app = root.path().join("app");
        fs::create_dir_all(&shapes).expect("mkdir");
        fs::create_dir_all(&app).expect("mkdir");
        fs::write(
            shapes.join("shapes.go"),
            "package shapes\ntype Circle struct{ R float64 }\nfunc NewCircle(r float64) *Circle { return nil }\nfunc hidden() {}\n",
        )
        .expect("write");
        fs::write(
            app.join("util.go"),
            "package main\nimport sh \"shapes\"\nfunc helper() *sh.Circle { return nil }\n",
        )
        .expect("write");
        fs::write(app.join("other.go"), "package other\nfunc Nope() {}\n").expect("write");

        let ctx = context(Config::default().with_lib_paths([lib]));
        let main = app.join("main.go");

        let got = complete(&ctx, &main, "package main\nfunc main() { helper().‸ }");
        assert_eq!(names(&got), ["R"]);
        assert_eq!(got.candidates[0].type_sig, "float64");

        let got = complete(
            &ctx,
            &main,
            "package main\nimport \"shapes\"\nfunc main() { shapes.‸ }",
        );
        assert_eq!(names(&got), ["Circle", "NewCircle"]);
        assert_eq!(
            got.candidates[1].to_string(),
            "func NewCircle(r float64) *shapes.Circle"
        );

        let got = complete(&ctx, &main, "package main\nfunc main() { No‸ }");
        assert!(got.is_empty());
    }

    #[test]
    fn test_struct_literal_fields() {
        let ctx = context(Config::default());
        let src = "package p\ntype P struct{ Name string; Age int }\nfunc (P) M() {}\nfunc f() { _ = P{‸ }";
        let got = complete(&ctx, Path::new("a.go"), src);
        assert_eq!(names(&got), ["Age", "Name"]);

        // Not a struct: the scope is listed instead.
        let src = "package p\nfunc f(ok bool) { if ok {‸ } }";
        let got = complete(&ctx, Path::new("a.go"), src);
        assert!(names(&got).contains(&"ok"));
    }

    #[test]
    fn test_case_insensitive_retry() {
        let ctx = context(Config::default());
        let got = complete(&ctx, Path::new("a.go"), "package p\nvar Value int\nfunc f() { val‸ }");
        assert_eq!(names(&got), ["Value"]);
    }

    #[test]
    fn test_unimported_package() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join("mathx");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("m.go"), "package mathx\nconst Pi = 3.14\n").expect("write");

        let src = "package p\nfunc f() { mathx.‸ }";
        let off = context(Config::default().with_lib_paths([root.path().to_path_buf()]));
        assert!(complete(&off, Path::new("a.go"), src).is_empty());

        let on = context(
            Config::default()
                .with_lib_paths([root.path().to_path_buf()])
                .with_unimported_packages(true),
        );
        let got = complete(&on, Path::new("a.go"), src);
        assert_eq!(names(&got), ["Pi"]);
        assert_eq!(got.candidates[0].type_sig, "float64");
    }

    #[test]
    fn test_cursor_past_end() {
        let ctx = context(Config::default());
        let err = ctx.apropos("package p", Path::new("a.go"), 42).unwrap_err();
        assert!(matches!(err, Error::CursorOutOfRange { cursor: 42, len: 9 }));
    }
}
