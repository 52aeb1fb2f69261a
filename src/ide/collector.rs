//! Candidate filtering, deduplication and ordering.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::hir::{Decl, DeclKind, Origin, Resolver, Scope, candidate_type, is_exported};
use crate::project::{DirCache, vendorless_import_path};

/// One completion proposal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    pub name: String,
    /// Rendered Go type; empty for packages and imports.
    pub type_sig: String,
    pub kind: DeclKind,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeclKind::Func => {
                let sig = self.type_sig.strip_prefix("func").unwrap_or(&self.type_sig);
                write!(f, "func {}{sig}", self.name)
            }
            DeclKind::Package | DeclKind::Import => write!(f, "{} {}", self.kind, self.name),
            kind if self.type_sig.is_empty() => write!(f, "{kind} {}", self.name),
            kind => write!(f, "{kind} {} {}", self.name, self.type_sig),
        }
    }
}

/// Sort by kind, then name.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
}

/// Accumulates candidates for one pass over a scope or a subject
/// declaration.
pub struct CandidateCollector<'r, 'a> {
    resolver: &'r Resolver<'a>,
    partial: &'r str,
    lower_partial: String,
    kind_filter: Option<DeclKind>,
    propose_builtins: bool,
    ignore_case: bool,
    seen: FxHashSet<SmolStr>,
    candidates: Vec<Candidate>,
}

impl<'r, 'a> CandidateCollector<'r, 'a> {
    pub fn new(
        resolver: &'r Resolver<'a>,
        partial: &'r str,
        kind_filter: Option<DeclKind>,
        propose_builtins: bool,
        ignore_case: bool,
    ) -> Self {
        Self {
            resolver,
            partial,
            lower_partial: partial.to_lowercase(),
            kind_filter,
            propose_builtins,
            ignore_case,
            seen: FxHashSet::default(),
            candidates: Vec::new(),
        }
    }

    fn has_prefix(&self, name: &str) -> bool {
        if self.ignore_case {
            name.to_lowercase().starts_with(&self.lower_partial)
        } else {
            name.starts_with(self.partial)
        }
    }

    /// Offer `decl` under `name` if it passes every filter.
    ///
    /// A name is considered once: whoever offers it first decides, which
    /// makes the shallower of two declarations win.
    pub fn append_decl(&mut self, name: &SmolStr, decl: &Decl) {
        if !self.seen.insert(name.clone()) {
            return;
        }
        if decl.origin == Origin::Universe && !self.propose_builtins && name != "Error" {
            return;
        }
        match self.kind_filter {
            Some(kind) if decl.kind != kind => return,
            Some(_) => {}
            None if !self.has_prefix(name) => return,
            None => {}
        }
        if !decl.matches() || decl.ty.as_ref().is_some_and(|t| !t.is_well_formed()) {
            return;
        }
        self.candidates.push(Candidate {
            name: name.to_string(),
            type_sig: candidate_type(decl, self.resolver),
            kind: decl.kind,
        });
    }

    /// Every name visible from `scope`, nearest scope winning.
    pub fn from_scope(&mut self, scope: &Scope) {
        for (name, decl) in scope.collect_all() {
            self.append_decl(&name, &decl);
        }
    }

    /// Members of `subject`, including those promoted from embedded types.
    ///
    /// With `struct_field` set, methods are left out: only fields may be
    /// named in a composite literal.
    pub fn from_decl(&mut self, subject: &Arc<Decl>, struct_field: bool) {
        let Some(subject) = self.resolver.dealias(subject.clone()) else {
            return;
        };
        if subject.kind == DeclKind::Package {
            for (name, member) in &subject.children {
                if is_exported(name) {
                    self.append_decl(name, member);
                }
            }
            return;
        }

        let mut visited = FxHashSet::default();
        let mut level = vec![subject];
        while !level.is_empty() {
            let mut next = Vec::new();
            for decl in level {
                let Some(decl) = self.resolver.dealias(decl) else {
                    continue;
                };
                if !visited.insert(decl.id) {
                    continue;
                }
                for (name, member) in &decl.children {
                    if struct_field && member.kind == DeclKind::Func {
                        continue;
                    }
                    self.append_decl(name, member);
                }
                // `type T S` has the fields of S but not its methods.
                let underlying = self
                    .resolver
                    .advance_to_struct_or_interface(&decl)
                    .filter(|u| u.id != decl.id);
                if let Some(underlying) = &underlying {
                    for (name, member) in &underlying.children {
                        if member.kind == DeclKind::Var {
                            self.append_decl(name, member);
                        }
                    }
                }
                for holder in std::iter::once(&decl).chain(underlying.as_ref()) {
                    for emb in &holder.embedded {
                        next.extend(self.resolver.type_to_decl(emb, &holder.origin));
                    }
                }
            }
            level = next;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Sorted candidates.
    pub fn finish(mut self) -> Vec<Candidate> {
        sort_candidates(&mut self.candidates);
        self.candidates
    }
}

/// Import paths under `roots` that match `partial`.
///
/// A directory is an importable package when it holds non-test `.go`
/// files. Directories matching the partial path are walked all the way
/// down; vendored packages are listed under the path they are imported by.
pub fn import_candidates(
    dirs: &DirCache,
    roots: &[PathBuf],
    partial: &str,
    current_package: &str,
    ignore_case: bool,
) -> Vec<Candidate> {
    let mut found = FxHashSet::default();
    let walker = ImportWalker {
        dirs,
        partial,
        lower_partial: partial.to_lowercase(),
        current_package,
        ignore_case,
    };
    for root in roots {
        let (base, filter) = match partial.rsplit_once('/') {
            _ if partial.ends_with('/') => (partial.trim_end_matches('/'), false),
            Some((dir, _)) => (dir, true),
            None => ("", true),
        };
        walker.walk(root, base, filter, &mut found);
    }
    let mut candidates: Vec<Candidate> = found
        .into_iter()
        .map(|name| Candidate {
            name,
            type_sig: String::new(),
            kind: DeclKind::Import,
        })
        .collect();
    sort_candidates(&mut candidates);
    candidates
}

struct ImportWalker<'a> {
    dirs: &'a DirCache,
    partial: &'a str,
    lower_partial: String,
    current_package: &'a str,
    ignore_case: bool,
}

impl ImportWalker<'_> {
    fn matches(&self, rel: &str) -> bool {
        if self.ignore_case {
            rel.to_lowercase().starts_with(&self.lower_partial)
        } else {
            rel.starts_with(self.partial)
        }
    }

    /// Visit the children of `root/rel`; with `filter` set only those whose
    /// path relative to `root` starts with the partial.
    fn walk(&self, root: &Path, rel: &str, filter: bool, found: &mut FxHashSet<String>) {
        let dir = if rel.is_empty() {
            root.to_path_buf()
        } else {
            root.join(rel)
        };
        let Ok(entries) = self.dirs.read_dir(&dir) else {
            return;
        };
        for entry in entries.iter().filter(|e| e.is_dir) {
            let name = entry.name.as_str();
            if name.starts_with('.') || name.starts_with('_') || name == "testdata" {
                continue;
            }
            let child = if rel.is_empty() {
                name.to_owned()
            } else {
                format!("{rel}/{name}")
            };
            if filter && !self.matches(&child) {
                continue;
            }
            let path = dir.join(name);
            let is_package = self
                .dirs
                .go_files(&path, false)
                .is_ok_and(|files| !files.is_empty());
            if is_package {
                if let Some(import_path) = vendorless_import_path(&child, self.current_package) {
                    found.insert(import_path);
                }
            }
            self.walk(root, &child, false, found);
        }
    }
}
