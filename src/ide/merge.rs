//! Building the package scope for one request.
//!
//! The scope is rebuilt from cached declarations on every request rather
//! than patched: declarations are immutable snapshots, and a name defined
//! in several files is merged into a fresh copy (see
//! [`Scope::merge_decl`]).

use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::hir::{Decl, DeclMap, Scope, is_exported};
use crate::project::PackageSnapshot;
use crate::syntax::Expr;

/// An import statement bound to the package it names.
#[derive(Clone, Debug)]
pub struct ResolvedImport {
    /// Explicit alias, `.` or `_`; `None` means the package's own name.
    pub alias: Option<SmolStr>,
    pub package: Arc<PackageSnapshot>,
}

impl ResolvedImport {
    pub fn is_dot(&self) -> bool {
        self.alias.as_deref() == Some(".")
    }

    /// The name this import binds in the file scope, if any.
    pub fn binding(&self) -> Option<&SmolStr> {
        match self.alias.as_deref() {
            Some("." | "_") => None,
            Some(_) => self.alias.as_ref(),
            None => Some(&self.package.name),
        }
    }
}

/// Merge a file's top-level declarations into the package scope.
pub fn merge_decls(package: &mut Scope, decls: &DeclMap) {
    for decl in decls.values() {
        package.merge_decl(decl);
    }
}

/// Merge the exported members of every dot-imported package.
pub fn merge_dot_imports(package: &mut Scope, imports: &[ResolvedImport]) {
    for import in imports.iter().filter(|i| i.is_dot()) {
        for member in import.package.root.children.values() {
            if is_exported(&member.name) {
                package.merge_decl(member);
            }
        }
    }
}

/// Bind each import name in a file scope to its package root.
pub fn fixup_packages(file_scope: &mut Scope, imports: &[ResolvedImport]) {
    for import in imports {
        if let Some(name) = import.binding() {
            file_scope.replace_decl(name.clone(), import.package.root.clone());
        }
    }
}

/// Move methods declared on alias names onto the type the alias chain
/// ends at.
///
/// `type A = B; func (A) M()` is legal Go and gives `B` the method `M`.
/// Chains that leave the package scope are left alone.
pub fn propagate_type_alias_methods(package: &mut Scope) {
    let aliases: Vec<Arc<Decl>> = package
        .entities()
        .filter(|(_, d)| d.is_alias() && !d.children.is_empty())
        .map(|(_, d)| d.clone())
        .collect();

    for alias in aliases {
        let mut methods = alias.children.clone();
        let mut visited = FxHashSet::default();
        let mut current = alias;
        let target = loop {
            if !visited.insert(current.id) {
                break None;
            }
            let Some(Expr::Ident(name)) = current.ty.as_ref().map(Expr::unparen) else {
                break None;
            };
            let Some(next) = package.get(name).cloned() else {
                break None;
            };
            if !next.is_alias() {
                break Some(next);
            }
            for (name, method) in &next.children {
                methods.entry(name.clone()).or_insert_with(|| method.clone());
            }
            current = next;
        };

        let Some(target) = target else { continue };
        if methods.keys().all(|name| target.children.contains_key(name)) {
            continue;
        }
        let mut copy = (*target).clone();
        for (name, method) in methods {
            copy.children.entry(name).or_insert(method);
        }
        package.replace_decl(copy.name.clone(), Arc::new(copy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;
    use crate::hir::{DeclKind, Origin, lower_file, universe};
    use crate::syntax::parser::parse_file;
    use rustc_hash::FxHashMap;

    fn decls(src: &str, file: u32) -> DeclMap {
        lower_file(&parse_file(src), &Origin::File(FileId::new(file)))
    }

    fn snapshot(name: &str, src: &str) -> Arc<PackageSnapshot> {
        let key: Arc<str> = Arc::from(format!("/lib/{name}"));
        let origin = Origin::Package(key.clone());
        let members = lower_file(&parse_file(src), &origin);
        let mut scope = Scope::new(Some(universe()));
        let mut root = Decl::new(name, DeclKind::Package, origin);
        for decl in members.values() {
            scope.merge_decl(decl);
            root.add_child(decl.clone());
        }
        Arc::new(PackageSnapshot {
            key,
            import_path: name.into(),
            name: name.into(),
            scope: Arc::new(scope),
            root: Arc::new(root),
            imports: FxHashMap::default(),
            dir: format!("/lib/{name}").into(),
        })
    }

    #[test]
    fn test_methods_from_two_files() {
        let a = decls("package p\ntype T struct{ X int }\nfunc (T) A() {}\n", 0);
        let b = decls("package p\nfunc (*T) B() {}\nfunc (*T) C() {}\n", 1);

        let mut package = Scope::new(Some(universe()));
        merge_decls(&mut package, &a);
        merge_decls(&mut package, &b);

        let t = package.get("T").expect("T");
        assert_eq!(t.kind, DeclKind::Type);
        let names: Vec<_> = t.children.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["X", "A", "B", "C"]);
        // The first file's snapshot is untouched.
        assert_eq!(a["T"].children.len(), 2);
    }

    #[test]
    fn test_stub_first_then_type() {
        let a = decls("package p\nfunc (*T) B() {}\n", 0);
        let b = decls("package p\ntype T struct{ X int }\n", 1);
        let mut package = Scope::new(None);
        merge_decls(&mut package, &a);
        merge_decls(&mut package, &b);
        let t = package.get("T").expect("T");
        assert_eq!(t.kind, DeclKind::Type);
        assert!(t.child("B").is_some() && t.child("X").is_some());
    }

    #[test]
    fn test_imports_bind_and_dot_merge() {
        let strings = snapshot("strings", "package strings\nfunc Split() {}\nfunc index() {}\n");
        let imports = vec![
            ResolvedImport {
                alias: None,
                package: strings.clone(),
            },
            ResolvedImport {
                alias: Some("str".into()),
                package: strings.clone(),
            },
            ResolvedImport {
                alias: Some("_".into()),
                package: strings.clone(),
            },
            ResolvedImport {
                alias: Some(".".into()),
                package: strings,
            },
        ];

        let mut package = Scope::new(None);
        merge_dot_imports(&mut package, &imports);
        assert!(package.get("Split").is_some());
        assert!(package.get("index").is_none());

        let mut file = Scope::new(Some(Arc::new(package)));
        fixup_packages(&mut file, &imports);
        assert_eq!(file.get("strings").map(|d| d.kind), Some(DeclKind::Package));
        assert!(file.get("str").is_some());
        assert!(file.get("_").is_none());
        assert!(file.get(".").is_none());
        assert!(file.lookup("Split").is_some());
    }

    #[test]
    fn test_alias_methods_move_to_target() {
        let a = decls(
            "package p\ntype T struct{}\ntype A = B\ntype B = T\nfunc (A) M() {}\n",
            0,
        );
        let mut package = Scope::new(None);
        merge_decls(&mut package, &a);
        propagate_type_alias_methods(&mut package);
        assert!(package.get("T").and_then(|t| t.child("M")).is_some());
    }

    #[test]
    fn test_alias_cycle_is_ignored() {
        let a = decls("package p\ntype A = B\ntype B = A\nfunc (A) M() {}\n", 0);
        let mut package = Scope::new(None);
        merge_decls(&mut package, &a);
        propagate_type_alias_methods(&mut package);
        assert!(package.get("B").is_some_and(|b| b.children.is_empty()));
    }
}
