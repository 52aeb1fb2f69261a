//! Expression and type resolution.
//!
//! The resolver answers two questions for the completion engine:
//!
//! 1. What type does an expression have? ([`Resolver::expr_type`])
//! 2. Which declaration's members should follow `expr.`?
//!    ([`Resolver::expr_to_decl`], exposed through [`TypeResolver`])
//!
//! It is a best-effort approximation of Go's type rules, not a checker:
//! enough to follow selectors, calls, indexing, `range` clauses and the
//! common builtins through named, pointer and alias types.
//!
//! # Scopes
//!
//! Every [`Decl`] records its [`Origin`], and type expressions are resolved
//! in the scope that origin selects:
//!
//! - [`Origin::Local`] → the scope at the cursor
//! - [`Origin::File`] → that file's scope (its imports over the package)
//! - [`Origin::Package`] → the imported package's scope, plus its imports
//! - [`Origin::Universe`] → predeclared identifiers only

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::decl::{Decl, DeclKind, Origin, ValueMode};
use super::lower::anonymous_type;
use super::scope::Scope;
use crate::base::{DeclId, FileId};
use crate::syntax::{ChanDir, Expr, LitKind, TypeExpr, UnaryOp};

const MAX_DEPTH: u32 = 64;

/// Access to imported packages during resolution.
pub trait PackageLookup {
    /// Top-level scope of the package stored under `key`.
    fn package_scope(&self, key: &str) -> Option<Arc<Scope>>;

    /// The package that `alias` names inside the files of package `key`.
    fn import_of(&self, key: &str, alias: &str) -> Option<Arc<Decl>>;

    /// Declared name of the package stored under `key`.
    fn package_name(&self, key: &str) -> Option<SmolStr>;
}

/// Expression/type resolver collaborator.
pub trait TypeResolver {
    /// Declaration whose members follow `expr.` at the cursor.
    fn resolve(&self, expr: &Expr) -> Option<Arc<Decl>>;
}

/// A type expression together with the origin it must be resolved in.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub expr: TypeExpr,
    pub origin: Origin,
}

impl TypeRef {
    pub fn new(expr: TypeExpr, origin: Origin) -> Self {
        Self { expr, origin }
    }

    fn universe(name: &'static str) -> Self {
        Self::new(Expr::ident(name), Origin::Universe)
    }
}

pub struct Resolver<'a> {
    universe: Arc<Scope>,
    package: Arc<Scope>,
    files: &'a FxHashMap<FileId, Arc<Scope>>,
    local: Arc<Scope>,
    packages: &'a dyn PackageLookup,
    depth: Cell<u32>,
    inferring: RefCell<FxHashSet<DeclId>>,
}

struct DepthGuard<'r>(&'r Cell<u32>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<'a> Resolver<'a> {
    /// Create a new resolver.
    ///
    /// `local` is the scope at the cursor; `package` is the merged package
    /// scope and `files` maps each file of the package to its file scope.
    pub fn new(
        universe: Arc<Scope>,
        package: Arc<Scope>,
        files: &'a FxHashMap<FileId, Arc<Scope>>,
        local: Arc<Scope>,
        packages: &'a dyn PackageLookup,
    ) -> Self {
        Self {
            universe,
            package,
            files,
            local,
            packages,
            depth: Cell::new(0),
            inferring: RefCell::new(FxHashSet::default()),
        }
    }

    pub fn universe(&self) -> &Arc<Scope> {
        &self.universe
    }

    pub fn local_scope(&self) -> &Arc<Scope> {
        &self.local
    }

    pub fn packages(&self) -> &dyn PackageLookup {
        self.packages
    }

    fn descend(&self) -> Option<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return None;
        }
        self.depth.set(depth + 1);
        Some(DepthGuard(&self.depth))
    }

    // ========================================================================
    // NAME LOOKUP
    // ========================================================================

    /// Scope that names in declarations of `origin` resolve in.
    pub fn scope_for(&self, origin: &Origin) -> Option<Arc<Scope>> {
        match origin {
            Origin::Universe => Some(self.universe.clone()),
            Origin::Local => Some(self.local.clone()),
            Origin::File(id) => Some(
                self.files
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| self.package.clone()),
            ),
            Origin::Package(key) => self.packages.package_scope(key),
        }
    }

    /// Resolve a bare name as seen from `origin`.
    pub fn lookup(&self, name: &str, origin: &Origin) -> Option<Arc<Decl>> {
        if let Some(decl) = self
            .scope_for(origin)
            .and_then(|scope| scope.lookup(name).cloned())
        {
            return Some(decl);
        }
        match origin {
            Origin::Package(key) => self.packages.import_of(key, name),
            _ => None,
        }
    }

    // ========================================================================
    // TYPES TO DECLARATIONS
    // ========================================================================

    /// Declaration of the named (or literal struct/interface) type `ty`.
    ///
    /// Pointers are looked through.
    pub fn type_to_decl(&self, ty: &TypeExpr, origin: &Origin) -> Option<Arc<Decl>> {
        let _guard = self.descend()?;
        match ty.unparen() {
            Expr::Ident(name) => self
                .lookup(name, origin)
                .filter(|d| d.kind == DeclKind::Type),
            Expr::Selector { base, name } => {
                let package = self.package_of(base, origin)?;
                package
                    .child(name)
                    .filter(|d| d.kind == DeclKind::Type)
                    .cloned()
            }
            Expr::Star(inner) => self.type_to_decl(inner, origin),
            other => anonymous_type(other, origin).map(Arc::new),
        }
    }

    fn package_of(&self, base: &Expr, origin: &Origin) -> Option<Arc<Decl>> {
        let name = base.unparen().as_ident()?;
        self.lookup(name, origin)
            .filter(|d| d.kind == DeclKind::Package)
    }

    /// Follow `type A = B` chains to the first non-alias declaration.
    pub fn dealias(&self, decl: Arc<Decl>) -> Option<Arc<Decl>> {
        let mut visited = FxHashSet::default();
        let mut decl = decl;
        while decl.is_alias() {
            if !visited.insert(decl.id) {
                return None;
            }
            let ty = decl.ty.as_ref()?;
            decl = self.type_to_decl(ty, &decl.origin)?;
        }
        Some(decl)
    }

    /// Walk `type A B` definitions until a struct or interface literal.
    pub fn advance_to_struct_or_interface(&self, decl: &Arc<Decl>) -> Option<Arc<Decl>> {
        let mut visited = FxHashSet::default();
        let mut decl = decl.clone();
        loop {
            if !visited.insert(decl.id) {
                return None;
            }
            let ty = decl.ty.as_ref()?;
            if matches!(ty.unparen(), Expr::StructType(_) | Expr::InterfaceType(_)) {
                return Some(decl);
            }
            decl = self.type_to_decl(ty, &decl.origin)?;
        }
    }

    /// Find field or method `name` of a type, searching embedded types
    /// breadth first so the shallowest declaration wins.
    pub fn find_member(&self, decl: &Arc<Decl>, name: &str) -> Option<Arc<Decl>> {
        let mut visited = FxHashSet::default();
        let mut level = vec![decl.clone()];
        while !level.is_empty() {
            let mut next = Vec::new();
            for decl in level {
                let Some(decl) = self.dealias(decl) else {
                    continue;
                };
                if !visited.insert(decl.id) {
                    continue;
                }
                if let Some(child) = decl.child(name) {
                    return Some(child.clone());
                }
                let underlying = self
                    .advance_to_struct_or_interface(&decl)
                    .filter(|u| u.id != decl.id);
                if let Some(child) = underlying.as_ref().and_then(|u| u.child(name)) {
                    return Some(child.clone());
                }
                for holder in std::iter::once(&decl).chain(underlying.as_ref()) {
                    for emb in &holder.embedded {
                        next.extend(self.type_to_decl(emb, &holder.origin));
                    }
                }
            }
            level = next;
        }
        None
    }

    // ========================================================================
    // EXPRESSION TO DECLARATION
    // ========================================================================

    /// Declaration whose members are reachable through `expr.`.
    ///
    /// Packages and types resolve to themselves; values resolve to the
    /// declaration of their type.
    pub fn expr_to_decl(&self, expr: &Expr, origin: &Origin) -> Option<Arc<Decl>> {
        let _guard = self.descend()?;
        match expr.unparen() {
            Expr::Ident(name) => {
                let decl = self.lookup(name, origin)?;
                match decl.kind {
                    DeclKind::Package | DeclKind::Type => Some(decl),
                    DeclKind::Var | DeclKind::Const | DeclKind::Func => {
                        self.type_ref_decl(&self.decl_type(&decl)?)
                    }
                    _ => None,
                }
            }
            Expr::Selector { base, name } => {
                let member = self.selector_decl(base, name, origin)?;
                match member.kind {
                    DeclKind::Package | DeclKind::Type => Some(member),
                    _ => self.type_ref_decl(&self.decl_type(&member)?),
                }
            }
            other => self.type_ref_decl(&self.expr_type(other, origin)?),
        }
    }

    fn type_ref_decl(&self, ty: &TypeRef) -> Option<Arc<Decl>> {
        self.type_to_decl(&ty.expr, &ty.origin)
    }

    fn selector_decl(&self, base: &Expr, name: &str, origin: &Origin) -> Option<Arc<Decl>> {
        if let Some(package) = self.package_of(base, origin) {
            return package.child(name).cloned();
        }
        let owner = self.expr_to_decl(base, origin)?;
        self.find_member(&owner, name)
    }

    // ========================================================================
    // TYPE INFERENCE
    // ========================================================================

    /// Type of a declaration: the declared one, else inferred from its
    /// initializer.
    pub fn decl_type(&self, decl: &Decl) -> Option<TypeRef> {
        if let Some(ty) = &decl.ty {
            return Some(TypeRef::new(ty.clone(), decl.origin.clone()));
        }
        let value = decl.value.as_ref()?;
        if !self.inferring.borrow_mut().insert(decl.id) {
            return None;
        }
        let ty = match decl.value_mode {
            ValueMode::Direct => self.expr_type_at(value, &decl.origin, decl.value_index),
            mode => self.range_type(value, &decl.origin, mode),
        };
        self.inferring.borrow_mut().remove(&decl.id);
        ty
    }

    /// Type of `expr` evaluated in `origin`.
    pub fn expr_type(&self, expr: &Expr, origin: &Origin) -> Option<TypeRef> {
        self.expr_type_at(expr, origin, 0)
    }

    /// Type of the `index`-th value of a multi-value expression.
    fn expr_type_at(&self, expr: &Expr, origin: &Origin, index: usize) -> Option<TypeRef> {
        let _guard = self.descend()?;
        match expr {
            Expr::Ident(name) => {
                let decl = self.lookup(name, origin)?;
                match decl.kind {
                    DeclKind::Var | DeclKind::Const | DeclKind::Func => self.decl_type(&decl),
                    _ => None,
                }
            }
            Expr::BasicLit { kind, .. } => Some(TypeRef::universe(match kind {
                LitKind::Int => "int",
                LitKind::Float => "float64",
                LitKind::Imaginary => "complex128",
                LitKind::Rune => "rune",
                LitKind::String => "string",
            })),
            Expr::CompositeLit { ty, .. } => {
                Some(TypeRef::new(ty.as_deref()?.clone(), origin.clone()))
            }
            Expr::FuncLit { ty, .. } => {
                Some(TypeRef::new(Expr::FuncType(ty.clone()), origin.clone()))
            }
            Expr::Paren(inner) => self.expr_type_at(inner, origin, index),
            Expr::Selector { base, name } => {
                let member = self.selector_decl(base, name, origin)?;
                match member.kind {
                    DeclKind::Var | DeclKind::Const | DeclKind::Func => self.decl_type(&member),
                    _ => None,
                }
            }
            Expr::Index { base, .. } => {
                if index == 1 {
                    return Some(TypeRef::universe("bool"));
                }
                let base_ty = self.underlying(self.expr_type(base, origin)?)?;
                match base_ty.expr.unparen() {
                    Expr::ArrayType { elem, .. } => {
                        Some(TypeRef::new((**elem).clone(), base_ty.origin))
                    }
                    Expr::MapType { value, .. } => {
                        Some(TypeRef::new((**value).clone(), base_ty.origin))
                    }
                    Expr::Star(inner) => match self.underlying(TypeRef::new(
                        (**inner).clone(),
                        base_ty.origin.clone(),
                    ))?
                    .expr
                    {
                        Expr::ArrayType { elem, .. } => {
                            Some(TypeRef::new(*elem, base_ty.origin))
                        }
                        _ => None,
                    },
                    Expr::Ident(name) if name.as_str() == "string" => {
                        Some(TypeRef::universe("byte"))
                    }
                    _ => None,
                }
            }
            Expr::Slice { base } => {
                let base_ty = self.expr_type(base, origin)?;
                if let Expr::Star(inner) = base_ty.expr.unparen() {
                    let pointee = self.underlying(TypeRef::new(
                        (**inner).clone(),
                        base_ty.origin.clone(),
                    ))?;
                    if let Expr::ArrayType { elem, .. } = pointee.expr {
                        return Some(TypeRef::new(
                            Expr::ArrayType { len: None, elem },
                            pointee.origin,
                        ));
                    }
                }
                Some(base_ty)
            }
            Expr::TypeAssert { ty, .. } => {
                if index == 1 {
                    return Some(TypeRef::universe("bool"));
                }
                Some(TypeRef::new(ty.as_deref()?.clone(), origin.clone()))
            }
            Expr::Call { func, args } => self.call_type(func, args, origin, index),
            Expr::Star(inner) => {
                let ptr = self.expr_type(inner, origin)?;
                match ptr.expr.unparen() {
                    Expr::Star(pointee) => Some(TypeRef::new((**pointee).clone(), ptr.origin)),
                    _ => None,
                }
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Addr => {
                    let ty = self.expr_type(operand, origin)?;
                    Some(TypeRef::new(Expr::star(ty.expr), ty.origin))
                }
                UnaryOp::Recv => {
                    if index == 1 {
                        return Some(TypeRef::universe("bool"));
                    }
                    let chan = self.underlying(self.expr_type(operand, origin)?)?;
                    match chan.expr {
                        Expr::ChanType { elem, .. } => Some(TypeRef::new(*elem, chan.origin)),
                        _ => None,
                    }
                }
                UnaryOp::Not => Some(TypeRef::universe("bool")),
                _ => self.expr_type(operand, origin),
            },
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() {
                    return Some(TypeRef::universe("bool"));
                }
                if op.is_shift() {
                    return self.expr_type(lhs, origin);
                }
                // Untyped constants take the type of the other operand.
                if matches!(**lhs, Expr::BasicLit { .. }) {
                    self.expr_type(rhs, origin)
                        .or_else(|| self.expr_type(lhs, origin))
                } else {
                    self.expr_type(lhs, origin)
                        .or_else(|| self.expr_type(rhs, origin))
                }
            }
            _ => None,
        }
    }

    fn call_type(
        &self,
        func: &Expr,
        args: &[Expr],
        origin: &Origin,
        index: usize,
    ) -> Option<TypeRef> {
        let callee = func.unparen();

        // Conversions.
        if callee.is_type_literal() {
            return Some(TypeRef::new(callee.clone(), origin.clone()));
        }
        if let Expr::Star(inner) = callee {
            if self.type_to_decl(inner, origin).is_some() {
                return Some(TypeRef::new(callee.clone(), origin.clone()));
            }
        }
        match callee {
            Expr::Ident(name) => {
                let decl = self.lookup(name, origin)?;
                if decl.kind == DeclKind::Type {
                    return Some(TypeRef::new(callee.clone(), origin.clone()));
                }
                if decl.origin == Origin::Universe && decl.kind == DeclKind::Func {
                    return self.builtin_call_type(name, args, origin);
                }
            }
            Expr::Selector { base, name } => {
                let is_type = self
                    .package_of(base, origin)
                    .and_then(|package| package.child(name).map(|d| d.kind == DeclKind::Type))
                    .unwrap_or(false);
                if is_type {
                    return Some(TypeRef::new(callee.clone(), origin.clone()));
                }
            }
            _ => {}
        }

        let func_ty = self.underlying(self.expr_type(callee, origin)?)?;
        match &func_ty.expr {
            Expr::FuncType(sig) => Some(TypeRef::new(sig.result(index)?.clone(), func_ty.origin)),
            _ => None,
        }
    }

    fn builtin_call_type(&self, name: &str, args: &[Expr], origin: &Origin) -> Option<TypeRef> {
        let first = args.first();
        match name {
            "new" => Some(TypeRef::new(Expr::star(first?.clone()), origin.clone())),
            "make" => Some(TypeRef::new(first?.clone(), origin.clone())),
            "append" | "min" | "max" => self.expr_type(first?, origin),
            "len" | "cap" | "copy" => Some(TypeRef::universe("int")),
            "complex" => Some(TypeRef::universe("complex128")),
            "real" | "imag" => Some(TypeRef::universe("float64")),
            "recover" => Some(TypeRef::universe("any")),
            _ => None,
        }
    }

    /// Element types produced by `range` over a value of `value`'s type.
    fn range_type(&self, value: &Expr, origin: &Origin, mode: ValueMode) -> Option<TypeRef> {
        let ranged = self.underlying(self.expr_type(value, origin)?)?;
        let key = mode == ValueMode::RangeKey;
        let ranged = match ranged.expr {
            Expr::Star(inner) => self.underlying(TypeRef::new(*inner, ranged.origin))?,
            _ => ranged,
        };
        match ranged.expr {
            Expr::ArrayType { elem, .. } => Some(if key {
                TypeRef::universe("int")
            } else {
                TypeRef::new(*elem, ranged.origin)
            }),
            Expr::MapType { key: k, value: v } => Some(TypeRef::new(
                if key { *k } else { *v },
                ranged.origin,
            )),
            Expr::ChanType { elem, dir } if dir != ChanDir::Send && key => {
                Some(TypeRef::new(*elem, ranged.origin))
            }
            Expr::Ident(name) if name.as_str() == "string" => Some(TypeRef::universe(if key {
                "int"
            } else {
                "rune"
            })),
            Expr::Ident(_) if key => Some(ranged),
            _ => None,
        }
    }

    /// Resolve named types down to the type literal they are defined as.
    ///
    /// Predeclared types are returned as is.
    pub fn underlying(&self, ty: TypeRef) -> Option<TypeRef> {
        let mut visited = FxHashSet::default();
        let mut ty = ty;
        loop {
            match ty.expr.unparen() {
                Expr::Ident(_) | Expr::Selector { .. } => {
                    let decl = self.type_to_decl(&ty.expr, &ty.origin)?;
                    if !visited.insert(decl.id) {
                        return None;
                    }
                    match &decl.ty {
                        Some(next) => ty = TypeRef::new(next.clone(), decl.origin.clone()),
                        None => return Some(ty),
                    }
                }
                Expr::Paren(inner) => ty = TypeRef::new((**inner).clone(), ty.origin),
                _ => return Some(ty),
            }
        }
    }
}

impl TypeResolver for Resolver<'_> {
    fn resolve(&self, expr: &Expr) -> Option<Arc<Decl>> {
        self.expr_to_decl(expr, &Origin::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{lower_file, universe};
    use crate::syntax::parser::{parse_expr, parse_file};

    struct NoPackages;

    impl PackageLookup for NoPackages {
        fn package_scope(&self, _: &str) -> Option<Arc<Scope>> {
            None
        }
        fn import_of(&self, _: &str, _: &str) -> Option<Arc<Decl>> {
            None
        }
        fn package_name(&self, _: &str) -> Option<SmolStr> {
            None
        }
    }

    struct Fixture {
        universe: Arc<Scope>,
        package: Arc<Scope>,
        files: FxHashMap<FileId, Arc<Scope>>,
    }

    impl Fixture {
        fn new(src: &str) -> Self {
            let universe = universe();
            let mut package = Scope::new(Some(universe.clone()));
            let origin = Origin::File(FileId::new(0));
            for decl in lower_file(&parse_file(src), &origin).values() {
                package.merge_decl(decl);
            }
            Self {
                universe,
                package: Arc::new(package),
                files: FxHashMap::default(),
            }
        }

        fn resolve(&self, expr: &str) -> Option<Arc<Decl>> {
            let resolver = Resolver::new(
                self.universe.clone(),
                self.package.clone(),
                &self.files,
                self.package.clone(),
                &NoPackages,
            );
            resolver.resolve(&parse_expr(expr).expect("expression"))
        }
    }

    const SRC: &str = "package p
type T struct {
	X int
	next *T
	Embedded
}
type Embedded struct{ Y string }
type Alias = T
type Named T
func (t *T) Method() *T { return t }
func NewT() (*T, error) { return nil, nil }
var t T
var pt = &t
var m map[string][]*T
var ch chan T
var anon struct{ Z int }
var pair, perr = NewT()
";

    #[test]
    fn test_resolve_var_and_pointer() {
        let fx = Fixture::new(SRC);
        assert_eq!(fx.resolve("t").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("pt").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("*pt").map(|d| d.name.clone()), Some("T".into()));
    }

    #[test]
    fn test_resolve_through_calls_and_fields() {
        let fx = Fixture::new(SRC);
        assert_eq!(fx.resolve("t.Method()").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("t.next").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("NewT()").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("pair").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("perr").map(|d| d.name.clone()), Some("error".into()));
    }

    #[test]
    fn test_resolve_index_range_and_chan() {
        let fx = Fixture::new(SRC);
        assert_eq!(fx.resolve("m[\"k\"][0]").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("<-ch").map(|d| d.name.clone()), Some("T".into()));
    }

    #[test]
    fn test_resolve_embedded_member() {
        let fx = Fixture::new(SRC);
        // Y is promoted from Embedded; its type is the predeclared string.
        assert_eq!(fx.resolve("t.Y").map(|d| d.name.clone()), Some("string".into()));
    }

    #[test]
    fn test_resolve_conversion_and_builtins() {
        let fx = Fixture::new(SRC);
        assert_eq!(fx.resolve("T(t)").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("(*T)(nil)").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("new(T)").map(|d| d.name.clone()), Some("T".into()));
        assert_eq!(fx.resolve("T{}").map(|d| d.name.clone()), Some("T".into()));
    }

    #[test]
    fn test_anonymous_struct() {
        let fx = Fixture::new(SRC);
        let decl = fx.resolve("anon").expect("anonymous struct");
        assert!(decl.child("Z").is_some());
    }

    #[test]
    fn test_dealias_and_underlying() {
        let fx = Fixture::new(SRC);
        let resolver = Resolver::new(
            fx.universe.clone(),
            fx.package.clone(),
            &fx.files,
            fx.package.clone(),
            &NoPackages,
        );
        let alias = fx.package.get("Alias").cloned().expect("alias");
        assert_eq!(resolver.dealias(alias).map(|d| d.name.clone()), Some("T".into()));

        let named = fx.package.get("Named").cloned().expect("named");
        let under = resolver
            .advance_to_struct_or_interface(&named)
            .expect("underlying struct");
        assert_eq!(under.name, "T");
    }

    #[test]
    fn test_recursive_inference_terminates() {
        let fx = Fixture::new("package p\nvar a = b\nvar b = a\nvar c = c.x\n");
        assert!(fx.resolve("a").is_none());
        assert!(fx.resolve("c").is_none());
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let fx = Fixture::new("package p\ntype A = B\ntype B = A\n");
        let resolver = Resolver::new(
            fx.universe.clone(),
            fx.package.clone(),
            &fx.files,
            fx.package.clone(),
            &NoPackages,
        );
        let a = fx.package.get("A").cloned().expect("A");
        assert!(resolver.dealias(a).is_none());
    }
}
