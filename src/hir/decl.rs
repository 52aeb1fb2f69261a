//! Declarations: the named entities completion proposes.
//!
//! A [`Decl`] is immutable once it is shared behind an [`Arc`]. Merging two
//! declarations of one name (a type in one file, its methods in another)
//! goes through [`Decl::expanded`], which returns a new snapshot and leaves
//! both inputs untouched.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::{DeclId, FileId};
use crate::syntax::{Expr, TypeExpr};

/// What kind of entity a declaration names.
///
/// The variant order is the order candidates are listed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeclKind {
    Const,
    Var,
    Type,
    Func,
    Package,
    /// Methods seen before (or without) their receiver type.
    MethodsStub,
    Import,
    Label,
}

impl DeclKind {
    /// Get the keyword-like name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Const => "const",
            DeclKind::Var => "var",
            DeclKind::Type => "type",
            DeclKind::Func => "func",
            DeclKind::Package => "package",
            DeclKind::MethodsStub => "methods_stub",
            DeclKind::Import => "import",
            DeclKind::Label => "label",
        }
    }

    /// Kind filter requested by typing a keyword in full.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "const" => Some(DeclKind::Const),
            "var" => Some(DeclKind::Var),
            "type" => Some(DeclKind::Type),
            "func" => Some(DeclKind::Func),
            "package" => Some(DeclKind::Package),
            _ => None,
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a declaration came from, which decides the scope its type
/// expression is resolved in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Predeclared identifiers.
    Universe,
    /// A source file of the package being edited.
    File(FileId),
    /// An imported package, keyed by its artifact path.
    Package(Arc<str>),
    /// A local of the function under the cursor.
    Local,
}

/// How a variable's initializer yields its value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueMode {
    /// `value` itself, or its `value_index`-th result for tuples.
    #[default]
    Direct,
    /// Key of `for k := range value`.
    RangeKey,
    /// Element of `for _, v := range value`.
    RangeValue,
}

/// A named program entity.
#[derive(Clone, Debug)]
pub struct Decl {
    pub id: DeclId,
    pub name: SmolStr,
    pub kind: DeclKind,
    pub origin: Origin,
    /// Declared type, or the underlying type expression for `type` decls.
    pub ty: Option<TypeExpr>,
    /// Initializer used to infer a missing type.
    pub value: Option<Expr>,
    pub value_index: usize,
    pub value_mode: ValueMode,
    /// Fields and methods, or package members.
    pub children: IndexMap<SmolStr, Arc<Decl>>,
    /// Embedded struct fields and interfaces.
    pub embedded: Vec<TypeExpr>,
    /// `type A = B`
    pub alias: bool,
}

impl Decl {
    /// Create a new declaration with no type information.
    pub fn new(name: impl Into<SmolStr>, kind: DeclKind, origin: Origin) -> Self {
        Self {
            id: DeclId::fresh(),
            name: name.into(),
            kind,
            origin,
            ty: None,
            value: None,
            value_index: 0,
            value_mode: ValueMode::Direct,
            children: IndexMap::new(),
            embedded: Vec::new(),
            alias: false,
        }
    }

    /// Set the type expression.
    pub fn with_type(mut self, ty: TypeExpr) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Set the initializer.
    pub fn with_value(mut self, value: Expr, index: usize, mode: ValueMode) -> Self {
        self.value = Some(value);
        self.value_index = index;
        self.value_mode = mode;
        self
    }

    /// Insert or replace a child by name.
    pub fn add_child(&mut self, child: Arc<Decl>) {
        self.children.insert(child.name.clone(), child);
    }

    /// Get a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Arc<Decl>> {
        self.children.get(name)
    }

    pub fn is_alias(&self) -> bool {
        self.alias
    }

    /// Whether this declaration carries type or value information.
    pub fn has_type_info(&self) -> bool {
        self.ty.is_some() || self.value.is_some()
    }

    /// Whether the declaration may be offered as a candidate at all.
    pub fn matches(&self) -> bool {
        self.kind != DeclKind::MethodsStub
            && self.name != "_"
            && !self.name.starts_with('$')
            && !self.name.is_empty()
    }

    /// Fold `other`, a later declaration of the same name, into `self`.
    ///
    /// Children and embedded types are unioned, with `other` winning on a
    /// child name both define. Type information is taken from `other`
    /// whenever it has any.
    pub fn expand(&mut self, other: &Decl) {
        for (name, child) in &other.children {
            self.children.insert(name.clone(), child.clone());
        }
        for emb in &other.embedded {
            if !self.embedded.contains(emb) {
                self.embedded.push(emb.clone());
            }
        }
        if other.has_type_info() {
            self.ty = other.ty.clone();
            self.value = other.value.clone();
            self.value_index = other.value_index;
            self.value_mode = other.value_mode;
            self.alias = other.alias;
            self.origin = other.origin.clone();
        }
        if other.kind != DeclKind::MethodsStub {
            self.kind = other.kind;
        }
    }

    /// Copy-on-write merge: a new snapshot of `self` expanded by `other`.
    ///
    /// The copy keeps `self`'s id so traversals treat it as the same entity.
    pub fn expanded(&self, other: &Decl) -> Decl {
        let mut copy = self.clone();
        copy.expand(other);
        copy
    }
}

/// Whether `name` is visible outside its package.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str) -> Arc<Decl> {
        Arc::new(Decl::new(name, DeclKind::Func, Origin::Local))
    }

    #[test]
    fn test_kind_order() {
        let mut kinds = vec![
            DeclKind::Import,
            DeclKind::Func,
            DeclKind::Const,
            DeclKind::Package,
            DeclKind::Type,
            DeclKind::Var,
        ];
        kinds.sort();
        let names: Vec<_> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["const", "var", "type", "func", "package", "import"]);
    }

    #[test]
    fn test_expand_unions_children() {
        let mut a = Decl::new("T", DeclKind::Type, Origin::Local)
            .with_type(Expr::StructType(Vec::new()));
        a.add_child(func("A"));
        let mut b = Decl::new("T", DeclKind::MethodsStub, Origin::Local);
        b.add_child(func("B"));

        let merged = a.expanded(&b);
        assert_eq!(merged.children.len(), 2);
        assert_eq!(merged.kind, DeclKind::Type);
        assert_eq!(merged.ty, Some(Expr::StructType(Vec::new())));
        assert_eq!(merged.id, a.id);
        // The inputs are untouched.
        assert_eq!(a.children.len(), 1);
        assert_eq!(b.children.len(), 1);
    }

    #[test]
    fn test_expand_prefers_later_type_info() {
        let a = Decl::new("x", DeclKind::Var, Origin::Local).with_type(Expr::ident("int"));
        let b = Decl::new("x", DeclKind::Var, Origin::Local).with_type(Expr::ident("string"));
        assert_eq!(a.expanded(&b).ty, Some(Expr::ident("string")));

        let untyped = Decl::new("x", DeclKind::Var, Origin::Local);
        assert_eq!(a.expanded(&untyped).ty, Some(Expr::ident("int")));
    }

    #[test]
    fn test_stub_becomes_type() {
        let mut stub = Decl::new("T", DeclKind::MethodsStub, Origin::Local);
        stub.add_child(func("M"));
        let ty = Decl::new("T", DeclKind::Type, Origin::Local).with_type(Expr::ident("int"));
        let merged = stub.expanded(&ty);
        assert_eq!(merged.kind, DeclKind::Type);
        assert!(merged.child("M").is_some());
    }

    #[test]
    fn test_matches_and_exported() {
        assert!(!Decl::new("_", DeclKind::Var, Origin::Local).matches());
        assert!(!Decl::new("$x", DeclKind::Var, Origin::Local).matches());
        assert!(!Decl::new("T", DeclKind::MethodsStub, Origin::Local).matches());
        assert!(Decl::new("x", DeclKind::Var, Origin::Local).matches());
        assert!(is_exported("Reader"));
        assert!(is_exported("Éclair"));
        assert!(!is_exported("reader"));
        assert!(!is_exported(""));
    }
}
