//! The universe scope: Go's predeclared identifiers.

use std::sync::Arc;

use super::decl::{Decl, DeclKind, Origin};
use super::lower::lower_file;
use super::scope::Scope;
use crate::syntax::{Expr, parser::parse_file};

const BASIC_TYPES: &[&str] = &[
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Signatures of the builtin functions and the `error` interface, written
/// as Go so the regular parser and lowering produce them.
const PRELUDE: &str = r#"package builtin

type error interface {
	Error() string
}

type any = interface{}

func append(slice []Type, elems ...Type) []Type
func cap(v Type) int
func clear(t Type)
func close(c chan<- Type)
func complex(r, i FloatType) ComplexType
func copy(dst, src []Type) int
func delete(m map[Type]Type1, key Type)
func imag(c ComplexType) FloatType
func len(v Type) int
func make(t Type, size ...IntegerType) Type
func max(x Type, y ...Type) Type
func min(x Type, y ...Type) Type
func new(Type) *Type
func panic(v any)
func print(args ...Type)
func println(args ...Type)
func real(c ComplexType) FloatType
func recover() any
"#;

/// Build the universe scope.
pub fn universe() -> Arc<Scope> {
    let mut scope = Scope::with_capacity(None, 48);

    for name in BASIC_TYPES {
        scope.add_decl(Arc::new(Decl::new(*name, DeclKind::Type, Origin::Universe)));
    }
    for name in ["true", "false"] {
        let decl = Decl::new(name, DeclKind::Const, Origin::Universe).with_type(Expr::ident("bool"));
        scope.add_decl(Arc::new(decl));
    }
    let iota = Decl::new("iota", DeclKind::Const, Origin::Universe).with_type(Expr::ident("int"));
    scope.add_decl(Arc::new(iota));
    scope.add_decl(Arc::new(Decl::new("nil", DeclKind::Var, Origin::Universe)));

    for decl in lower_file(&parse_file(PRELUDE), &Origin::Universe).into_values() {
        scope.add_decl(decl);
    }

    Arc::new(scope)
}
