//! Go-syntax rendering of type expressions for completion candidates.

use smol_str::SmolStr;

use super::decl::{Decl, DeclKind, Origin};
use super::resolve::{Resolver, TypeRef};
use super::scope::Scope;
use crate::syntax::{BinaryOp, ChanDir, Expr, Field, FuncType, UnaryOp};

/// Render `ty` as Go source.
///
/// Unqualified names that are not predeclared are prefixed with
/// `qualifier`, so a type declared in an imported package reads as
/// `pkg.Name` from the importing file.
pub fn render_type(ty: &Expr, qualifier: Option<&str>, universe: &Scope) -> String {
    let mut printer = TypePrinter {
        out: String::new(),
        qualifier,
        universe,
    };
    printer.ty(ty);
    printer.out
}

/// The type column of a candidate.
///
/// Functions render their full signature, types their definition, values
/// their declared or inferred type. Packages and predeclared types render
/// as nothing.
pub fn candidate_type(decl: &Decl, resolver: &Resolver<'_>) -> String {
    let ty = match decl.kind {
        DeclKind::Package | DeclKind::Import | DeclKind::Label | DeclKind::MethodsStub => {
            return String::new();
        }
        DeclKind::Type | DeclKind::Func => match &decl.ty {
            Some(ty) => TypeRef::new(ty.clone(), decl.origin.clone()),
            None => return String::new(),
        },
        DeclKind::Var | DeclKind::Const => match resolver.decl_type(decl) {
            Some(ty) => ty,
            None => return String::new(),
        },
    };
    let qualifier = qualifier_of(&ty.origin, resolver);
    render_type(&ty.expr, qualifier.as_deref(), resolver.universe())
}

fn qualifier_of(origin: &Origin, resolver: &Resolver<'_>) -> Option<SmolStr> {
    match origin {
        Origin::Package(key) => resolver.packages().package_name(key),
        _ => None,
    }
}

struct TypePrinter<'a> {
    out: String,
    qualifier: Option<&'a str>,
    universe: &'a Scope,
}

impl TypePrinter<'_> {
    fn ty(&mut self, ty: &Expr) {
        match ty {
            Expr::Ident(name) => {
                if let Some(q) = self.qualifier {
                    if self.universe.get(name).is_none() {
                        self.out.push_str(q);
                        self.out.push('.');
                    }
                }
                self.out.push_str(name);
            }
            Expr::Selector { base, name } => {
                self.expr(base);
                self.out.push('.');
                self.out.push_str(name);
            }
            Expr::Paren(inner) => self.ty(inner),
            Expr::Star(inner) => {
                self.out.push('*');
                self.ty(inner);
            }
            Expr::Ellipsis(elem) => {
                self.out.push_str("...");
                if let Some(elem) = elem {
                    self.ty(elem);
                }
            }
            Expr::ArrayType { len, elem } => {
                self.out.push('[');
                if let Some(len) = len {
                    self.expr(len);
                }
                self.out.push(']');
                self.ty(elem);
            }
            Expr::MapType { key, value } => {
                self.out.push_str("map[");
                self.ty(key);
                self.out.push(']');
                self.ty(value);
            }
            Expr::ChanType { dir, elem } => {
                self.out.push_str(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.ty(elem);
            }
            Expr::FuncType(sig) => {
                self.out.push_str("func");
                self.signature(sig);
            }
            Expr::StructType(_) => self.out.push_str("struct"),
            Expr::InterfaceType(elems) if elems.is_empty() => self.out.push_str("interface{}"),
            Expr::InterfaceType(_) => self.out.push_str("interface"),
            other => self.expr(other),
        }
    }

    fn signature(&mut self, sig: &FuncType) {
        self.out.push('(');
        self.fields(&sig.params);
        self.out.push(')');
        match sig.results.as_slice() {
            [] => {}
            [single] if single.names.is_empty() => {
                self.out.push(' ');
                self.ty(&single.ty);
            }
            results => {
                self.out.push_str(" (");
                self.fields(results);
                self.out.push(')');
            }
        }
    }

    fn fields(&mut self, fields: &[Field]) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if !field.names.is_empty() {
                self.out.push_str(&field.names.join(", "));
                self.out.push(' ');
            }
            self.ty(&field.ty);
        }
    }

    /// Value expressions appearing inside types, such as array lengths.
    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.out.push_str(name),
            Expr::BasicLit { value, .. } => self.out.push_str(value),
            Expr::Selector { base, name } => {
                self.expr(base);
                self.out.push('.');
                self.out.push_str(name);
            }
            Expr::Paren(inner) => {
                self.out.push('(');
                self.expr(inner);
                self.out.push(')');
            }
            Expr::Unary { op, operand } => {
                self.out.push_str(unary_op(*op));
                self.expr(operand);
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.out.push(' ');
                self.out.push_str(binary_op(*op));
                self.out.push(' ');
                self.expr(rhs);
            }
            Expr::Call { func, args } => {
                self.expr(func);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg);
                }
                self.out.push(')');
            }
            Expr::Ellipsis(None) => self.out.push_str("..."),
            other if other.is_type_literal() || matches!(other, Expr::Star(_)) => self.ty(other),
            _ => self.out.push('?'),
        }
    }
}

fn unary_op(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Pos => "+",
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
        UnaryOp::Xor => "^",
        UnaryOp::Addr => "&",
        UnaryOp::Recv => "<-",
        UnaryOp::Tilde => "~",
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        OrOr => "||",
        AndAnd => "&&",
        Eq => "==",
        NotEq => "!=",
        Lt => "<",
        LtEq => "<=",
        Gt => ">",
        GtEq => ">=",
        Add => "+",
        Sub => "-",
        Or => "|",
        Xor => "^",
        Mul => "*",
        Div => "/",
        Rem => "%",
        Shl => "<<",
        Shr => ">>",
        And => "&",
        AndNot => "&^",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::universe;
    use crate::syntax::parser::parse_file;

    fn type_of(src: &str, name: &str) -> Expr {
        let file = parse_file(&format!("package p\n{src}\n"));
        crate::hir::lower_file(&file, &Origin::Local)
            .get(name)
            .and_then(|d| d.ty.clone())
            .expect("declared type")
    }

    #[test]
    fn test_render_signature() {
        let u = universe();
        let ty = type_of("func F(a, b int, opts ...string) (n int, err error) {}", "F");
        assert_eq!(
            render_type(&ty, None, &u),
            "func(a, b int, opts ...string) (n int, err error)"
        );
        let ty = type_of("func G(int, *T) error", "G");
        assert_eq!(render_type(&ty, None, &u), "func(int, *T) error");
    }

    #[test]
    fn test_render_composites() {
        let u = universe();
        let ty = type_of("var v map[string][]*io.Reader", "v");
        assert_eq!(render_type(&ty, None, &u), "map[string][]*io.Reader");
        let ty = type_of("var c <-chan [4]byte", "c");
        assert_eq!(render_type(&ty, None, &u), "<-chan [4]byte");
        let ty = type_of("var s chan<- struct{ X int }", "s");
        assert_eq!(render_type(&ty, None, &u), "chan<- struct");
        let ty = type_of("var e interface{}", "e");
        assert_eq!(render_type(&ty, None, &u), "interface{}");
    }

    #[test]
    fn test_render_qualified() {
        let u = universe();
        let ty = type_of("func New(size int) *Buffer", "New");
        assert_eq!(render_type(&ty, Some("bytes"), &u), "func(size int) *bytes.Buffer");
    }
}
