//! Syntax tree for Go source files.
//!
//! Types and expressions share one [`Expr`] enum, as they do in Go's own
//! grammar: `T(x)` may be a call or a conversion and `[]int{}` starts with a
//! type, so the parser cannot always tell them apart without name
//! resolution. [`TypeExpr`] is an alias used where only a type is expected.
//!
//! Only statements and blocks carry ranges; the local-scope builder needs
//! them to decide what is visible at the cursor. Everything else is kept
//! position-free so declarations can be cloned and compared cheaply.

use smol_str::SmolStr;

use crate::base::TextRange;

// ============================================================================
// EXPRESSIONS AND TYPES
// ============================================================================

/// An expression or a type.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Ident(SmolStr),
    BasicLit {
        kind: LitKind,
        value: SmolStr,
    },
    /// `T{...}`; the type is elided for nested literals like `[]T{{...}}`.
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
    },
    FuncLit {
        ty: FuncType,
        body: Block,
    },
    Paren(Box<Expr>),
    Selector {
        base: Box<Expr>,
        name: SmolStr,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        base: Box<Expr>,
    },
    /// `x.(T)`; `ty` is `None` for the `x.(type)` switch guard.
    TypeAssert {
        base: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Dereference in value position, pointer type in type position.
    Star(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    /// `...T` in a parameter list, `[...]` in an array length.
    Ellipsis(Option<Box<Expr>>),
    /// `[N]T`, or `[]T` when `len` is `None`.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        elem: Box<Expr>,
    },
    FuncType(FuncType),
    StructType(Vec<Field>),
    InterfaceType(Vec<Field>),
    /// Placeholder for input the parser could not make sense of.
    Bad,
}

/// An expression in type position.
pub type TypeExpr = Expr;

impl Expr {
    /// Create an identifier expression.
    pub fn ident(name: impl Into<SmolStr>) -> Self {
        Expr::Ident(name.into())
    }

    /// Create a `pkg.Name` selector.
    pub fn qualified(package: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Expr::Selector {
            base: Box::new(Expr::ident(package)),
            name: name.into(),
        }
    }

    /// Wrap in a pointer type / dereference.
    pub fn star(inner: Expr) -> Self {
        Expr::Star(Box::new(inner))
    }

    /// Get the identifier name if this is a bare identifier.
    pub fn as_ident(&self) -> Option<&SmolStr> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// Whether this expression can only denote a type.
    pub fn is_type_literal(&self) -> bool {
        matches!(
            self,
            Expr::ArrayType { .. }
                | Expr::MapType { .. }
                | Expr::ChanType { .. }
                | Expr::FuncType(_)
                | Expr::StructType(_)
                | Expr::InterfaceType(_)
        )
    }

    /// Check that a type expression contains no [`Expr::Bad`] node.
    ///
    /// Only the type-shaped parts of the tree are inspected; array length
    /// expressions and composite literal bodies do not matter here.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Expr::Bad => false,
            Expr::Star(inner) | Expr::Paren(inner) => inner.is_well_formed(),
            Expr::Ellipsis(inner) => inner.as_ref().is_none_or(|t| t.is_well_formed()),
            Expr::ArrayType { elem, .. } | Expr::ChanType { elem, .. } => elem.is_well_formed(),
            Expr::Selector { base, .. } => base.is_well_formed(),
            Expr::MapType { key, value } => key.is_well_formed() && value.is_well_formed(),
            Expr::FuncType(func) => func.is_well_formed(),
            _ => true,
        }
    }
}

/// Literal kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imaginary,
    Rune,
    String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    Xor,
    Addr,
    Recv,
    Tilde,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    OrOr,
    AndAnd,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    AndNot,
}

impl BinaryOp {
    /// Whether the result is an untyped boolean.
    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, OrOr | AndAnd | Eq | NotEq | Lt | LtEq | Gt | GtEq)
    }

    /// Whether the result takes the type of the left operand only.
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A function signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FuncType {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

impl FuncType {
    /// Check every parameter and result type with [`Expr::is_well_formed`].
    pub fn is_well_formed(&self) -> bool {
        self.params
            .iter()
            .chain(&self.results)
            .all(|f| f.ty.is_well_formed())
    }

    /// Type of the `index`-th result value, counting each name separately.
    pub fn result(&self, index: usize) -> Option<&TypeExpr> {
        self.results
            .iter()
            .flat_map(|f| std::iter::repeat_n(&f.ty, f.names.len().max(1)))
            .nth(index)
    }
}

/// A struct field, interface element, or parameter group.
///
/// `names` is empty for embedded fields and unnamed parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub names: Vec<SmolStr>,
    pub ty: TypeExpr,
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// A braced statement list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub range: TextRange,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub range: TextRange,
    pub kind: StmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Empty,
    Decl(GenDecl),
    /// `a, b := x, y`
    Define {
        names: Vec<SmolStr>,
        values: Vec<Expr>,
    },
    Assign {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
    },
    Expr(Expr),
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        then: Block,
        els: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
        body: Block,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    },
    /// `switch v := x.(type) { ... }`
    TypeSwitch {
        init: Option<Box<Stmt>>,
        bind: Option<SmolStr>,
        subject: Expr,
        clauses: Vec<CaseClause>,
    },
    Select {
        clauses: Vec<CaseClause>,
    },
    Labeled {
        label: SmolStr,
        stmt: Option<Box<Stmt>>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Branch,
    Bad,
}

/// One `case`/`default` arm of a switch or select.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub range: TextRange,
    /// Case expressions, or case types in a type switch. Empty for `default`.
    pub exprs: Vec<Expr>,
    /// The communication of a `select` arm.
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
}

// ============================================================================
// DECLARATIONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKeyword {
    Const,
    Var,
    Type,
    Import,
}

/// A `const`, `var`, `type` or `import` declaration, grouped or not.
#[derive(Clone, Debug, PartialEq)]
pub struct GenDecl {
    pub keyword: DeclKeyword,
    pub specs: Vec<Spec>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Spec {
    Value(ValueSpec),
    Type(TypeSpec),
    Import(ImportSpec),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<SmolStr>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpec {
    pub name: SmolStr,
    /// `type A = B`
    pub alias: bool,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit name: an identifier, `.` or `_`.
    pub alias: Option<SmolStr>,
    pub path: SmolStr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub range: TextRange,
    pub name: SmolStr,
    pub recv: Option<Field>,
    pub ty: FuncType,
    pub body: Option<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Func(FuncDecl),
    Gen(GenDecl),
}

/// A recoverable syntax error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub range: TextRange,
    pub message: String,
}

/// A parsed source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceFile {
    pub package: Option<SmolStr>,
    pub imports: Vec<ImportSpec>,
    pub items: Vec<Item>,
    pub errors: Vec<ParseError>,
}

impl SourceFile {
    /// Iterate over function declarations.
    pub fn funcs(&self) -> impl Iterator<Item = &FuncDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Func(func) => Some(func),
            Item::Gen(_) => None,
        })
    }
}
