// Go source syntax: tokens, tree, parser and the cursor-block isolator
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod ripper;

pub use ast::{
    BinaryOp, Block, CaseClause, ChanDir, DeclKeyword, Expr, Field, FuncDecl, FuncType, GenDecl,
    ImportSpec, Item, LitKind, ParseError, SourceFile, Spec, Stmt, StmtKind, TypeExpr, TypeSpec,
    UnaryOp, ValueSpec,
};
pub use lexer::{SyntaxKind, Token, is_identifier, lex, lex_into, strip_shebang};
pub use parser::{GoParser, SourceParser};
pub use ripper::{RippedDecl, Ripper};
