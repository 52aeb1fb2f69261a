//! Error-tolerant recursive descent parser for Go.
//!
//! The parser never fails: malformed input is recorded in
//! [`SourceFile::errors`] and replaced by [`Expr::Bad`], [`StmtKind::Bad`],
//! or a skipped token run. Recovery is biased toward completion: inside a
//! function body a line starting with `func name` or `func (recv) name(`
//! closes every open block, so a missing `}` does not swallow the
//! declarations that follow it.

use smol_str::SmolStr;

use super::ast::*;
use super::lexer::{SyntaxKind, Token, lex, strip_shebang};
use crate::base::{TextRange, text_range};

/// Source parser collaborator.
///
/// The engine only needs three entry points; anything that can produce a
/// [`SourceFile`] for a buffer may stand in for the bundled [`GoParser`].
pub trait SourceParser: Send + Sync {
    /// Parse a whole file, recovering whatever top-level structure it can.
    fn parse_file(&self, src: &str) -> SourceFile;

    /// Parse a standalone expression. `None` if it is not one.
    fn parse_expr(&self, src: &str) -> Option<Expr>;

    /// Read only the package clause.
    fn package_name(&self, src: &str) -> Option<SmolStr>;
}

/// The bundled Go parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct GoParser;

impl SourceParser for GoParser {
    fn parse_file(&self, src: &str) -> SourceFile {
        parse_file(src)
    }

    fn parse_expr(&self, src: &str) -> Option<Expr> {
        parse_expr(src)
    }

    fn package_name(&self, src: &str) -> Option<SmolStr> {
        package_name(src)
    }
}

/// Parse a Go source file.
pub fn parse_file(src: &str) -> SourceFile {
    let src = strip_shebang(src);
    let mut p = Parser::new(&src);
    p.source_file()
}

/// Parse `src` as a single expression.
pub fn parse_expr(src: &str) -> Option<Expr> {
    let mut p = Parser::new(src);
    let expr = p.expr();
    while p.at(SyntaxKind::Semicolon) {
        p.bump();
    }
    if !p.at(SyntaxKind::Eof) || !p.errors.is_empty() {
        return None;
    }
    Some(expr)
}

/// Extract the package name from a file's package clause.
pub fn package_name(src: &str) -> Option<SmolStr> {
    let src = strip_shebang(src);
    let mut p = Parser::new(&src);
    p.skip_semis();
    if !p.eat(SyntaxKind::Package) {
        return None;
    }
    p.ident()
}

const MAX_DEPTH: u32 = 200;

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    /// Negative while parsing a control clause, where `T {` opens a block
    /// rather than a composite literal.
    expr_lev: i32,
    depth: u32,
    /// Deepest `depth` reached since the innermost [`Parser::measured`]
    /// call started.
    peak: u32,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let mut tokens = lex(src);
        tokens.retain(|t| !t.kind.is_comment());
        Self {
            src,
            tokens,
            pos: 0,
            errors: Vec::new(),
            expr_lev: 0,
            depth: 0,
            peak: 0,
        }
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::Eof)
    }

    fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(Token::start)
            .unwrap_or(self.src.len())
    }

    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(tok) => tok.end(),
            None => 0,
        }
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected {kind:?}, found {:?}", self.current()));
        false
    }

    fn error(&mut self, message: impl Into<String>) {
        let start = self.offset();
        self.errors.push(ParseError {
            range: text_range(start, start),
            message: message.into(),
        });
    }

    fn ident(&mut self) -> Option<SmolStr> {
        if self.at(SyntaxKind::Ident) {
            let tok = self.bump()?;
            Some(SmolStr::new(tok.text(self.src)))
        } else {
            self.error("expected identifier");
            None
        }
    }

    fn skip_semis(&mut self) {
        while self.eat(SyntaxKind::Semicolon) {}
    }

    fn range_from(&self, start: usize) -> TextRange {
        text_range(start, self.prev_end().max(start))
    }

    /// Skip to the next statement boundary, stepping over balanced brackets.
    fn recover_to_semicolon(&mut self) {
        let mut depth = 0u32;
        loop {
            match self.current() {
                SyntaxKind::Eof => return,
                SyntaxKind::Semicolon if depth == 0 => return,
                SyntaxKind::RBrace if depth == 0 => return,
                SyntaxKind::LBrace | SyntaxKind::LParen | SyntaxKind::LBracket => depth += 1,
                SyntaxKind::RBrace | SyntaxKind::RParen | SyntaxKind::RBracket => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// A declaration that cannot be a statement: the block around it was
    /// left open. Besides `func name`, a `const`, `var`, `type` or `import`
    /// at the very start of a line counts, since bodies are indented.
    fn at_top_level_decl(&self) -> bool {
        match self.current() {
            SyntaxKind::Const | SyntaxKind::Var | SyntaxKind::Type | SyntaxKind::Import => {
                let offset = self.offset();
                self.src
                    .get(..offset)
                    .is_some_and(|head| head.is_empty() || head.ends_with('\n'))
            }
            _ => self.at_top_level_func(),
        }
    }

    /// `func name` or `func (recv) name(` at statement start.
    fn at_top_level_func(&self) -> bool {
        if !self.at(SyntaxKind::Func) {
            return false;
        }
        match self.nth(1) {
            SyntaxKind::Ident => true,
            SyntaxKind::LParen => {
                let mut depth = 0usize;
                let mut i = 1;
                loop {
                    match self.nth(i) {
                        SyntaxKind::LParen => depth += 1,
                        SyntaxKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        SyntaxKind::Eof | SyntaxKind::LBrace | SyntaxKind::Semicolon => {
                            return false;
                        }
                        _ => {}
                    }
                    i += 1;
                }
                self.nth(i + 1) == SyntaxKind::Ident && self.nth(i + 2) == SyntaxKind::LParen
            }
            _ => false,
        }
    }

    fn enter(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            self.error("nesting too deep");
            return false;
        }
        self.depth += 1;
        self.peak = self.peak.max(self.depth);
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Run `f` and report how many levels of nesting it used below the
    /// current depth.
    fn measured<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, u32) {
        let outer = std::mem::replace(&mut self.peak, self.depth);
        let value = f(self);
        let used = self.peak - self.depth;
        self.peak = self.peak.max(outer);
        (value, used)
    }

    /// Enter brackets: composite literals are allowed again inside them.
    fn nest(&mut self) -> i32 {
        let prev = self.expr_lev;
        self.expr_lev = prev.max(0) + 1;
        prev
    }

    // ------------------------------------------------------------------
    // Files and declarations
    // ------------------------------------------------------------------

    fn source_file(&mut self) -> SourceFile {
        let mut file = SourceFile::default();
        self.skip_semis();
        if self.eat(SyntaxKind::Package) {
            file.package = self.ident();
        } else {
            self.error("expected package clause");
        }

        while !self.at(SyntaxKind::Eof) {
            match self.current() {
                SyntaxKind::Semicolon => {
                    self.bump();
                }
                SyntaxKind::Import => {
                    self.bump();
                    for spec in self.gen_specs(DeclKeyword::Import) {
                        if let Spec::Import(import) = spec {
                            file.imports.push(import);
                        }
                    }
                }
                SyntaxKind::Func => {
                    let func = self.func_decl();
                    file.items.push(Item::Func(func));
                }
                SyntaxKind::Const | SyntaxKind::Var | SyntaxKind::Type => {
                    let decl = self.gen_decl();
                    file.items.push(Item::Gen(decl));
                }
                // A fragment cut out of a function body.
                SyntaxKind::LBrace => {
                    let block = self.block();
                    file.items.push(Item::Func(FuncDecl {
                        range: block.range,
                        name: SmolStr::new_static("_"),
                        recv: None,
                        ty: FuncType::default(),
                        body: Some(block),
                    }));
                }
                _ => {
                    self.error("expected declaration");
                    self.bump();
                    while !matches!(
                        self.current(),
                        SyntaxKind::Eof
                            | SyntaxKind::Func
                            | SyntaxKind::Const
                            | SyntaxKind::Var
                            | SyntaxKind::Type
                            | SyntaxKind::Import
                    ) {
                        self.bump();
                    }
                }
            }
        }

        file.errors = std::mem::take(&mut self.errors);
        file
    }

    fn gen_decl(&mut self) -> GenDecl {
        let keyword = match self.bump().map(|t| t.kind) {
            Some(SyntaxKind::Const) => DeclKeyword::Const,
            Some(SyntaxKind::Type) => DeclKeyword::Type,
            Some(SyntaxKind::Import) => DeclKeyword::Import,
            _ => DeclKeyword::Var,
        };
        let specs = self.gen_specs(keyword);
        GenDecl { keyword, specs }
    }

    fn gen_specs(&mut self, keyword: DeclKeyword) -> Vec<Spec> {
        let mut specs = Vec::new();
        if self.eat(SyntaxKind::LParen) {
            loop {
                self.skip_semis();
                if matches!(self.current(), SyntaxKind::RParen | SyntaxKind::Eof) {
                    break;
                }
                let before = self.pos;
                if let Some(spec) = self.spec(keyword) {
                    specs.push(spec);
                }
                if !self.at(SyntaxKind::RParen) && !self.eat(SyntaxKind::Semicolon) {
                    self.error("expected ';' in declaration group");
                    self.recover_to_semicolon();
                    if self.pos == before {
                        self.bump();
                    }
                }
            }
            self.expect(SyntaxKind::RParen);
        } else if let Some(spec) = self.spec(keyword) {
            specs.push(spec);
        }
        specs
    }

    fn spec(&mut self, keyword: DeclKeyword) -> Option<Spec> {
        match keyword {
            DeclKeyword::Import => {
                let alias = match self.current() {
                    SyntaxKind::Dot => {
                        self.bump();
                        Some(SmolStr::new_static("."))
                    }
                    SyntaxKind::Ident => self.ident(),
                    _ => None,
                };
                if !self.current().is_string() {
                    self.error("expected import path");
                    return None;
                }
                let tok = self.bump()?;
                Some(Spec::Import(ImportSpec {
                    alias,
                    path: unquote(tok.text(self.src)),
                }))
            }
            DeclKeyword::Type => {
                let name = self.ident()?;
                let alias = self.eat(SyntaxKind::Assign);
                let ty = self.ty();
                Some(Spec::Type(TypeSpec { name, alias, ty }))
            }
            DeclKeyword::Const | DeclKeyword::Var => {
                let mut names = vec![self.ident()?];
                while self.eat(SyntaxKind::Comma) {
                    names.extend(self.ident());
                }
                let ty = match self.current() {
                    SyntaxKind::Assign | SyntaxKind::Semicolon | SyntaxKind::RParen => None,
                    _ => Some(self.ty()),
                };
                let values = if self.eat(SyntaxKind::Assign) {
                    self.expr_list()
                } else {
                    Vec::new()
                };
                Some(Spec::Value(ValueSpec { names, ty, values }))
            }
        }
    }

    fn func_decl(&mut self) -> FuncDecl {
        let start = self.offset();
        self.bump();
        let recv = if self.at(SyntaxKind::LParen) {
            self.params().into_iter().next()
        } else {
            None
        };
        let name = self.ident().unwrap_or_else(|| SmolStr::new_static("_"));
        if self.at(SyntaxKind::LBracket) {
            // Type parameters are not modelled.
            self.skip_balanced(SyntaxKind::LBracket, SyntaxKind::RBracket);
        }
        let ty = self.signature();
        let body = if self.at(SyntaxKind::LBrace) {
            Some(self.block())
        } else {
            None
        };
        FuncDecl {
            range: self.range_from(start),
            name,
            recv,
            ty,
            body,
        }
    }

    fn skip_balanced(&mut self, open: SyntaxKind, close: SyntaxKind) {
        let mut depth = 0usize;
        while let Some(tok) = self.bump() {
            if tok.kind == open {
                depth += 1;
            } else if tok.kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn signature(&mut self) -> FuncType {
        let params = if self.at(SyntaxKind::LParen) {
            self.params()
        } else {
            self.error("expected parameter list");
            Vec::new()
        };
        let results = if self.at(SyntaxKind::LParen) {
            self.params()
        } else if self.at_type_start() {
            vec![Field {
                names: Vec::new(),
                ty: self.ty(),
            }]
        } else {
            Vec::new()
        };
        FuncType { params, results }
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.current(),
            SyntaxKind::Ident
                | SyntaxKind::Star
                | SyntaxKind::LBracket
                | SyntaxKind::Map
                | SyntaxKind::Chan
                | SyntaxKind::Func
                | SyntaxKind::Struct
                | SyntaxKind::Interface
                | SyntaxKind::Arrow
                | SyntaxKind::LParen
        )
    }

    fn param_type(&mut self) -> TypeExpr {
        if self.eat(SyntaxKind::Ellipsis) {
            return Expr::Ellipsis(Some(Box::new(self.ty())));
        }
        self.ty()
    }

    /// `(a, b int, c ...string)` or `(int, error)`.
    fn params(&mut self) -> Vec<Field> {
        self.expect(SyntaxKind::LParen);
        let mut entries: Vec<(TypeExpr, Option<TypeExpr>)> = Vec::new();
        while !matches!(self.current(), SyntaxKind::RParen | SyntaxKind::Eof) {
            let before = self.pos;
            let first = self.param_type();
            let second = match self.current() {
                SyntaxKind::Comma | SyntaxKind::RParen => None,
                _ => Some(self.param_type()),
            };
            entries.push((first, second));
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
            self.skip_semis();
            if self.pos == before {
                break;
            }
        }
        if !self.expect(SyntaxKind::RParen) {
            self.recover_params();
        }

        if !entries.iter().any(|(_, second)| second.is_some()) {
            return entries
                .into_iter()
                .map(|(ty, _)| Field {
                    names: Vec::new(),
                    ty,
                })
                .collect();
        }

        let mut fields = Vec::new();
        let mut pending = Vec::new();
        for (first, second) in entries {
            pending.push(match first {
                Expr::Ident(name) => name,
                _ => SmolStr::new_static("_"),
            });
            if let Some(ty) = second {
                fields.push(Field {
                    names: std::mem::take(&mut pending),
                    ty,
                });
            }
        }
        if !pending.is_empty() {
            fields.push(Field {
                names: pending,
                ty: Expr::Bad,
            });
        }
        fields
    }

    fn recover_params(&mut self) {
        while !matches!(
            self.current(),
            SyntaxKind::RParen | SyntaxKind::LBrace | SyntaxKind::Semicolon | SyntaxKind::Eof
        ) {
            self.bump();
        }
        self.eat(SyntaxKind::RParen);
    }

    fn ty(&mut self) -> TypeExpr {
        if !self.enter() {
            return Expr::Bad;
        }
        let ty = self.ty_inner();
        self.leave();
        ty
    }

    fn ty_inner(&mut self) -> TypeExpr {
        match self.current() {
            SyntaxKind::Ident => {
                let name = self.ident().unwrap_or_default();
                if self.at(SyntaxKind::Dot) && self.nth(1) == SyntaxKind::Ident {
                    self.bump();
                    let sel = self.ident().unwrap_or_default();
                    return Expr::qualified(name, sel);
                }
                Expr::Ident(name)
            }
            SyntaxKind::Star => {
                self.bump();
                Expr::star(self.ty())
            }
            SyntaxKind::LParen => {
                self.bump();
                let inner = self.ty();
                self.expect(SyntaxKind::RParen);
                Expr::Paren(Box::new(inner))
            }
            SyntaxKind::LBracket => {
                self.bump();
                let len = if self.eat(SyntaxKind::RBracket) {
                    None
                } else {
                    let len = if self.eat(SyntaxKind::Ellipsis) {
                        Expr::Ellipsis(None)
                    } else {
                        self.expr()
                    };
                    self.expect(SyntaxKind::RBracket);
                    Some(Box::new(len))
                };
                Expr::ArrayType {
                    len,
                    elem: Box::new(self.ty()),
                }
            }
            SyntaxKind::Map => {
                self.bump();
                self.expect(SyntaxKind::LBracket);
                let key = self.ty();
                self.expect(SyntaxKind::RBracket);
                Expr::MapType {
                    key: Box::new(key),
                    value: Box::new(self.ty()),
                }
            }
            SyntaxKind::Chan => {
                self.bump();
                let dir = if self.eat(SyntaxKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Expr::ChanType {
                    dir,
                    elem: Box::new(self.ty()),
                }
            }
            SyntaxKind::Arrow if self.nth(1) == SyntaxKind::Chan => {
                self.bump();
                self.bump();
                Expr::ChanType {
                    dir: ChanDir::Recv,
                    elem: Box::new(self.ty()),
                }
            }
            SyntaxKind::Func => {
                self.bump();
                Expr::FuncType(self.signature())
            }
            SyntaxKind::Struct => {
                self.bump();
                Expr::StructType(self.struct_fields())
            }
            SyntaxKind::Interface => {
                self.bump();
                Expr::InterfaceType(self.interface_elems())
            }
            _ => {
                self.error("expected type");
                if !matches!(
                    self.current(),
                    SyntaxKind::Semicolon
                        | SyntaxKind::RParen
                        | SyntaxKind::RBrace
                        | SyntaxKind::RBracket
                        | SyntaxKind::Comma
                        | SyntaxKind::LBrace
                        | SyntaxKind::Eof
                ) {
                    self.bump();
                }
                Expr::Bad
            }
        }
    }

    fn struct_fields(&mut self) -> Vec<Field> {
        let mut fields = Vec::new();
        if !self.expect(SyntaxKind::LBrace) {
            return fields;
        }
        loop {
            self.skip_semis();
            if matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
                break;
            }
            let before = self.pos;
            let embedded = match self.current() {
                SyntaxKind::Star => true,
                SyntaxKind::Ident => matches!(
                    self.nth(1),
                    SyntaxKind::Dot
                        | SyntaxKind::Semicolon
                        | SyntaxKind::RBrace
                        | SyntaxKind::String
                ),
                _ => false,
            };
            if embedded {
                let ty = self.ty();
                fields.push(Field {
                    names: Vec::new(),
                    ty,
                });
            } else {
                let mut names = Vec::new();
                names.extend(self.ident());
                while self.eat(SyntaxKind::Comma) {
                    names.extend(self.ident());
                }
                let ty = self.ty();
                fields.push(Field { names, ty });
            }
            // Field tag.
            if self.at(SyntaxKind::String) {
                self.bump();
            }
            if !self.at(SyntaxKind::RBrace) && !self.eat(SyntaxKind::Semicolon) {
                self.error("expected ';' after field");
                self.recover_to_semicolon();
            }
            if self.pos == before {
                self.bump();
            }
        }
        self.expect(SyntaxKind::RBrace);
        fields
    }

    fn interface_elems(&mut self) -> Vec<Field> {
        let mut elems = Vec::new();
        if !self.expect(SyntaxKind::LBrace) {
            return elems;
        }
        loop {
            self.skip_semis();
            if matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
                break;
            }
            let before = self.pos;
            if self.at(SyntaxKind::Ident) && self.nth(1) == SyntaxKind::LParen {
                let name = self.ident().unwrap_or_default();
                let sig = self.signature();
                elems.push(Field {
                    names: vec![name],
                    ty: Expr::FuncType(sig),
                });
            } else {
                let ty = self.ty();
                elems.push(Field {
                    names: Vec::new(),
                    ty,
                });
            }
            if !self.at(SyntaxKind::RBrace) && !self.eat(SyntaxKind::Semicolon) {
                // Type set unions and other constraint syntax.
                self.recover_to_semicolon();
            }
            if self.pos == before {
                self.bump();
            }
        }
        self.expect(SyntaxKind::RBrace);
        elems
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self) -> Block {
        let start = self.offset();
        self.expect(SyntaxKind::LBrace);
        let stmts = self.stmt_list();
        if !self.eat(SyntaxKind::RBrace) {
            self.error("expected '}'");
        }
        Block {
            range: self.range_from(start),
            stmts,
        }
    }

    fn stmt_list(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            if matches!(
                self.current(),
                SyntaxKind::RBrace | SyntaxKind::Eof | SyntaxKind::Case | SyntaxKind::Default
            ) || self.at_top_level_decl()
            {
                break;
            }
            let before = self.pos;
            let stmt = self.stmt();
            stmts.push(stmt);
            if !matches!(
                self.current(),
                SyntaxKind::Semicolon
                    | SyntaxKind::RBrace
                    | SyntaxKind::Eof
                    | SyntaxKind::Case
                    | SyntaxKind::Default
            ) && !self.at_top_level_decl()
            {
                self.error("expected ';' after statement");
                self.recover_to_semicolon();
            }
            if self.pos == before {
                self.bump();
            }
        }
        stmts
    }

    fn stmt(&mut self) -> Stmt {
        let start = self.offset();
        if !self.enter() {
            self.recover_to_semicolon();
            return Stmt {
                range: self.range_from(start),
                kind: StmtKind::Bad,
            };
        }
        let kind = self.stmt_kind();
        self.leave();
        Stmt {
            range: self.range_from(start),
            kind,
        }
    }

    fn stmt_kind(&mut self) -> StmtKind {
        match self.current() {
            SyntaxKind::Semicolon => StmtKind::Empty,
            SyntaxKind::Var | SyntaxKind::Const | SyntaxKind::Type => {
                StmtKind::Decl(self.gen_decl())
            }
            SyntaxKind::LBrace => StmtKind::Block(self.block()),
            SyntaxKind::If => self.if_stmt(),
            SyntaxKind::For => self.for_stmt(),
            SyntaxKind::Switch => self.switch_stmt(),
            SyntaxKind::Select => self.select_stmt(),
            SyntaxKind::Return => {
                self.bump();
                let results = match self.current() {
                    SyntaxKind::Semicolon | SyntaxKind::RBrace => Vec::new(),
                    _ => self.expr_list(),
                };
                StmtKind::Return(results)
            }
            SyntaxKind::Go => {
                self.bump();
                StmtKind::Go(self.expr())
            }
            SyntaxKind::Defer => {
                self.bump();
                StmtKind::Defer(self.expr())
            }
            SyntaxKind::Break
            | SyntaxKind::Continue
            | SyntaxKind::Goto
            | SyntaxKind::Fallthrough => {
                self.bump();
                if self.at(SyntaxKind::Ident) {
                    self.bump();
                }
                StmtKind::Branch
            }
            SyntaxKind::Ident if self.nth(1) == SyntaxKind::Colon => {
                let label = self.ident().unwrap_or_default();
                self.bump();
                self.skip_semis();
                let stmt = if matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
                    None
                } else {
                    Some(Box::new(self.stmt()))
                };
                StmtKind::Labeled { label, stmt }
            }
            _ => self.simple_stmt(false),
        }
    }

    /// Expression, send, inc/dec, assignment or short variable declaration.
    ///
    /// With `range_ok`, `k, v := range x` is accepted and returned as a
    /// [`StmtKind::Range`] with an empty body for the caller to fill in.
    fn simple_stmt(&mut self, range_ok: bool) -> StmtKind {
        if range_ok && self.at(SyntaxKind::Range) {
            self.bump();
            return StmtKind::Range {
                key: None,
                value: None,
                define: false,
                expr: self.expr(),
                body: Block::default(),
            };
        }

        let lhs = self.expr_list();
        match self.current() {
            SyntaxKind::Define | SyntaxKind::Assign => {
                let define = self.at(SyntaxKind::Define);
                self.bump();
                if range_ok && self.eat(SyntaxKind::Range) {
                    let mut lhs = lhs.into_iter();
                    return StmtKind::Range {
                        key: lhs.next(),
                        value: lhs.next(),
                        define,
                        expr: self.expr(),
                        body: Block::default(),
                    };
                }
                let rhs = self.expr_list();
                if define {
                    StmtKind::Define {
                        names: lhs
                            .iter()
                            .map(|e| e.as_ident().cloned().unwrap_or_else(|| SmolStr::new_static("_")))
                            .collect(),
                        values: rhs,
                    }
                } else {
                    StmtKind::Assign { lhs, rhs }
                }
            }
            SyntaxKind::OpAssign => {
                self.bump();
                let rhs = self.expr_list();
                StmtKind::Assign { lhs, rhs }
            }
            SyntaxKind::Inc | SyntaxKind::Dec => {
                self.bump();
                StmtKind::Expr(lhs.into_iter().next().unwrap_or(Expr::Bad))
            }
            SyntaxKind::Arrow => {
                self.bump();
                let value = self.expr();
                StmtKind::Assign {
                    lhs,
                    rhs: vec![value],
                }
            }
            _ => StmtKind::Expr(lhs.into_iter().next().unwrap_or(Expr::Bad)),
        }
    }

    /// Parse `[init ;] tail` of an `if`/`switch` header.
    fn header(&mut self) -> (Option<Box<Stmt>>, Option<Stmt>) {
        if self.at(SyntaxKind::LBrace) {
            return (None, None);
        }
        let prev = std::mem::replace(&mut self.expr_lev, -1);
        let mut init = None;
        let mut tail = None;
        if !self.at(SyntaxKind::Semicolon) {
            tail = Some(self.stmt_no_block());
        }
        if self.eat(SyntaxKind::Semicolon) {
            init = tail.take().map(Box::new);
            if !self.at(SyntaxKind::LBrace) {
                tail = Some(self.stmt_no_block());
            }
        }
        self.expr_lev = prev;
        (init, tail)
    }

    fn stmt_no_block(&mut self) -> Stmt {
        let start = self.offset();
        let kind = self.simple_stmt(false);
        Stmt {
            range: self.range_from(start),
            kind,
        }
    }

    fn if_stmt(&mut self) -> StmtKind {
        self.bump();
        let (init, tail) = self.header();
        let cond = match tail.map(|s| s.kind) {
            Some(StmtKind::Expr(expr)) => Some(expr),
            Some(_) => {
                self.error("expected condition");
                None
            }
            None => None,
        };
        let then = self.block();
        let els = if self.eat(SyntaxKind::Else) {
            let start = self.offset();
            match self.current() {
                SyntaxKind::If if self.enter() => {
                    let kind = self.if_stmt();
                    self.leave();
                    Some(Box::new(Stmt {
                        range: self.range_from(start),
                        kind,
                    }))
                }
                SyntaxKind::LBrace => {
                    let block = self.block();
                    Some(Box::new(Stmt {
                        range: block.range,
                        kind: StmtKind::Block(block),
                    }))
                }
                _ => {
                    self.error("expected if or block after else");
                    None
                }
            }
        } else {
            None
        };
        StmtKind::If {
            init,
            cond,
            then,
            els,
        }
    }

    fn for_stmt(&mut self) -> StmtKind {
        self.bump();
        let prev = std::mem::replace(&mut self.expr_lev, -1);
        let mut init = None;
        let mut cond = None;
        let mut post = None;
        let mut range = None;

        if !self.at(SyntaxKind::LBrace) {
            let first = if self.at(SyntaxKind::Semicolon) {
                None
            } else {
                let start = self.offset();
                let kind = self.simple_stmt(true);
                Some(Stmt {
                    range: self.range_from(start),
                    kind,
                })
            };
            match first {
                Some(Stmt {
                    kind: kind @ StmtKind::Range { .. },
                    ..
                }) => range = Some(kind),
                first if self.at(SyntaxKind::Semicolon) => {
                    self.bump();
                    init = first.map(Box::new);
                    if !self.at(SyntaxKind::Semicolon) {
                        cond = Some(self.expr());
                    }
                    if self.expect(SyntaxKind::Semicolon) && !self.at(SyntaxKind::LBrace) {
                        post = Some(Box::new(self.stmt_no_block()));
                    }
                }
                Some(Stmt {
                    kind: StmtKind::Expr(expr),
                    ..
                }) => cond = Some(expr),
                Some(_) => self.error("expected for loop condition"),
                None => {}
            }
        }
        self.expr_lev = prev;

        let body = self.block();
        match range {
            Some(StmtKind::Range {
                key,
                value,
                define,
                expr,
                ..
            }) => StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            },
            _ => StmtKind::For {
                init,
                cond,
                post,
                body,
            },
        }
    }

    fn switch_stmt(&mut self) -> StmtKind {
        self.bump();
        let (init, tail) = self.header();

        let mut type_switch = None;
        let mut tag = None;
        match tail.map(|s| s.kind) {
            Some(StmtKind::Define { mut names, mut values })
                if values.len() == 1
                    && matches!(values[0], Expr::TypeAssert { ty: None, .. }) =>
            {
                if let Some(Expr::TypeAssert { base, .. }) = values.pop() {
                    type_switch = Some((names.pop(), *base));
                }
            }
            Some(StmtKind::Expr(Expr::TypeAssert { base, ty: None })) => {
                type_switch = Some((None, *base));
            }
            Some(StmtKind::Expr(expr)) => tag = Some(expr),
            Some(_) => self.error("expected switch expression"),
            None => {}
        }

        let clauses = self.case_clauses(false);
        match type_switch {
            Some((bind, subject)) => StmtKind::TypeSwitch {
                init,
                bind,
                subject,
                clauses,
            },
            None => StmtKind::Switch { init, tag, clauses },
        }
    }

    fn select_stmt(&mut self) -> StmtKind {
        self.bump();
        StmtKind::Select {
            clauses: self.case_clauses(true),
        }
    }

    fn case_clauses(&mut self, select: bool) -> Vec<CaseClause> {
        let mut clauses = Vec::new();
        if !self.expect(SyntaxKind::LBrace) {
            return clauses;
        }
        loop {
            self.skip_semis();
            let start = self.offset();
            let mut exprs = Vec::new();
            let mut comm = None;
            match self.current() {
                SyntaxKind::Case => {
                    self.bump();
                    if select {
                        comm = Some(Box::new(self.stmt_no_block()));
                    } else {
                        exprs = self.case_list();
                    }
                }
                SyntaxKind::Default => {
                    self.bump();
                }
                _ => break,
            }
            self.expect(SyntaxKind::Colon);
            let body = self.stmt_list();
            clauses.push(CaseClause {
                range: self.range_from(start),
                exprs,
                comm,
                body,
            });
        }
        if !self.eat(SyntaxKind::RBrace) {
            self.error("expected '}' after switch clauses");
        }
        clauses
    }

    /// Case expressions; in a type switch these are types, which the
    /// expression grammar covers.
    fn case_list(&mut self) -> Vec<Expr> {
        let mut list = vec![self.expr_or_type()];
        while self.eat(SyntaxKind::Comma) {
            list.push(self.expr_or_type());
        }
        list
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_list(&mut self) -> Vec<Expr> {
        let mut list = vec![self.expr()];
        while self.eat(SyntaxKind::Comma) {
            list.push(self.expr());
        }
        list
    }

    fn expr(&mut self) -> Expr {
        if !self.enter() {
            return Expr::Bad;
        }
        let expr = self.binary_expr(1);
        self.leave();
        expr
    }

    /// An expression where a type is also acceptable.
    ///
    /// `*T` and `[]T` already parse as expressions; only `<-chan T` needs
    /// steering away from a receive.
    fn expr_or_type(&mut self) -> Expr {
        if self.at(SyntaxKind::Arrow) && self.nth(1) == SyntaxKind::Chan {
            return self.ty();
        }
        self.expr()
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        use SyntaxKind as K;
        let op = match self.current() {
            K::OrOr => (BinaryOp::OrOr, 1),
            K::AndAnd => (BinaryOp::AndAnd, 2),
            K::EqEq => (BinaryOp::Eq, 3),
            K::NotEq => (BinaryOp::NotEq, 3),
            K::Lt => (BinaryOp::Lt, 3),
            K::LtEq => (BinaryOp::LtEq, 3),
            K::Gt => (BinaryOp::Gt, 3),
            K::GtEq => (BinaryOp::GtEq, 3),
            K::Plus => (BinaryOp::Add, 4),
            K::Minus => (BinaryOp::Sub, 4),
            K::Pipe => (BinaryOp::Or, 4),
            K::Caret => (BinaryOp::Xor, 4),
            K::Star => (BinaryOp::Mul, 5),
            K::Slash => (BinaryOp::Div, 5),
            K::Percent => (BinaryOp::Rem, 5),
            K::Shl => (BinaryOp::Shl, 5),
            K::Shr => (BinaryOp::Shr, 5),
            K::Amp => (BinaryOp::And, 5),
            K::AndNot => (BinaryOp::AndNot, 5),
            _ => return None,
        };
        Some(op)
    }

    fn binary_expr(&mut self, min_prec: u8) -> Expr {
        let floor = self.depth;
        let (mut lhs, height) = self.measured(Self::unary_expr);
        // Left-associative: each operator nests everything to its left.
        self.depth = floor + height;
        let mut saturated = false;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.bump();
            if !saturated && !self.enter() {
                saturated = true;
                self.depth = floor;
            }
            let rhs = self.binary_expr(prec + 1);
            lhs = if saturated {
                Expr::Bad
            } else {
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            };
        }
        self.depth = floor;
        lhs
    }

    fn unary_expr(&mut self) -> Expr {
        if !self.enter() {
            return Expr::Bad;
        }
        let op = match self.current() {
            SyntaxKind::Plus => Some(UnaryOp::Pos),
            SyntaxKind::Minus => Some(UnaryOp::Neg),
            SyntaxKind::Bang => Some(UnaryOp::Not),
            SyntaxKind::Caret => Some(UnaryOp::Xor),
            SyntaxKind::Amp => Some(UnaryOp::Addr),
            SyntaxKind::Tilde => Some(UnaryOp::Tilde),
            SyntaxKind::Arrow if self.nth(1) != SyntaxKind::Chan => Some(UnaryOp::Recv),
            _ => None,
        };
        let expr = if let Some(op) = op {
            self.bump();
            Expr::Unary {
                op,
                operand: Box::new(self.unary_expr()),
            }
        } else if self.eat(SyntaxKind::Star) {
            Expr::star(self.unary_expr())
        } else {
            self.primary_expr()
        };
        self.leave();
        expr
    }

    fn operand(&mut self) -> Expr {
        use SyntaxKind as K;
        match self.current() {
            K::Ident => Expr::Ident(self.ident().unwrap_or_default()),
            K::Int => self.literal(LitKind::Int),
            K::Float => self.literal(LitKind::Float),
            K::Imaginary => self.literal(LitKind::Imaginary),
            K::Rune => self.literal(LitKind::Rune),
            K::String | K::UnterminatedString => self.literal(LitKind::String),
            K::LParen => {
                self.bump();
                let prev = self.nest();
                let inner = self.expr_or_type();
                self.expr_lev = prev;
                self.expect(K::RParen);
                Expr::Paren(Box::new(inner))
            }
            K::Func => {
                self.bump();
                let ty = self.signature();
                if self.at(K::LBrace) {
                    let prev = std::mem::replace(&mut self.expr_lev, 0);
                    let body = self.block();
                    self.expr_lev = prev;
                    Expr::FuncLit { ty, body }
                } else {
                    Expr::FuncType(ty)
                }
            }
            K::LBracket | K::Map | K::Chan | K::Struct | K::Interface => self.ty(),
            K::Arrow => self.ty(),
            _ => {
                self.error(format!("expected expression, found {:?}", self.current()));
                if !matches!(
                    self.current(),
                    K::Semicolon | K::RParen | K::RBrace | K::RBracket | K::Comma | K::Eof
                ) {
                    self.bump();
                }
                Expr::Bad
            }
        }
    }

    fn literal(&mut self, kind: LitKind) -> Expr {
        let value = self
            .bump()
            .map(|tok| SmolStr::new(tok.text(self.src)))
            .unwrap_or_default();
        Expr::BasicLit { kind, value }
    }

    fn primary_expr(&mut self) -> Expr {
        let floor = self.depth;
        let (mut expr, height) = self.measured(Self::operand);
        // Every suffix wraps the operand in one more node.
        self.depth = floor + height;
        let mut saturated = false;
        loop {
            let at_suffix = match self.current() {
                SyntaxKind::Dot | SyntaxKind::LBracket | SyntaxKind::LParen => true,
                SyntaxKind::LBrace => self.is_literal_type(&expr),
                _ => false,
            };
            if !at_suffix {
                break;
            }
            if !saturated && !self.enter() {
                // Read the rest of the chain without building it.
                saturated = true;
                self.depth = floor;
                expr = Expr::Bad;
            }
            let base = std::mem::replace(&mut expr, Expr::Bad);
            let (next, more) = self.suffix(base);
            if !saturated {
                expr = next;
            }
            if !more {
                break;
            }
        }
        self.depth = floor;
        expr
    }

    /// One selector, type assertion, index, slice, call or literal body
    /// applied to `base`. The flag is false when the chain cannot go on.
    fn suffix(&mut self, base: Expr) -> (Expr, bool) {
        let base = Box::new(base);
        match self.current() {
            SyntaxKind::Dot => {
                self.bump();
                match self.current() {
                    SyntaxKind::Ident => {
                        let name = self.ident().unwrap_or_default();
                        (Expr::Selector { base, name }, true)
                    }
                    SyntaxKind::LParen => {
                        self.bump();
                        let ty = if self.eat(SyntaxKind::Type) {
                            None
                        } else {
                            Some(Box::new(self.ty()))
                        };
                        self.expect(SyntaxKind::RParen);
                        (Expr::TypeAssert { base, ty }, true)
                    }
                    _ => {
                        self.error("expected selector or type assertion");
                        let name = SmolStr::default();
                        (Expr::Selector { base, name }, false)
                    }
                }
            }
            SyntaxKind::LBracket => {
                self.bump();
                let prev = self.nest();
                let mut is_slice = false;
                let mut index = None;
                if !self.at(SyntaxKind::Colon) {
                    index = Some(self.expr_or_type());
                }
                while self.eat(SyntaxKind::Colon) {
                    is_slice = true;
                    if !matches!(self.current(), SyntaxKind::Colon | SyntaxKind::RBracket) {
                        self.expr();
                    }
                }
                // Instantiation lists `F[A, B]` are read and dropped.
                while self.eat(SyntaxKind::Comma) {
                    if !self.at(SyntaxKind::RBracket) {
                        self.expr_or_type();
                    }
                }
                self.expr_lev = prev;
                self.expect(SyntaxKind::RBracket);
                let expr = if is_slice {
                    Expr::Slice { base }
                } else {
                    Expr::Index {
                        base,
                        index: Box::new(index.unwrap_or(Expr::Bad)),
                    }
                };
                (expr, true)
            }
            SyntaxKind::LParen => {
                self.bump();
                let prev = self.nest();
                let mut args = Vec::new();
                while !matches!(self.current(), SyntaxKind::RParen | SyntaxKind::Eof) {
                    let before = self.pos;
                    args.push(self.expr_or_type());
                    self.eat(SyntaxKind::Ellipsis);
                    if !self.eat(SyntaxKind::Comma) {
                        break;
                    }
                    self.skip_semis();
                    if self.pos == before {
                        break;
                    }
                }
                self.expr_lev = prev;
                self.expect(SyntaxKind::RParen);
                (Expr::Call { func: base, args }, true)
            }
            SyntaxKind::LBrace => {
                let elts = self.literal_value();
                (Expr::CompositeLit { ty: Some(base), elts }, true)
            }
            _ => (*base, false),
        }
    }

    fn is_literal_type(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(_) | Expr::Selector { .. } => self.expr_lev >= 0,
            Expr::Index { base, .. } => self.expr_lev >= 0 && self.is_literal_type(base),
            Expr::ArrayType { .. } | Expr::MapType { .. } | Expr::StructType(_) => true,
            _ => false,
        }
    }

    fn literal_value(&mut self) -> Vec<Expr> {
        self.expect(SyntaxKind::LBrace);
        let prev = self.nest();
        let mut elts = Vec::new();
        loop {
            self.skip_semis();
            if matches!(self.current(), SyntaxKind::RBrace | SyntaxKind::Eof) {
                break;
            }
            let before = self.pos;
            let mut elt = self.element();
            if self.eat(SyntaxKind::Colon) {
                let value = self.element();
                elt = Expr::KeyValue {
                    key: Box::new(elt),
                    value: Box::new(value),
                };
            }
            elts.push(elt);
            if !self.eat(SyntaxKind::Comma) {
                self.skip_semis();
                if !self.at(SyntaxKind::RBrace) && self.pos == before {
                    self.bump();
                }
                if !self.at(SyntaxKind::RBrace) {
                    break;
                }
            }
        }
        self.expr_lev = prev;
        self.expect(SyntaxKind::RBrace);
        elts
    }

    fn element(&mut self) -> Expr {
        if !self.at(SyntaxKind::LBrace) {
            return self.expr();
        }
        if !self.enter() {
            self.skip_balanced(SyntaxKind::LBrace, SyntaxKind::RBrace);
            return Expr::Bad;
        }
        let elts = self.literal_value();
        self.leave();
        Expr::CompositeLit { ty: None, elts }
    }
}

/// Strip the quotes from a string literal token.
fn unquote(text: &str) -> SmolStr {
    let text = text
        .strip_prefix(['"', '`'])
        .unwrap_or(text);
    let text = text.strip_suffix(['"', '`']).unwrap_or(text);
    SmolStr::new(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SourceFile {
        parse_file(src)
    }

    fn only_func(file: &SourceFile) -> &FuncDecl {
        file.funcs().next().expect("expected a function")
    }

    #[test]
    fn test_package_and_imports() {
        let file = parse(
            "package main\nimport \"fmt\"\nimport (\n\tstr \"strings\"\n\t. \"math\"\n)\n",
        );
        assert_eq!(file.package.as_deref(), Some("main"));
        assert_eq!(file.imports.len(), 3);
        assert_eq!(file.imports[0].path, "fmt");
        assert_eq!(file.imports[1].alias.as_deref(), Some("str"));
        assert_eq!(file.imports[2].alias.as_deref(), Some("."));
        assert!(file.errors.is_empty(), "{:?}", file.errors);
    }

    #[test]
    fn test_struct_and_method() {
        let file = parse(
            "package p\ntype T struct {\n\tX, Y int\n\t*Base\n\tio.Reader `json:\"r\"`\n}\nfunc (t *T) Len() int { return t.X }\n",
        );
        assert!(file.errors.is_empty(), "{:?}", file.errors);
        let Item::Gen(decl) = &file.items[0] else {
            panic!("expected type decl");
        };
        let Spec::Type(spec) = &decl.specs[0] else {
            panic!("expected type spec");
        };
        let Expr::StructType(fields) = &spec.ty else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].names.len(), 2);
        assert!(fields[1].names.is_empty());
        assert_eq!(fields[2].ty, Expr::qualified("io", "Reader"));

        let func = only_func(&file);
        assert_eq!(func.name, "Len");
        let recv = func.recv.as_ref().expect("receiver");
        assert_eq!(recv.names, vec![SmolStr::from("t")]);
        assert_eq!(recv.ty, Expr::star(Expr::ident("T")));
    }

    #[test]
    fn test_param_grouping() {
        let file = parse("package p\nfunc f(a, b int, c ...string) (n int, err error) {}\n");
        let func = only_func(&file);
        assert_eq!(func.ty.params.len(), 2);
        assert_eq!(func.ty.params[0].names.len(), 2);
        assert!(matches!(func.ty.params[1].ty, Expr::Ellipsis(Some(_))));
        assert_eq!(func.ty.results.len(), 2);

        let file = parse("package p\nfunc g(int, string) error\n");
        let func = only_func(&file);
        assert!(func.ty.params.iter().all(|f| f.names.is_empty()));
        assert_eq!(func.ty.results[0].ty, Expr::ident("error"));
    }

    #[test]
    fn test_statements() {
        let file = parse(
            "package p\nfunc f() {\n\tx := 1\n\tfor i, v := range xs {\n\t\t_ = v\n\t}\n\tif err := g(); err != nil {\n\t\treturn\n\t}\n\tswitch v := y.(type) {\n\tcase int:\n\t}\n}\n",
        );
        assert!(file.errors.is_empty(), "{:?}", file.errors);
        let body = only_func(&file).body.as_ref().expect("body");
        assert_eq!(body.stmts.len(), 4);
        assert!(matches!(body.stmts[0].kind, StmtKind::Define { .. }));
        assert!(matches!(body.stmts[1].kind, StmtKind::Range { define: true, .. }));
        assert!(matches!(body.stmts[2].kind, StmtKind::If { init: Some(_), .. }));
        assert!(matches!(body.stmts[3].kind, StmtKind::TypeSwitch { .. }));
    }

    #[test]
    fn test_composite_literal_in_control_clause() {
        let file = parse("package p\nfunc f() {\n\tif x == (T{}) {\n\t}\n\tfor _, v := range []int{1, 2} {\n\t}\n}\n");
        assert!(file.errors.is_empty(), "{:?}", file.errors);
    }

    #[test]
    fn test_missing_brace_does_not_swallow_next_func() {
        let file = parse("package p\nfunc a() {\n\tif x {\n\nfunc b() {}\n");
        let names: Vec<_> = file.funcs().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(!file.errors.is_empty());
    }

    #[test]
    fn test_method_after_unbalanced_body() {
        let file = parse("package p\nfunc a() {\n\tfoo(\n}\nfunc (t T) M() {}\n");
        assert!(file.funcs().any(|f| f.name == "M"));
    }

    #[test]
    fn test_const_group_and_alias() {
        let file = parse("package p\nconst (\n\tA = iota\n\tB\n)\ntype R = io.Reader\n");
        assert!(file.errors.is_empty(), "{:?}", file.errors);
        let Item::Gen(types) = &file.items[1] else {
            panic!("expected type decl");
        };
        assert!(matches!(&types.specs[0], Spec::Type(TypeSpec { alias: true, .. })));
    }

    #[test]
    fn test_parse_expr() {
        assert_eq!(
            parse_expr("a.b"),
            Some(Expr::Selector {
                base: Box::new(Expr::ident("a")),
                name: "b".into()
            })
        );
        assert!(matches!(parse_expr("f(x)[0]"), Some(Expr::Index { .. })));
        assert!(matches!(parse_expr("(*T)(nil)"), Some(Expr::Call { .. })));
        assert_eq!(parse_expr("a."), None);
        assert_eq!(parse_expr(""), None);
    }

    #[test]
    fn test_package_name_sniff() {
        assert_eq!(
            package_name("// doc\npackage foo // x\nimport \"bar\"").as_deref(),
            Some("foo")
        );
        assert_eq!(package_name("func main() {}"), None);
        assert_eq!(package_name("#!/bin/gorun\npackage main").as_deref(), Some("main"));
    }

    #[test]
    fn test_garbage_never_panics() {
        for src in [
            "",
            "}}}}",
            "package",
            "package p\nfunc (",
            "package p\ntype T struct {",
            "package p\nvar x = []int{1, 2",
            "package p\nfunc f() { switch { case",
            "package p\nimport (",
            "package p\nfunc f() { x.(",
        ] {
            let _ = parse(src);
        }
        let deep = format!("package p\nvar x = {}1", "(".repeat(1000));
        let file = parse(&deep);
        assert!(!file.errors.is_empty());
    }

    #[test]
    fn test_fragment_block() {
        let file = parse(";{ x := 1; x. }");
        let func = only_func(&file);
        assert_eq!(func.name, "_");
    }

    #[test]
    fn test_type_after_unbalanced_body() {
        let file = parse(
            "package p\nfunc broken() {\n\tif x {\n}\ntype T struct{ X int }\nvar v T\nfunc f() {}\n",
        );
        let names: Vec<_> = file.funcs().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["broken", "f"]);
        let types: Vec<_> = file
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Gen(decl) => Some(&decl.specs[0]),
                Item::Func(_) => None,
            })
            .collect();
        assert!(matches!(types[0], Spec::Type(TypeSpec { name, .. }) if name == "T"));
        assert!(matches!(types[1], Spec::Value(ValueSpec { names, .. }) if names[0] == "v"));
    }

    #[test]
    fn test_indented_decl_stays_in_body() {
        let file = parse("package p\nfunc f() {\n\ttype U int\n\tvar u U\n}\n");
        assert!(file.errors.is_empty(), "{:?}", file.errors);
        assert_eq!(file.items.len(), 1);
        assert!(only_func(&file).body.as_ref().is_some_and(|b| b.stmts.len() >= 2));
    }

    /// Length of the chain of bases, callees and left operands under `expr`.
    fn spine(mut expr: &Expr) -> usize {
        let mut len = 0;
        loop {
            expr = match expr {
                Expr::Selector { base, .. }
                | Expr::Index { base, .. }
                | Expr::Slice { base }
                | Expr::TypeAssert { base, .. } => base,
                Expr::Call { func, .. } => func,
                Expr::Binary { lhs, .. } => lhs,
                Expr::Paren(inner) | Expr::Star(inner) => inner,
                Expr::Unary { operand, .. } => operand,
                _ => return len,
            };
            len += 1;
        }
    }

    fn first_value(file: &SourceFile) -> &Expr {
        file.items
            .iter()
            .find_map(|item| match item {
                Item::Gen(decl) => decl.specs.iter().find_map(|spec| match spec {
                    Spec::Value(value) => value.values.first(),
                    _ => None,
                }),
                Item::Func(_) => None,
            })
            .expect("expected a var with a value")
    }

    #[test]
    fn test_long_chains_stay_shallow() {
        for tail in [
            format!("x{}", ".a".repeat(20_000)),
            format!("x{}", "[0]".repeat(5_000)),
            format!("f{}", "()".repeat(5_000)),
            format!("x{}", ".(T)".repeat(5_000)),
            format!("{}1", "1 + ".repeat(20_000)),
            format!("{}1{}", "(".repeat(3_000), ")".repeat(3_000)),
            format!("{}1", "(".repeat(3_000)),
            format!("{}x", "^".repeat(3_000)),
        ] {
            let file = parse(&format!("package p\nvar x = {tail}\nfunc g() {{}}\n"));
            assert!(spine(first_value(&file)) <= MAX_DEPTH as usize);
            assert!(file.funcs().any(|f| f.name == "g"));
            drop(file.clone());
        }
    }

    #[test]
    fn test_long_else_if_and_literal_nesting() {
        let chain = format!(
            "package p\nfunc f() {{\n\tif a {{\n\t}}{}\n}}\nfunc g() {{}}\n",
            " else if a {\n\t}".repeat(5_000)
        );
        let file = parse(&chain);
        assert!(file.funcs().any(|f| f.name == "g"));
        drop(file.clone());

        let literal = format!(
            "package p\nvar x = [][]T{{{}{}}}\nfunc g() {{}}\n",
            "{".repeat(3_000),
            "}".repeat(3_000)
        );
        let file = parse(&literal);
        assert!(!file.errors.is_empty());
        assert!(file.funcs().any(|f| f.name == "g"));
        drop(file.clone());
    }
}
