//! Local scope of the function under the cursor.
//!
//! Only declarations that textually precede the cursor in a block that
//! encloses it are visible, which mirrors Go's scoping closely enough for
//! completion. Function literals containing the cursor contribute their
//! parameters and bodies the same way.

use std::sync::Arc;

use smol_str::SmolStr;

use super::decl::{Decl, DeclKind, Origin, ValueMode};
use super::lower::{lower_gen_decl, value_decls};
use super::scope::Scope;
use crate::base::TextRange;
use crate::syntax::{Block, CaseClause, Expr, FuncDecl, FuncType, Field, Stmt, StmtKind};

/// Build the scope visible at `cursor` inside `func`.
///
/// Returns `None` when the cursor is outside the function body.
pub fn local_scope(func: &FuncDecl, cursor: usize, parent: Arc<Scope>) -> Option<Arc<Scope>> {
    let body = func.body.as_ref()?;
    if !encloses(body.range, cursor) {
        return None;
    }
    let mut builder = LocalScopeBuilder {
        cursor,
        scope: Scope::new(Some(parent)),
    };
    builder.func(func.recv.as_ref(), &func.ty, body);
    Some(Arc::new(builder.scope))
}

fn encloses(range: TextRange, cursor: usize) -> bool {
    usize::from(range.start()) < cursor && cursor < usize::from(range.end())
}

fn precedes(range: TextRange, cursor: usize) -> bool {
    usize::from(range.end()) <= cursor
}

struct LocalScopeBuilder {
    cursor: usize,
    scope: Scope,
}

impl LocalScopeBuilder {
    fn bind(&mut self, decl: Decl) {
        if decl.name != "_" {
            let name = decl.name.clone();
            self.scope.replace_decl(name, Arc::new(decl));
        }
    }

    fn bind_var(&mut self, name: &SmolStr, ty: &Expr) {
        self.bind(Decl::new(name.clone(), DeclKind::Var, Origin::Local).with_type(ty.clone()));
    }

    fn func(&mut self, recv: Option<&Field>, ty: &FuncType, body: &Block) {
        for field in recv.into_iter().chain(&ty.params).chain(&ty.results) {
            let param_ty = match &field.ty {
                // Variadic parameters are slices inside the body.
                Expr::Ellipsis(Some(elem)) => Expr::ArrayType {
                    len: None,
                    elem: elem.clone(),
                },
                other => other.clone(),
            };
            for name in &field.names {
                self.bind_var(name, &param_ty);
            }
        }
        self.block(body);
    }

    fn block(&mut self, block: &Block) {
        self.stmts(&block.stmts);
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if usize::from(stmt.range.start()) >= self.cursor {
                break;
            }
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        let done = precedes(stmt.range, self.cursor);
        match &stmt.kind {
            StmtKind::Decl(gen_decl) => {
                if done {
                    let mut decls = Vec::new();
                    lower_gen_decl(gen_decl, &Origin::Local, &mut |d| decls.push(d));
                    for decl in decls {
                        self.bind(decl);
                    }
                } else {
                    for spec in &gen_decl.specs {
                        if let crate::syntax::Spec::Value(spec) = spec {
                            spec.values.iter().for_each(|v| self.expr(v));
                        }
                    }
                }
            }
            StmtKind::Define { names, values } => {
                if done {
                    for decl in value_decls(names, None, values, DeclKind::Var, &Origin::Local) {
                        self.bind(decl);
                    }
                } else {
                    values.iter().for_each(|v| self.expr(v));
                }
            }
            StmtKind::Assign { lhs, rhs } => {
                lhs.iter().chain(rhs).for_each(|e| self.expr(e));
            }
            StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => self.expr(expr),
            StmtKind::Return(exprs) => exprs.iter().for_each(|e| self.expr(e)),
            StmtKind::Block(block) => {
                if encloses(block.range, self.cursor) {
                    self.block(block);
                }
            }
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                if done {
                    return;
                }
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                if encloses(then.range, self.cursor) {
                    self.block(then);
                } else if let Some(els) = els {
                    self.stmt(els);
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                if done {
                    return;
                }
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                if let Some(post) = post {
                    self.stmt(post);
                }
                if encloses(body.range, self.cursor) {
                    self.block(body);
                }
            }
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => {
                if done {
                    return;
                }
                self.expr(expr);
                if !encloses(body.range, self.cursor) {
                    return;
                }
                if *define {
                    let bindings = [(key, ValueMode::RangeKey), (value, ValueMode::RangeValue)];
                    for (target, mode) in bindings {
                        if let Some(Expr::Ident(name)) = target {
                            self.bind(
                                Decl::new(name.clone(), DeclKind::Var, Origin::Local)
                                    .with_value(expr.clone(), 0, mode),
                            );
                        }
                    }
                }
                self.block(body);
            }
            StmtKind::Switch {
                init,
                tag,
                clauses,
            } => {
                if done {
                    return;
                }
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(tag) = tag {
                    self.expr(tag);
                }
                if let Some(clause) = self.enclosing_clause(clauses) {
                    clause.exprs.iter().for_each(|e| self.expr(e));
                    self.stmts(&clause.body);
                }
            }
            StmtKind::TypeSwitch {
                init,
                bind,
                subject,
                clauses,
            } => {
                if done {
                    return;
                }
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.expr(subject);
                let Some(clause) = self.enclosing_clause(clauses) else {
                    return;
                };
                if let Some(name) = bind {
                    let decl = Decl::new(name.clone(), DeclKind::Var, Origin::Local);
                    let decl = match clause.exprs.as_slice() {
                        [ty] if ty.as_ident().is_none_or(|n| n != "nil") => {
                            decl.with_type(ty.clone())
                        }
                        _ => decl.with_value(subject.clone(), 0, ValueMode::Direct),
                    };
                    self.bind(decl);
                }
                self.stmts(&clause.body);
            }
            StmtKind::Select { clauses } => {
                if done {
                    return;
                }
                if let Some(clause) = self.enclosing_clause(clauses) {
                    if let Some(comm) = &clause.comm {
                        self.stmt(comm);
                    }
                    self.stmts(&clause.body);
                }
            }
            StmtKind::Labeled { label, stmt } => {
                self.bind(Decl::new(label.clone(), DeclKind::Label, Origin::Local));
                if let Some(stmt) = stmt {
                    self.stmt(stmt);
                }
            }
            StmtKind::Empty | StmtKind::Branch | StmtKind::Bad => {}
        }
    }

    fn enclosing_clause<'c>(&self, clauses: &'c [CaseClause]) -> Option<&'c CaseClause> {
        clauses.iter().find(|c| {
            usize::from(c.range.start()) < self.cursor && self.cursor <= usize::from(c.range.end())
        })
    }

    /// Descend into function literals that contain the cursor.
    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::FuncLit { ty, body } => {
                if encloses(body.range, self.cursor) {
                    self.func(None, ty, body);
                }
            }
            Expr::CompositeLit { elts, .. } => elts.iter().for_each(|e| self.expr(e)),
            Expr::Call { func, args } => {
                self.expr(func);
                args.iter().for_each(|e| self.expr(e));
            }
            Expr::Paren(inner)
            | Expr::Star(inner)
            | Expr::Slice { base: inner }
            | Expr::Selector { base: inner, .. }
            | Expr::TypeAssert { base: inner, .. }
            | Expr::Unary { operand: inner, .. } => self.expr(inner),
            Expr::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::KeyValue { key, value } => {
                self.expr(key);
                self.expr(value);
            }
            _ => {}
        }
    }
}
