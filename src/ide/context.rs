//! What the user is completing at the cursor.
//!
//! The decision is made from the tokens before the cursor only, so it works
//! on buffers that do not parse: the partial identifier under the cursor,
//! then whatever precedes it (a `.`, an open composite literal, an import
//! string) picks the mode. Expressions in front of a `.` are cut out by a
//! small backward scanner and handed to the expression parser.

use smol_str::SmolStr;

use crate::hir::DeclKind;
use crate::syntax::{Expr, SourceParser, SyntaxKind, Token, lex};

/// Where candidates come from.
#[derive(Clone, Debug, PartialEq)]
pub enum CompletionMode {
    /// Everything visible from the cursor's scope.
    Scope,
    /// Members of the expression before the `.`.
    Selector(Expr),
    /// Field names of the struct type of an open composite literal. Falls
    /// back to [`CompletionMode::Scope`] when the type is not a struct.
    StructField(Expr),
    /// Import paths, inside the string of an import spec.
    Import,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CursorContext {
    pub mode: CompletionMode,
    /// Text between the start of the word and the cursor.
    pub partial: SmolStr,
    /// Set when the partial is a declaration keyword typed in full.
    pub kind_filter: Option<DeclKind>,
}

impl CursorContext {
    fn new(mode: CompletionMode, partial: &str) -> Self {
        Self {
            mode,
            partial: SmolStr::new(partial),
            kind_filter: DeclKind::from_keyword(partial),
        }
    }
}

/// Work out the completion context at byte offset `cursor` of `src`.
///
/// `None` means nothing should be proposed: the cursor is inside a
/// comment or a non-import string literal, right after a literal, or after
/// a `.` whose operand cannot be recognised.
pub fn deduce_cursor_context(
    src: &str,
    cursor: usize,
    parser: &dyn SourceParser,
) -> Option<CursorContext> {
    let head = src.get(..cursor)?;
    // Automatic semicolons carry the newline (or nothing) as text; only
    // written ones matter here.
    let tokens: Vec<Token> = lex(head)
        .into_iter()
        .filter(|t| t.kind != SyntaxKind::Semicolon || t.text(head) == ";")
        .collect();

    let mut rest = tokens.as_slice();
    let mut partial = "";
    if let Some(last) = tokens.last() {
        if last.end() == cursor {
            match last.kind {
                SyntaxKind::LineComment => return None,
                SyntaxKind::BlockComment => {
                    let text = last.text(head);
                    if text.len() < 4 || !text.ends_with("*/") {
                        return None;
                    }
                }
                SyntaxKind::UnterminatedString => return import_context(head, &tokens),
                SyntaxKind::String
                | SyntaxKind::Rune
                | SyntaxKind::Int
                | SyntaxKind::Float
                | SyntaxKind::Imaginary => return None,
                kind if kind == SyntaxKind::Ident || kind.is_keyword() => {
                    partial = last.text(head);
                    rest = &tokens[..tokens.len() - 1];
                }
                _ => {}
            }
        }
    }

    let code: Vec<Token> = rest.iter().copied().filter(|t| !t.kind.is_comment()).collect();
    let Some(prev) = code.last() else {
        return Some(CursorContext::new(CompletionMode::Scope, partial));
    };

    match prev.kind {
        SyntaxKind::Dot => {
            let operand = &code[..code.len() - 1];
            let start = expr_start(operand)?;
            let text = head.get(operand[start].start()..prev.start())?;
            let expr = parser.parse_expr(text)?;
            Some(CursorContext::new(CompletionMode::Selector(expr), partial))
        }
        SyntaxKind::LBrace | SyntaxKind::Comma => {
            let mode = literal_type(head, &code, parser)
                .map(CompletionMode::StructField)
                .unwrap_or(CompletionMode::Scope);
            Some(CursorContext::new(mode, partial))
        }
        _ => Some(CursorContext::new(CompletionMode::Scope, partial)),
    }
}

/// Context for a cursor inside an unterminated string: import paths if the
/// string belongs to an import spec, nothing otherwise.
fn import_context(head: &str, tokens: &[Token]) -> Option<CursorContext> {
    let (string, before) = tokens.split_last()?;
    let mut code = before.iter().rev().filter(|t| !t.kind.is_comment());
    let in_import = loop {
        let Some(token) = code.next() else { break false };
        match token.kind {
            // Aliases and earlier specs of a grouped import.
            SyntaxKind::Ident | SyntaxKind::Dot | SyntaxKind::String | SyntaxKind::Semicolon => {}
            SyntaxKind::Import => break true,
            SyntaxKind::LParen => {
                break code.next().is_some_and(|t| t.kind == SyntaxKind::Import);
            }
            _ => break false,
        }
    };
    if !in_import {
        return None;
    }
    // Drop the opening quote.
    let partial = string.text(head).get(1..).unwrap_or("");
    Some(CursorContext::new(CompletionMode::Import, partial))
}

/// Type of the composite literal whose `{` is the innermost open bracket.
fn literal_type(head: &str, code: &[Token], parser: &dyn SourceParser) -> Option<Expr> {
    let open = unmatched_opener(code)?;
    if code[open].kind != SyntaxKind::LBrace {
        return None;
    }
    let before = &code[..open];
    let start = expr_start(before)?;
    // `[]T{` and `map[K]T{` list elements, not fields.
    if start > 0 && before[start - 1].kind == SyntaxKind::RBracket {
        return None;
    }
    let text = head.get(before[start].start()..code[open].start())?;
    match parser.parse_expr(text)? {
        expr @ (Expr::Ident(_) | Expr::Selector { .. }) => Some(expr),
        // `func f() {`, `if ok() {` and the like.
        _ => None,
    }
}

fn is_closer(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::RParen | SyntaxKind::RBracket | SyntaxKind::RBrace
    )
}

fn is_opener(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::LParen | SyntaxKind::LBracket | SyntaxKind::LBrace
    )
}

fn unmatched_opener(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().rev() {
        if is_closer(token.kind) {
            depth += 1;
        } else if is_opener(token.kind) {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// Index of the opener matching the closer at `close`.
fn matching_opener(tokens: &[Token], close: usize) -> Option<usize> {
    unmatched_opener(&tokens[..close])
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// An operand must come next: at the start and after a `.`.
    Need,
    /// An operand was read; only a `.` extends the expression.
    After,
    /// A parenthesized or bracketed group was read; it may be a call,
    /// index or type assertion suffix of something further left.
    Group,
}

/// Start index of the longest primary expression that ends `tokens`.
fn expr_start(tokens: &[Token]) -> Option<usize> {
    let mut i = tokens.len();
    let mut state = Scan::Need;
    while i > 0 {
        let kind = tokens[i - 1].kind;
        state = match (state, kind) {
            (Scan::Need | Scan::Group, SyntaxKind::Ident) => Scan::After,
            (
                Scan::Need,
                SyntaxKind::String
                | SyntaxKind::Rune
                | SyntaxKind::Int
                | SyntaxKind::Float
                | SyntaxKind::Imaginary,
            ) => Scan::After,
            (Scan::Need | Scan::Group, SyntaxKind::RParen | SyntaxKind::RBracket) => {
                i = matching_opener(tokens, i - 1)?;
                state = Scan::Group;
                continue;
            }
            (Scan::After | Scan::Group, SyntaxKind::Dot) => Scan::Need,
            (Scan::Need, _) => return None,
            _ => break,
        };
        i -= 1;
    }
    match state {
        Scan::Need => None,
        Scan::After | Scan::Group => Some(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GoParser;

    fn deduce(marked: &str) -> Option<CursorContext> {
        let cursor = marked.find('‸').expect("cursor marker");
        let src = marked.replace('‸', "");
        deduce_cursor_context(&src, cursor, &GoParser)
    }

    fn selector(marked: &str) -> Expr {
        match deduce(marked).map(|c| c.mode) {
            Some(CompletionMode::Selector(expr)) => expr,
            other => panic!("expected selector, got {other:?}"),
        }
    }

    #[test]
    fn test_scope_with_partial() {
        let ctx = deduce("func f() { fo‸ }").expect("context");
        assert_eq!(ctx.mode, CompletionMode::Scope);
        assert_eq!(ctx.partial, "fo");
        assert_eq!(ctx.kind_filter, None);

        let ctx = deduce("func f() {\n\tx := 1\n\t‸").expect("context");
        assert_eq!(ctx.mode, CompletionMode::Scope);
        assert_eq!(ctx.partial, "");
    }

    #[test]
    fn test_keyword_partial_sets_filter() {
        let ctx = deduce("package p\nfunc‸").expect("context");
        assert_eq!(ctx.partial, "func");
        assert_eq!(ctx.kind_filter, Some(DeclKind::Func));
    }

    #[test]
    fn test_selectors() {
        assert_eq!(selector("t.‸"), Expr::ident("t"));
        assert_eq!(selector("fmt.Pr‸"), Expr::ident("fmt"));
        assert_eq!(selector("x := a.b.‸"), Expr::qualified("a", "b"));
        assert!(matches!(selector("x = f(1, g(2))[0].‸"), Expr::Index { .. }));
        assert!(matches!(selector("v.(io.Reader).‸"), Expr::TypeAssert { .. }));
        assert!(matches!(selector("(*p).‸"), Expr::Paren(_)));
        assert!(matches!(selector("if x := New().‸"), Expr::Call { .. }));
    }

    #[test]
    fn test_selector_after_nothing_is_none() {
        assert_eq!(deduce("x := .‸"), None);
        assert_eq!(deduce("1.‸"), None);
    }

    #[test]
    fn test_comments_and_strings() {
        assert_eq!(deduce("x := 1 // note‸"), None);
        assert_eq!(deduce("x := 1 /* open ‸"), None);
        assert_eq!(deduce("x := \"str‸"), None);
        let ctx = deduce("x := /* c */ y‸").expect("context");
        assert_eq!(ctx.partial, "y");
        let ctx = deduce("// note\n‸").expect("context");
        assert_eq!(ctx.mode, CompletionMode::Scope);
    }

    #[test]
    fn test_import_strings() {
        let ctx = deduce("package p\nimport \"strin‸").expect("import");
        assert_eq!(ctx.mode, CompletionMode::Import);
        assert_eq!(ctx.partial, "strin");

        let ctx = deduce("package p\nimport (\n\t\"fmt\"\n\tx \"net/ht‸").expect("import");
        assert_eq!(ctx.mode, CompletionMode::Import);
        assert_eq!(ctx.partial, "net/ht");

        assert_eq!(deduce("package p\nfunc f() { g(\"os‸"), None);
    }

    #[test]
    fn test_struct_literal() {
        let ctx = deduce("v := T{‸").expect("context");
        assert_eq!(ctx.mode, CompletionMode::StructField(Expr::ident("T")));

        let ctx = deduce("v := &pkg.T{A: 1, B‸").expect("context");
        assert_eq!(
            ctx.mode,
            CompletionMode::StructField(Expr::qualified("pkg", "T"))
        );
        assert_eq!(ctx.partial, "B");

        // Inside a call, not a literal.
        let ctx = deduce("f(a, ‸").expect("context");
        assert_eq!(ctx.mode, CompletionMode::Scope);
        // A value position inside the literal.
        let ctx = deduce("v := T{A: ‸").expect("context");
        assert_eq!(ctx.mode, CompletionMode::Scope);
    }
}
