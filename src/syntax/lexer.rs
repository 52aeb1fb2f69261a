//! Tokenizer for Go source text.
//!
//! The raw token stream comes from a `logos` generated DFA. [`lex_into`]
//! then applies Go's automatic semicolon rule: a newline (or a block
//! comment spanning lines) following an identifier, literal, one of the
//! keywords `break continue fallthrough return`, the operators `++ --`, or
//! a closing `) ] }` becomes a [`SyntaxKind::Semicolon`]. Other newlines are
//! dropped. Comments are kept so callers can tell when a position falls
//! inside one; the parser filters them out.

use logos::{Lexer, Logos};

use crate::base::{TextRange, text_range};

fn block_comment(lex: &mut Lexer<SyntaxKind>) -> bool {
    let rest = lex.remainder();
    match rest.find("*/") {
        Some(end) => lex.bump(end + 2),
        // Unterminated comments run to the end of the buffer.
        None => lex.bump(rest.len()),
    }
    true
}

/// Kind of a lexed token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\f]+")]
pub enum SyntaxKind {
    #[token("\n")]
    Newline,
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,

    // ---- keywords ----
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("chan")]
    Chan,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("defer")]
    Defer,
    #[token("else")]
    Else,
    #[token("fallthrough")]
    Fallthrough,
    #[token("for")]
    For,
    #[token("func")]
    Func,
    #[token("go")]
    Go,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("interface")]
    Interface,
    #[token("map")]
    Map,
    #[token("package")]
    Package,
    #[token("range")]
    Range,
    #[token("return")]
    Return,
    #[token("select")]
    Select,
    #[token("struct")]
    Struct,
    #[token("switch")]
    Switch,
    #[token("type")]
    Type,
    #[token("var")]
    Var,

    // ---- literals ----
    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")]
    Ident,
    #[regex(r"[0-9][0-9_]*|0[xX][0-9a-fA-F_]+|0[bB][01_]+|0[oO][0-7_]+")]
    Int,
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9_]+)?|[0-9][0-9_]*[eE][+-]?[0-9_]+|\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?")]
    Float,
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?i")]
    Imaginary,
    #[regex(r"'([^'\\\n]|\\[^\n])+'")]
    Rune,
    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    #[regex(r"`[^`]*`")]
    String,
    #[regex(r#""([^"\\\n]|\\[^\n])*"#)]
    #[regex(r"`[^`]*")]
    UnterminatedString,

    // ---- operators ----
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&^")]
    AndNot,
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("&^=")]
    OpAssign,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<-")]
    Arrow,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("=")]
    Assign,
    #[token(":=")]
    Define,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("...")]
    Ellipsis,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,

    /// A character sequence no rule accepts.
    Error,
    Eof,
}

impl SyntaxKind {
    /// Check if this kind is trivia (a comment).
    pub fn is_comment(self) -> bool {
        matches!(self, SyntaxKind::LineComment | SyntaxKind::BlockComment)
    }

    /// Check if this kind is a reserved word.
    pub fn is_keyword(self) -> bool {
        use SyntaxKind::*;
        matches!(
            self,
            Break
                | Case
                | Chan
                | Const
                | Continue
                | Default
                | Defer
                | Else
                | Fallthrough
                | For
                | Func
                | Go
                | Goto
                | If
                | Import
                | Interface
                | Map
                | Package
                | Range
                | Return
                | Select
                | Struct
                | Switch
                | Type
                | Var
        )
    }

    /// Check if this kind is a string literal, terminated or not.
    pub fn is_string(self) -> bool {
        matches!(self, SyntaxKind::String | SyntaxKind::UnterminatedString)
    }

    fn ends_statement(self) -> bool {
        use SyntaxKind::*;
        matches!(
            self,
            Ident
                | Int
                | Float
                | Imaginary
                | Rune
                | String
                | UnterminatedString
                | Break
                | Continue
                | Fallthrough
                | Return
                | Inc
                | Dec
                | RParen
                | RBracket
                | RBrace
        )
    }
}

/// A token: its kind and where it sits in the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl Token {
    /// Byte offset of the first character.
    #[inline]
    pub fn start(&self) -> usize {
        usize::from(self.range.start())
    }

    /// Byte offset one past the last character.
    #[inline]
    pub fn end(&self) -> usize {
        usize::from(self.range.end())
    }

    /// Source text covered by this token.
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        src.get(self.start()..self.end()).unwrap_or("")
    }
}

/// Tokenize `src` into a fresh vector.
pub fn lex(src: &str) -> Vec<Token> {
    let mut out = Vec::new();
    lex_into(src, &mut out);
    out
}

/// Tokenize `src`, appending to `out`.
///
/// `out` is cleared first, so a buffer can be reused across calls.
pub fn lex_into(src: &str, out: &mut Vec<Token>) {
    out.clear();
    let mut last_significant: Option<SyntaxKind> = None;
    let mut lexer = SyntaxKind::lexer(src);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = result.unwrap_or(SyntaxKind::Error);
        let range = text_range(span.start, span.end);

        match kind {
            SyntaxKind::Newline => {
                if last_significant.is_some_and(SyntaxKind::ends_statement) {
                    out.push(Token {
                        kind: SyntaxKind::Semicolon,
                        range,
                    });
                    last_significant = Some(SyntaxKind::Semicolon);
                }
            }
            SyntaxKind::BlockComment if lexer.slice().contains('\n') => {
                if last_significant.is_some_and(SyntaxKind::ends_statement) {
                    out.push(Token {
                        kind: SyntaxKind::Semicolon,
                        range: text_range(span.start, span.start),
                    });
                    last_significant = Some(SyntaxKind::Semicolon);
                }
                out.push(Token { kind, range });
            }
            k if k.is_comment() => out.push(Token { kind, range }),
            _ => {
                out.push(Token { kind, range });
                last_significant = Some(kind);
            }
        }
    }

    if last_significant.is_some_and(SyntaxKind::ends_statement) {
        out.push(Token {
            kind: SyntaxKind::Semicolon,
            range: text_range(src.len(), src.len()),
        });
    }
}

/// Check whether `s` is a valid identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || unicode_ident::is_xid_start(c) => {}
        _ => return false,
    }
    chars.all(unicode_ident::is_xid_continue)
}

/// Blank out a leading `#!` line, keeping every byte offset intact.
pub fn strip_shebang(src: &str) -> std::borrow::Cow<'_, str> {
    if !src.starts_with("#!") {
        return std::borrow::Cow::Borrowed(src);
    }
    let line_end = src.find('\n').unwrap_or(src.len());
    let mut out = String::with_capacity(src.len());
    out.extend(std::iter::repeat_n(' ', line_end));
    out.push_str(&src[line_end..]);
    std::borrow::Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<SyntaxKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_simple_decl() {
        use SyntaxKind::*;
        assert_eq!(
            kinds("var x = 1"),
            vec![Var, Ident, Assign, Int, Semicolon]
        );
    }

    #[test]
    fn test_auto_semicolon_after_ident_and_brace() {
        use SyntaxKind::*;
        assert_eq!(
            kinds("x\n}\n(\n"),
            vec![Ident, Semicolon, RBrace, Semicolon, LParen]
        );
    }

    #[test]
    fn test_no_semicolon_after_operator() {
        use SyntaxKind::*;
        assert_eq!(kinds("a +\nb"), vec![Ident, Plus, Ident, Semicolon]);
    }

    #[test]
    fn test_multiline_block_comment_acts_as_newline() {
        use SyntaxKind::*;
        assert_eq!(
            kinds("x /* a\nb */ y"),
            vec![Ident, Semicolon, BlockComment, Ident, Semicolon]
        );
    }

    #[test]
    fn test_unterminated_tokens() {
        let tokens = lex("import \"strin");
        assert_eq!(tokens[1].kind, SyntaxKind::UnterminatedString);
        let tokens = lex("x /* open");
        assert_eq!(tokens.last().map(|t| t.kind), Some(SyntaxKind::BlockComment));
    }

    #[test]
    fn test_numbers_and_selectors() {
        use SyntaxKind::*;
        assert_eq!(kinds("t.X"), vec![Ident, Dot, Ident, Semicolon]);
        assert_eq!(kinds("1.5"), vec![Float, Semicolon]);
        assert_eq!(kinds("2i"), vec![Imaginary, Semicolon]);
        assert_eq!(kinds("f(a...)"), vec![Ident, LParen, Ident, Ellipsis, RParen, Semicolon]);
    }

    #[test]
    fn test_token_text() {
        let src = "package main";
        let tokens = lex(src);
        assert_eq!(tokens[1].text(src), "main");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("strings"));
        assert!(is_identifier("_x1"));
        assert!(is_identifier("héllo"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("go-yaml"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_strip_shebang_keeps_offsets() {
        let src = "#!/usr/bin/env gorun\npackage main\n";
        let stripped = strip_shebang(src);
        assert_eq!(stripped.len(), src.len());
        assert!(stripped.trim_start().starts_with("package main"));
        assert!(matches!(strip_shebang("package p"), std::borrow::Cow::Borrowed(_)));
    }
}
