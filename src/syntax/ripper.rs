//! Isolation of the declaration enclosing the cursor.
//!
//! Editors ask for completions mid-keystroke, so the buffer often fails to
//! parse as a whole. [`Ripper::rip`] finds the outermost brace-balanced
//! block around the cursor using tokens alone, widened backward to the
//! statement separator that precedes it. The caller parses that fragment
//! separately from the rest of the file, which keeps an error elsewhere
//! from hiding the code under the cursor.

use parking_lot::Mutex;

use super::lexer::{SyntaxKind, Token, lex_into};

const POOL_SIZE: usize = 20;
const INITIAL_TOKENS: usize = 64;

/// Result of isolating the declaration under the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RippedDecl {
    /// Byte offset where the fragment starts.
    pub begin: usize,
    /// Byte offset one past the closing brace.
    pub end: usize,
    /// Cursor offset relative to `begin`.
    pub cursor: usize,
}

impl RippedDecl {
    /// The isolated fragment.
    pub fn fragment<'a>(&self, src: &'a str) -> &'a str {
        src.get(self.begin..self.end).unwrap_or("")
    }

    /// The buffer with the fragment cut out.
    pub fn remainder(&self, src: &str) -> String {
        let mut out = String::with_capacity(src.len() - (self.end - self.begin));
        out.push_str(src.get(..self.begin).unwrap_or(""));
        out.push_str(src.get(self.end..).unwrap_or(""));
        out
    }
}

/// Isolates enclosing declarations, reusing token buffers between calls.
#[derive(Debug)]
pub struct Ripper {
    pool: Mutex<Vec<Vec<Token>>>,
}

impl Default for Ripper {
    fn default() -> Self {
        Self::new()
    }
}

impl Ripper {
    /// Create a new ripper with a warm buffer pool.
    pub fn new() -> Self {
        let pool = (0..POOL_SIZE)
            .map(|_| Vec::with_capacity(INITIAL_TOKENS))
            .collect();
        Self {
            pool: Mutex::new(pool),
        }
    }

    fn take_buffer(&self) -> Vec<Token> {
        self.pool
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(INITIAL_TOKENS))
    }

    fn return_buffer(&self, mut buf: Vec<Token>) {
        buf.clear();
        let mut pool = self.pool.lock();
        if pool.len() < POOL_SIZE {
            pool.push(buf);
        }
    }

    /// Locate the declaration containing `cursor`.
    ///
    /// Returns `None` when the cursor is at top level or no balanced
    /// enclosing block exists; callers then use the buffer unchanged.
    pub fn rip(&self, src: &str, cursor: usize) -> Option<RippedDecl> {
        let mut tokens = self.take_buffer();
        lex_into(src, &mut tokens);
        let result = outermost_scope(&tokens, cursor);
        self.return_buffer(tokens);

        let (begin, close) = result?;
        let end = close + 1;
        if begin > cursor || end < cursor || end > src.len() {
            return None;
        }
        Some(RippedDecl {
            begin,
            end,
            cursor: cursor - begin,
        })
    }
}

fn depth_delta(kind: SyntaxKind) -> i32 {
    match kind {
        SyntaxKind::RBrace => 1,
        SyntaxKind::LBrace => -1,
        _ => 0,
    }
}

fn outermost_scope(tokens: &[Token], cursor: usize) -> Option<(usize, usize)> {
    if tokens.is_empty() {
        return None;
    }
    let pos = tokens
        .iter()
        .take_while(|t| t.start() < cursor)
        .count()
        .saturating_sub(1);
    Some((decl_begin(tokens, pos)?, decl_end(tokens, pos)?))
}

/// Offset of the separator before the outermost `{` enclosing `pos`.
fn decl_begin(tokens: &[Token], pos: usize) -> Option<usize> {
    let mut lowest = 0;
    let mut low: Option<usize> = None;
    let mut cur = 0;
    for i in (0..=pos).rev() {
        cur += depth_delta(tokens[i].kind);
        if cur < lowest {
            lowest = cur;
            low = Some(i);
        }
    }
    let low = low?;

    let mut cur = lowest;
    for i in (0..low).rev() {
        let tok = tokens[i];
        cur += depth_delta(tok.kind);
        if tok.kind == SyntaxKind::Semicolon && cur == lowest {
            return Some(tok.start());
        }
    }
    Some(tokens[low].start())
}

/// Offset of the `}` closing the outermost block open at `pos`.
fn decl_end(tokens: &[Token], pos: usize) -> Option<usize> {
    let mut highest = 0;
    let mut high = None;
    let mut cur = 0;
    let start = if tokens[pos].kind == SyntaxKind::LBrace {
        pos + 1
    } else {
        pos
    };
    for tok in &tokens[start..] {
        cur += depth_delta(tok.kind);
        if cur > highest {
            highest = cur;
            high = Some(tok.start());
        }
    }
    high
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rip(src: &str, marker: &str) -> (String, Option<RippedDecl>) {
        let cursor = src.find(marker).expect("marker");
        let src = src.replacen(marker, "", 1);
        let ripped = Ripper::new().rip(&src, cursor);
        (src, ripped)
    }

    #[test]
    fn test_rips_enclosing_function() {
        let (src, ripped) = rip(
            "package p\n\nfunc a() {}\n\nfunc b() {\n\tif x {\n\t\ty.@\n\t}\n}\n\nvar z = 1\n",
            "@",
        );
        let ripped = ripped.expect("ripped");
        let fragment = ripped.fragment(&src);
        assert!(fragment.contains("func b()"), "{fragment:?}");
        assert!(fragment.ends_with('}'));
        assert!(!fragment.contains("func a"));
        assert_eq!(&fragment[ripped.cursor - 2..ripped.cursor], "y.");

        let rest = ripped.remainder(&src);
        assert!(rest.contains("func a() {}"));
        assert!(rest.contains("var z = 1"));
        assert!(!rest.contains("func b"));
    }

    #[test]
    fn test_top_level_cursor_is_not_ripped() {
        let (_, ripped) = rip("package p\nfunc a() {}\nvar x = y.@\n", "@");
        assert_eq!(ripped, None);
    }

    #[test]
    fn test_unbalanced_before_cursor_still_isolates() {
        let (src, ripped) = rip(
            "package p\nfunc broken() {\n\tif (\n}\nfunc ok() {\n\tt.@\n}\n",
            "@",
        );
        let ripped = ripped.expect("ripped");
        let fragment = ripped.fragment(&src);
        assert!(fragment.contains("func ok()"), "{fragment:?}");
        assert!(!fragment.contains("broken"));
    }

    #[test]
    fn test_empty_and_unclosed() {
        let ripper = Ripper::new();
        assert_eq!(ripper.rip("", 0), None);
        assert_eq!(ripper.rip("package p\nfunc f() {\n\tx.", 22), None);
    }

    #[test]
    fn test_pool_is_bounded() {
        let ripper = Ripper::new();
        for _ in 0..50 {
            ripper.rip("package p\nfunc f() { x }\n", 22);
        }
        assert!(ripper.pool.lock().len() <= POOL_SIZE);
    }
}
