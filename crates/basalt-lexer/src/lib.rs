//! Basalt Lexer - Tokenization using logos
//!
//! Handles Basalt's assignment family: `<-` is assignment, `+<-` and
//! friends are the compound forms, and `==` is equality.

mod token;

pub use token::*;

use basalt_ast::{FileId, Span};
use logos::Logos;

/// Precomputed line starts for byte-offset to line/column conversion
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column) of a byte offset
    pub fn location(&self, offset: usize) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = offset - self.line_starts[line] + 1;
        (line as u32 + 1, column as u32)
    }
}

/// A token with its span
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

/// Tokenize a source string into a vector of tokens
pub fn tokenize(source: &str, file: FileId) -> Vec<Token> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let (line, column) = index.location(range.start);
        let span = Span::new(file, range.start, range.end, line, column);
        let kind = match result {
            Ok(kind) => kind,
            Err(_) => TokenKind::Error,
        };
        tokens.push(Token { kind, span });
    }

    // Add EOF token
    let end = source.len();
    let (line, column) = index.location(end);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(file, end, end, line, column),
    });

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, FileId(0))
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = kinds("u32 x <- 5;");
        assert_eq!(
            tokens,
            vec![
                TokenKind::U32,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_assignment_vs_comparison() {
        assert_eq!(kinds("a <- b")[1], TokenKind::Assign);
        assert_eq!(kinds("a < b")[1], TokenKind::Lt);
        assert_eq!(kinds("a <= b")[1], TokenKind::Le);
        assert_eq!(kinds("a == b")[1], TokenKind::EqEq);
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(kinds("x +<- 1")[1], TokenKind::AddAssign);
        assert_eq!(kinds("x <<<- 1")[1], TokenKind::ShlAssign);
        assert_eq!(kinds("x >><- 1")[1], TokenKind::ShrAssign);
    }

    #[test]
    fn test_hex_and_binary_literals() {
        assert_eq!(kinds("0x40000000")[0], TokenKind::HexInt);
        assert_eq!(kinds("0b1010")[0], TokenKind::BinInt);
        assert_eq!(kinds("3.5")[0], TokenKind::Float);
    }

    #[test]
    fn test_keywords_vs_idents() {
        assert_eq!(kinds("scope")[0], TokenKind::Scope);
        assert_eq!(kinds("scopes")[0], TokenKind::Ident);
        assert_eq!(kinds("this")[0], TokenKind::This);
        assert_eq!(kinds("global")[0], TokenKind::Global);
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = kinds("x // trailing\n<- /* inline */ 1");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = tokenize("u8 a;\n  u8 b;", FileId(0));
        // `b` declaration starts on line 2, column 3
        assert_eq!(tokens[3].span.line, 2);
        assert_eq!(tokens[3].span.column, 3);
    }
}
