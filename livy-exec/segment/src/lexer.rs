//! Finite-state scanner shared by every language.
//!
//! The lexer walks the source once and yields lexemes. Strings and comments
//! come out as single lexemes even when they span many lines, so the
//! segmenter never sees a newline that lives inside one of them.

use std::ops::Range;

/// Lexical mode the scanner is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Normal,
    LineComment,
    BlockComment { depth: u32 },
    SingleQuoteString,
    DoubleQuoteString,
    TripleQuoteString { quote: char },
    BacktickQuote,
}

/// How a language treats the `'` character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleQuote {
    /// `'...'` is a string literal
    String,
    /// Only `'x'` and `'\x'` are literals; otherwise `'` is plain code (Scala symbols)
    CharLiteral,
}

/// Lexical surface of one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    pub nested_block_comments: bool,
    pub single_quote: SingleQuote,
    pub triple_quotes: &'static [char],
    pub triple_quote_escapes: bool,
    pub backticks: bool,
    pub backslash_escapes: bool,
    pub doubled_quotes: bool,
    /// Explicit statement separator, honoured only at the top level
    pub separator: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    Newline,
    Space,
    Code(char),
    Open(char),
    Close(char),
    Separator,
    Comment { block: bool, terminated: bool },
    Quoted { terminated: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub span: Range<usize>,
}

pub struct Lexer<'a> {
    src: &'a str,
    syntax: &'a Syntax,
    pos: usize,
    state: LexState,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, syntax: &'a Syntax) -> Self {
        Self {
            src,
            syntax,
            pos: 0,
            state: LexState::Normal,
        }
    }

    /// Current mode. Anything but `Normal` after the last lexeme means the
    /// input ended inside a literal or comment.
    pub fn state(&self) -> LexState {
        self.state
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn looks_like_char_literal(&self) -> bool {
        let mut chars = self.rest().chars().skip(1);
        match (chars.next(), chars.next()) {
            (Some('\\'), _) => true,
            (Some(c), Some('\'')) => c != '\'' && c != '\n',
            _ => false,
        }
    }

    fn scan_line_comment(&mut self) -> LexemeKind {
        self.state = LexState::LineComment;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        self.state = LexState::Normal;
        LexemeKind::Comment {
            block: false,
            terminated: true,
        }
    }

    fn scan_block_comment(&mut self, open: &str, close: &str) -> LexemeKind {
        self.state = LexState::BlockComment { depth: 1 };
        while let LexState::BlockComment { depth } = self.state {
            if self.eat(close) {
                self.state = if depth == 1 {
                    LexState::Normal
                } else {
                    LexState::BlockComment { depth: depth - 1 }
                };
            } else if self.syntax.nested_block_comments && self.eat(open) {
                self.state = LexState::BlockComment { depth: depth + 1 };
            } else if self.bump().is_none() {
                break;
            }
        }
        LexemeKind::Comment {
            block: true,
            terminated: self.state == LexState::Normal,
        }
    }

    fn scan_quoted(&mut self, quote: char, state: LexState) -> LexemeKind {
        self.state = state;
        let escapes = self.syntax.backslash_escapes && state != LexState::BacktickQuote;
        while let Some(c) = self.bump() {
            if escapes && c == '\\' {
                self.bump();
            } else if c == quote {
                if self.syntax.doubled_quotes && self.peek() == Some(quote) {
                    self.bump();
                    continue;
                }
                self.state = LexState::Normal;
                break;
            }
        }
        LexemeKind::Quoted {
            terminated: self.state == LexState::Normal,
        }
    }

    fn scan_triple_quoted(&mut self, quote: char) -> LexemeKind {
        self.state = LexState::TripleQuoteString { quote };
        let closing: String = std::iter::repeat(quote).take(3).collect();
        loop {
            if self.eat(&closing) {
                while self.peek() == Some(quote) {
                    self.bump();
                }
                self.state = LexState::Normal;
                break;
            }
            match self.bump() {
                Some('\\') if self.syntax.triple_quote_escapes => {
                    self.bump();
                }
                Some(_) => {}
                None => break,
            }
        }
        LexemeKind::Quoted {
            terminated: self.state == LexState::Normal,
        }
    }

    fn scan(&mut self, c: char) -> LexemeKind {
        let syntax = self.syntax;

        if c == '\n' {
            self.bump();
            return LexemeKind::Newline;
        }
        if c.is_whitespace() {
            while matches!(self.peek(), Some(w) if w.is_whitespace() && w != '\n') {
                self.bump();
            }
            return LexemeKind::Space;
        }
        if let Some(prefix) = syntax
            .line_comments
            .iter()
            .find(|p| self.rest().starts_with(**p))
        {
            self.pos += prefix.len();
            return self.scan_line_comment();
        }
        if let Some((open, close)) = syntax.block_comment {
            if self.eat(open) {
                return self.scan_block_comment(open, close);
            }
        }
        for &quote in syntax.triple_quotes {
            let opening: String = std::iter::repeat(quote).take(3).collect();
            if self.eat(&opening) {
                return self.scan_triple_quoted(quote);
            }
        }

        match c {
            '"' => {
                self.bump();
                self.scan_quoted('"', LexState::DoubleQuoteString)
            }
            '\'' if syntax.single_quote == SingleQuote::String || self.looks_like_char_literal() => {
                self.bump();
                self.scan_quoted('\'', LexState::SingleQuoteString)
            }
            '`' if syntax.backticks => {
                self.bump();
                self.scan_quoted('`', LexState::BacktickQuote)
            }
            '(' | '[' | '{' => {
                self.bump();
                LexemeKind::Open(c)
            }
            ')' | ']' | '}' => {
                self.bump();
                LexemeKind::Close(c)
            }
            _ => {
                self.bump();
                if syntax.separator == Some(c) {
                    LexemeKind::Separator
                } else {
                    LexemeKind::Code(c)
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Lexeme;

    fn next(&mut self) -> Option<Lexeme> {
        let c = self.peek()?;
        let start = self.pos;
        let kind = self.scan(c);
        Some(Lexeme {
            kind,
            span: start..self.pos,
        })
    }
}

/// Opening bracket matching `close`
pub fn opener_of(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{python, scala, sql};
    use crate::SqlQuotePolicy;

    fn kinds(src: &str, syntax: &Syntax) -> Vec<LexemeKind> {
        Lexer::new(src, syntax).map(|l| l.kind).collect()
    }

    #[test]
    fn test_block_comment_is_one_lexeme() {
        let syntax = scala::syntax();
        let lexemes: Vec<_> = Lexer::new("/* a\nb */x", &syntax).collect();
        assert_eq!(lexemes.len(), 2);
        assert_eq!(
            lexemes[0].kind,
            LexemeKind::Comment {
                block: true,
                terminated: true
            }
        );
        assert_eq!(lexemes[0].span, 0..9);
    }

    #[test]
    fn test_nested_scala_comment() {
        let syntax = scala::syntax();
        let mut lexer = Lexer::new("/* outer /* inner */ still */", &syntax);
        let first = lexer.next().unwrap();
        assert_eq!(first.span.end, 29);
        assert_eq!(lexer.state(), LexState::Normal);
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        let syntax = python::syntax();
        let lexemes = kinds(r#""he\"llo" x"#, &syntax);
        assert_eq!(lexemes[0], LexemeKind::Quoted { terminated: true });
        assert_eq!(lexemes[2], LexemeKind::Code('x'));
    }

    #[test]
    fn test_unterminated_string_leaves_state() {
        let syntax = python::syntax();
        let mut lexer = Lexer::new("'abc", &syntax);
        assert_eq!(
            lexer.next().unwrap().kind,
            LexemeKind::Quoted { terminated: false }
        );
        assert_eq!(lexer.state(), LexState::SingleQuoteString);
    }

    #[test]
    fn test_scala_symbol_is_not_a_string() {
        let syntax = scala::syntax();
        let lexemes = kinds("'sym + 'c'", &syntax);
        assert_eq!(lexemes[0], LexemeKind::Code('\''));
        assert_eq!(
            lexemes.last(),
            Some(&LexemeKind::Quoted { terminated: true })
        );
    }

    #[test]
    fn test_sql_doubled_quote_policy() {
        let doubled = sql::syntax(SqlQuotePolicy::default());
        let lexemes = kinds("'it''s';", &doubled);
        assert_eq!(lexemes, vec![
            LexemeKind::Quoted { terminated: true },
            LexemeKind::Separator
        ]);

        let plain = sql::syntax(SqlQuotePolicy {
            backslash_escapes: true,
            doubled_quotes: false,
        });
        let lexemes = kinds("'it''s';", &plain);
        assert_eq!(lexemes.len(), 3);
    }

    #[test]
    fn test_triple_quote_spans_lines() {
        let syntax = python::syntax();
        let mut lexer = Lexer::new("\"\"\"a\n'b'\n\"\"\"", &syntax);
        let lexeme = lexer.next().unwrap();
        assert_eq!(lexeme.kind, LexemeKind::Quoted { terminated: true });
        assert!(lexer.next().is_none());
    }
}
