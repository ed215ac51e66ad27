pub mod python;
pub mod r;
pub mod scala;
pub mod sql;

use crate::{
    lexer::Syntax,
    types::{SourceKind, SqlQuotePolicy},
};

/// Code seen on the last line that carried any, ignoring comments
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineSummary {
    /// First word of the line, or its first symbol
    pub head: String,
    /// Last three code characters of the line
    pub tail: String,
    /// Identifier the line ends with, empty if it ends with a symbol
    pub last_word: String,
    head_done: bool,
    word_open: bool,
}

impl LineSummary {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.tail.is_empty()
    }

    pub(crate) fn push_code(&mut self, c: char) {
        let ident = c.is_alphanumeric() || c == '_';
        if !self.head_done {
            if ident {
                self.head.push(c);
            } else {
                if self.head.is_empty() {
                    self.head.push(c);
                }
                self.head_done = true;
            }
        }
        if ident {
            if !self.word_open {
                self.last_word.clear();
                self.word_open = true;
            }
            self.last_word.push(c);
        } else {
            self.word_open = false;
            self.last_word.clear();
        }
        self.push_tail(c);
    }

    pub(crate) fn push_space(&mut self) {
        if !self.head.is_empty() {
            self.head_done = true;
        }
        self.word_open = false;
    }

    fn push_tail(&mut self, c: char) {
        self.tail.push(c);
        let excess = self.tail.chars().count().saturating_sub(3);
        if excess > 0 {
            self.tail = self.tail.chars().skip(excess).collect();
        }
    }

    pub fn ends_with_any(&self, suffixes: &[&str]) -> bool {
        suffixes.iter().any(|s| self.tail.ends_with(s))
    }
}

/// Start of the line that follows a candidate statement boundary
#[derive(Debug, Clone, Copy)]
pub struct NextLine<'a> {
    /// Source text from the first code character onwards
    pub text: &'a str,
    /// The line starts with a space or tab
    pub indented: bool,
}

impl NextLine<'_> {
    pub fn first_word(&self) -> &str {
        let end = self
            .text
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.text.len());
        &self.text[..end]
    }
}

/// Per-language knowledge about where statements may end
pub trait StatementRules: Send + Sync {
    /// Returns the name of the language
    fn name(&self) -> &'static str;

    /// Returns the lexical surface used by the scanner
    fn syntax(&self) -> Syntax;

    /// Whether a top-level newline is a candidate statement boundary
    fn newline_terminates(&self) -> bool {
        true
    }

    /// Returns true if `next` continues the statement whose last code line is `prev`
    fn continues(&self, prev: &LineSummary, next: &NextLine<'_>) -> bool;
}

pub fn rules_for(kind: SourceKind, sql_quote_policy: SqlQuotePolicy) -> Box<dyn StatementRules> {
    match kind {
        SourceKind::Scala => Box::new(scala::ScalaRules),
        SourceKind::Python => Box::new(python::PythonRules),
        SourceKind::R => Box::new(r::RRules),
        SourceKind::Sql => Box::new(sql::SqlRules::new(sql_quote_policy)),
    }
}
