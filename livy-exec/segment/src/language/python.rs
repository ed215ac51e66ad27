use super::{LineSummary, NextLine, StatementRules};
use crate::lexer::{SingleQuote, Syntax};

const LEADING_CONTINUATIONS: &[&str] = &["elif", "else", "except", "finally"];

pub fn syntax() -> Syntax {
    Syntax {
        line_comments: &["#"],
        block_comment: None,
        nested_block_comments: false,
        single_quote: SingleQuote::String,
        triple_quotes: &['"', '\''],
        triple_quote_escapes: true,
        backticks: false,
        backslash_escapes: true,
        doubled_quotes: false,
        separator: None,
    }
}

#[derive(Default, Clone, Copy)]
pub struct PythonRules;

impl StatementRules for PythonRules {
    fn name(&self) -> &'static str {
        "python"
    }

    fn syntax(&self) -> Syntax {
        syntax()
    }

    fn continues(&self, prev: &LineSummary, next: &NextLine<'_>) -> bool {
        next.indented
            || LEADING_CONTINUATIONS.contains(&next.first_word())
            || prev.head == "@"
            || prev.ends_with_any(&[":", "\\"])
    }
}
