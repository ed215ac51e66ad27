use super::{LineSummary, NextLine, StatementRules};
use crate::lexer::{SingleQuote, Syntax};

const TRAILING_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "^", "<", ">", "=", "!", "&", "|", "~", ",", "%", "$", "@", ":",
];

pub fn syntax() -> Syntax {
    Syntax {
        line_comments: &["#"],
        block_comment: None,
        nested_block_comments: false,
        single_quote: SingleQuote::String,
        triple_quotes: &[],
        triple_quote_escapes: false,
        backticks: true,
        backslash_escapes: true,
        doubled_quotes: false,
        separator: None,
    }
}

#[derive(Default, Clone, Copy)]
pub struct RRules;

impl StatementRules for RRules {
    fn name(&self) -> &'static str {
        "r"
    }

    fn syntax(&self) -> Syntax {
        syntax()
    }

    fn continues(&self, prev: &LineSummary, next: &NextLine<'_>) -> bool {
        next.text.starts_with('{')
            || next.first_word() == "else"
            || prev.ends_with_any(TRAILING_OPERATORS)
    }
}
