use super::{LineSummary, NextLine, StatementRules};
use crate::{
    lexer::{SingleQuote, Syntax},
    types::SqlQuotePolicy,
};

pub fn syntax(policy: SqlQuotePolicy) -> Syntax {
    Syntax {
        line_comments: &["--"],
        block_comment: Some(("/*", "*/")),
        nested_block_comments: false,
        single_quote: SingleQuote::String,
        triple_quotes: &[],
        triple_quote_escapes: false,
        backticks: true,
        backslash_escapes: policy.backslash_escapes,
        doubled_quotes: policy.doubled_quotes,
        separator: Some(';'),
    }
}

/// SQL statements end only at a top-level `;`
#[derive(Default, Clone, Copy)]
pub struct SqlRules {
    policy: SqlQuotePolicy,
}

impl SqlRules {
    pub fn new(policy: SqlQuotePolicy) -> Self {
        Self { policy }
    }
}

impl StatementRules for SqlRules {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn syntax(&self) -> Syntax {
        syntax(self.policy)
    }

    fn newline_terminates(&self) -> bool {
        false
    }

    fn continues(&self, _prev: &LineSummary, _next: &NextLine<'_>) -> bool {
        true
    }
}
