use super::{LineSummary, NextLine, StatementRules};
use crate::lexer::{SingleQuote, Syntax};

const LEADING_CONTINUATIONS: &[&str] = &[
    "else", "catch", "finally", "with", "extends", "yield", "match", "forSome",
];
const TRAILING_KEYWORDS: &[&str] = &["else", "yield", "do", "try", "then", "with", "extends", "new"];
const TRAILING_OPERATORS: &[&str] = &[
    "=", "+", "-", "*", "/", "%", "&", "|", "^", "<", ">", ",", ".",
];

pub fn syntax() -> Syntax {
    Syntax {
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_block_comments: true,
        single_quote: SingleQuote::CharLiteral,
        triple_quotes: &['"'],
        triple_quote_escapes: false,
        backticks: true,
        backslash_escapes: true,
        doubled_quotes: false,
        separator: None,
    }
}

#[derive(Default, Clone, Copy)]
pub struct ScalaRules;

impl StatementRules for ScalaRules {
    fn name(&self) -> &'static str {
        "scala"
    }

    fn syntax(&self) -> Syntax {
        syntax()
    }

    fn continues(&self, prev: &LineSummary, next: &NextLine<'_>) -> bool {
        if next.text.starts_with('.') || next.text.starts_with('{') {
            return true;
        }
        if LEADING_CONTINUATIONS.contains(&next.first_word()) {
            return true;
        }
        if TRAILING_KEYWORDS.contains(&prev.last_word.as_str()) {
            return true;
        }
        // `import a.b.*` and `import a.b._` end statements
        prev.head != "import" && prev.ends_with_any(TRAILING_OPERATORS)
    }
}
