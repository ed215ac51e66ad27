//! Livy Segment
//!
//! Splits a notebook paragraph into statements that can be submitted to a
//! remote interpreter one at a time. The segmenter only knows enough about
//! Scala, Python, R and SQL to find safe statement boundaries: it never splits
//! inside a string literal, a comment or an open bracket, and it never rejects
//! input. Anything it cannot close is still emitted as a trailing statement
//! tagged as possibly incomplete so the remote interpreter can report the
//! real error.

pub mod language;
pub mod lexer;
pub mod segmenter;
mod types;

#[cfg(test)]
mod tests;

pub use language::StatementRules;
pub use lexer::{LexState, Lexeme, LexemeKind, Lexer, Syntax};
pub use segmenter::Segmenter;
pub use types::{Incomplete, Segmentation, SourceBlock, SourceKind, SqlQuotePolicy, StatementUnit};

/// Split `block` with the default rules for its language.
pub fn split(block: &SourceBlock) -> Segmentation {
    Segmenter::default().split(block)
}
