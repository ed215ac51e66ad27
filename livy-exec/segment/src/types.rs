use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Source languages a paragraph can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Scala,
    Python,
    R,
    Sql,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Scala => "scala",
            SourceKind::Python => "python",
            SourceKind::R => "r",
            SourceKind::Sql => "sql",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scala" | "spark" => Ok(SourceKind::Scala),
            "python" | "pyspark" => Ok(SourceKind::Python),
            "r" | "sparkr" => Ok(SourceKind::R),
            "sql" => Ok(SourceKind::Sql),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

/// Quote escaping accepted inside SQL string literals.
///
/// Spark SQL accepts backslash escapes; ANSI dialects escape a quote by
/// doubling it. Both are on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlQuotePolicy {
    #[serde(default = "enabled")]
    pub backslash_escapes: bool,
    #[serde(default = "enabled")]
    pub doubled_quotes: bool,
}

fn enabled() -> bool {
    true
}

impl Default for SqlQuotePolicy {
    fn default() -> Self {
        Self {
            backslash_escapes: true,
            doubled_quotes: true,
        }
    }
}

/// A paragraph of source text as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    kind: SourceKind,
    text: String,
}

impl SourceBlock {
    pub fn new(kind: SourceKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Why the segmenter could not prove a statement is lexically closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Incomplete {
    /// Input ended inside a string, char or backtick literal
    UnterminatedString,
    /// Input ended inside a block comment
    UnterminatedComment,
    /// Input ended with this bracket still open
    UnclosedBracket(char),
    /// A closing bracket did not match the innermost open one
    MismatchedBracket { expected: char, found: char },
    /// A closing bracket appeared with nothing open
    StrayCloser(char),
}

/// One independently submittable statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementUnit {
    /// Statement text, without surrounding whitespace or separators
    pub text: String,
    /// Byte range of `text` in the source block
    pub span: Range<usize>,
    /// 1-based line the statement starts on
    pub line: usize,
    /// Exact source text between this statement and the next one
    pub separator: String,
    pub incomplete: Option<Incomplete>,
}

impl StatementUnit {
    pub fn possibly_incomplete(&self) -> bool {
        matches!(
            self.incomplete,
            Some(
                Incomplete::UnterminatedString
                    | Incomplete::UnterminatedComment
                    | Incomplete::UnclosedBracket(_)
            )
        )
    }
}

/// Ordered statements produced from one source block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    /// Whitespace, blank lines or separators before the first statement
    pub prefix: String,
    pub units: Vec<StatementUnit>,
}

impl Segmentation {
    pub fn units(&self) -> &[StatementUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<StatementUnit> {
        self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Rebuild the original block from statements and their separators.
    pub fn reconstruct(&self) -> String {
        let mut out = self.prefix.clone();
        for unit in &self.units {
            out.push_str(&unit.text);
            out.push_str(&unit.separator);
        }
        out
    }
}
