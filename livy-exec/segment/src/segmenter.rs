use crate::{
    language::{rules_for, LineSummary, NextLine, StatementRules},
    lexer::{opener_of, LexState, LexemeKind, Lexer},
    types::{Incomplete, Segmentation, SourceBlock, SqlQuotePolicy, StatementUnit},
};
use std::{mem, ops::Range};
use tracing::debug;

/// Top-level newline that may end the current statement. The decision waits
/// for the next line that carries code; comments seen in between start the
/// next statement if the boundary is confirmed.
struct Pending {
    cut: usize,
    resume: Option<usize>,
}

#[derive(Default)]
struct LineTracker {
    line_start: usize,
    current: LineSummary,
    last: LineSummary,
}

impl LineTracker {
    fn newline(&mut self, at: usize) {
        if !self.current.is_empty() {
            self.last = mem::take(&mut self.current);
        }
        self.line_start = at;
    }

    fn indented(&self, src: &str) -> bool {
        src[self.line_start..].starts_with(|c: char| c == ' ' || c == '\t')
    }
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    sql_quote_policy: SqlQuotePolicy,
}

impl Segmenter {
    pub fn new(sql_quote_policy: SqlQuotePolicy) -> Self {
        Self { sql_quote_policy }
    }

    pub fn split(&self, block: &SourceBlock) -> Segmentation {
        let rules = rules_for(block.kind(), self.sql_quote_policy);
        let segmentation = self.split_with(block.text(), rules.as_ref());
        debug!(
            "Split {} block into {} statements",
            rules.name(),
            segmentation.len()
        );
        segmentation
    }

    pub fn split_with(&self, src: &str, rules: &dyn StatementRules) -> Segmentation {
        let syntax = rules.syntax();
        let mut lexer = Lexer::new(src, &syntax);

        let mut spans: Vec<(Range<usize>, Option<Incomplete>)> = Vec::new();
        let mut start: Option<usize> = None;
        let mut end = 0;
        let mut pending: Option<Pending> = None;
        // Comments seen before the first code of a statement
        let mut leading: Option<usize> = None;
        let mut stack: Vec<char> = Vec::new();
        let mut degenerate: Option<Incomplete> = None;
        let mut line = LineTracker::default();

        for lexeme in lexer.by_ref() {
            let Range { start: at, end: next } = lexeme.span;
            let kind = match lexeme.kind {
                LexemeKind::Separator if !stack.is_empty() => {
                    LexemeKind::Code(syntax.separator.unwrap_or(';'))
                }
                kind => kind,
            };

            match kind {
                LexemeKind::Newline => {
                    if rules.newline_terminates()
                        && stack.is_empty()
                        && pending.is_none()
                        && start.is_some()
                    {
                        pending = Some(Pending {
                            cut: end,
                            resume: None,
                        });
                    }
                    line.newline(next);
                }
                LexemeKind::Space => line.current.push_space(),
                LexemeKind::Comment { .. } => {
                    match pending.as_mut() {
                        Some(p) => {
                            p.resume.get_or_insert(at);
                        }
                        None if start.is_none() => {
                            leading.get_or_insert(at);
                        }
                        None => {}
                    }
                    end = next;
                }
                LexemeKind::Separator => {
                    leading = None;
                    if let Some(p) = pending.take() {
                        if let Some(s) = start.take() {
                            spans.push((s..p.cut, degenerate.take()));
                        }
                        start = p.resume;
                    }
                    if let Some(s) = start.take() {
                        spans.push((s..end, degenerate.take()));
                    }
                    line.current = LineSummary::default();
                    line.last = LineSummary::default();
                }
                code => {
                    if let Some(p) = pending.take() {
                        let upcoming = NextLine {
                            text: &src[at..],
                            indented: line.indented(src),
                        };
                        if !rules.continues(&line.last, &upcoming) {
                            if let Some(s) = start.take() {
                                spans.push((s..p.cut, degenerate.take()));
                            }
                            start = Some(p.resume.unwrap_or(at));
                        }
                    }
                    if start.is_none() {
                        start = Some(leading.take().unwrap_or(at));
                    }

                    match code {
                        LexemeKind::Open(c) => stack.push(c),
                        LexemeKind::Close(c) => match stack.pop() {
                            Some(open) if open == opener_of(c) => {}
                            Some(open) => {
                                degenerate.get_or_insert(Incomplete::MismatchedBracket {
                                    expected: closer_of(open),
                                    found: c,
                                });
                            }
                            None => {
                                degenerate.get_or_insert(Incomplete::StrayCloser(c));
                            }
                        },
                        _ => {}
                    }
                    match code {
                        LexemeKind::Code(c) | LexemeKind::Open(c) | LexemeKind::Close(c) => {
                            line.current.push_code(c)
                        }
                        _ => {
                            if let Some(c) = src[at..next].chars().next_back() {
                                line.current.push_code(c);
                            }
                        }
                    }
                    end = next;
                }
            }
        }

        if let Some(s) = start.or(leading) {
            let unterminated = match lexer.state() {
                LexState::Normal | LexState::LineComment => None,
                LexState::BlockComment { .. } => Some(Incomplete::UnterminatedComment),
                _ => Some(Incomplete::UnterminatedString),
            };
            let reason = unterminated
                .or_else(|| stack.first().map(|&open| Incomplete::UnclosedBracket(open)))
                .or(degenerate);
            if let Some(reason) = reason {
                debug!("Trailing statement at byte {} is incomplete: {:?}", s, reason);
            }
            spans.push((s..end, reason));
        }

        build(src, spans)
    }
}

fn closer_of(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn build(src: &str, spans: Vec<(Range<usize>, Option<Incomplete>)>) -> Segmentation {
    let prefix = match spans.first() {
        Some((span, _)) => src[..span.start].to_string(),
        None => src.to_string(),
    };

    let mut units = Vec::with_capacity(spans.len());
    for (i, (span, incomplete)) in spans.iter().enumerate() {
        let separator_end = spans.get(i + 1).map_or(src.len(), |(next, _)| next.start);
        units.push(StatementUnit {
            text: src[span.clone()].to_string(),
            span: span.clone(),
            line: src[..span.start].matches('\n').count() + 1,
            separator: src[span.end..separator_end].to_string(),
            incomplete: *incomplete,
        });
    }

    Segmentation { prefix, units }
}
