//! Turns raw statement output into display-ready results.

use serde_json::Value;

use crate::types::{ExecutionConfig, RawOutput, ResultKind, TypedResult};

/// Table produced by the `%table` magic on the server
pub const LIVY_TABLE_MIME: &str = "application/vnd.livy.table.v1+json";
pub const JSON_MIME: &str = "application/json";
pub const HTML_MIME: &str = "text/html";
pub const TEXT_MIME: &str = "text/plain";

/// Media type assumed for `%img` output
const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    /// The server already dropped rows
    partial: bool,
}

#[derive(Debug, Clone)]
pub struct OutputClassifier {
    max_result_rows: usize,
    max_field_length: usize,
    truncate_fields: bool,
}

impl OutputClassifier {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            max_result_rows: config.max_result_rows,
            max_field_length: config.max_field_length,
            truncate_fields: config.enable_field_truncation,
        }
    }

    /// Classify a statement outcome. Never fails: anything unrecognized is
    /// returned as text.
    pub fn classify(&self, raw: &RawOutput) -> TypedResult {
        if !raw.success {
            return TypedResult::error(raw.trace.clone().unwrap_or_default());
        }

        if let Some(table) = raw.data.get(LIVY_TABLE_MIME).and_then(livy_table) {
            return self.render(table);
        }
        if let Some(table) = raw.data.get(JSON_MIME).and_then(json_table) {
            return self.render(table);
        }
        if let Some((media_type, data)) = raw
            .data
            .iter()
            .find(|(mime, _)| mime.starts_with("image/"))
            .and_then(|(mime, value)| Some((mime, value.as_str()?)))
        {
            return TypedResult::image(media_type.clone(), data.trim());
        }
        if let Some(html) = raw.data.get(HTML_MIME).and_then(Value::as_str) {
            return TypedResult::new(ResultKind::Html, html);
        }
        if let Some(text) = raw.text() {
            return self.classify_text(text);
        }
        match raw.data.get(JSON_MIME) {
            Some(json) => TypedResult::text(json.to_string()),
            None => TypedResult::text(""),
        }
    }

    /// Classify plain text by its leading display directive.
    pub fn classify_text(&self, text: &str) -> TypedResult {
        let body = text.trim_start();
        if let Some(html) = directive(body, "%html") {
            return TypedResult::new(ResultKind::Html, html.trim());
        }
        if let Some(table) = directive(body, "%table") {
            return self.render(tsv_table(table));
        }
        if let Some(image) = directive(body, "%img") {
            return TypedResult::image(DEFAULT_IMAGE_MIME, image.trim());
        }
        TypedResult::text(text)
    }

    /// Classify the output of `Dataset.show()`, parsing Spark's ASCII table.
    /// Output that is not a table is classified as usual.
    pub fn classify_show_output(&self, raw: &RawOutput) -> TypedResult {
        if !raw.success {
            return self.classify(raw);
        }
        match raw.text().and_then(ascii_table) {
            Some(table) => self.render(table),
            None => self.classify(raw),
        }
    }

    fn render(&self, table: Table) -> TypedResult {
        let truncated = table.partial || table.rows.len() > self.max_result_rows;
        let mut out = table
            .columns
            .iter()
            .map(|column| flatten(column))
            .collect::<Vec<_>>()
            .join("\t");
        for row in table.rows.iter().take(self.max_result_rows) {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(|cell| self.cell(cell)).collect();
            out.push_str(&cells.join("\t"));
        }

        TypedResult {
            truncated,
            ..TypedResult::new(ResultKind::Table, out)
        }
    }

    fn cell(&self, value: &str) -> String {
        let value = flatten(value);
        if self.truncate_fields {
            truncate_field(&value, self.max_field_length)
        } else {
            value
        }
    }
}

/// Shorten `value` to `max` characters, the last three being `...`.
/// Limits below four keep a bare prefix, as Spark does.
pub fn truncate_field(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    if max < 4 {
        return value.chars().take(max).collect();
    }
    let mut short: String = value.chars().take(max - 3).collect();
    short.push_str("...");
    short
}

/// Cell text cannot carry the row or column separators.
fn flatten(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

fn directive<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(marker)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn row_cells(row: &Value, columns: &[String]) -> Option<Vec<String>> {
    match row {
        Value::Array(cells) => Some(cells.iter().map(cell_text).collect()),
        Value::Object(fields) => Some(
            columns
                .iter()
                .map(|c| fields.get(c).map(cell_text).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    }
}

fn rows_of(data: &Value, columns: &[String]) -> Option<Vec<Vec<String>>> {
    data.as_array()?
        .iter()
        .map(|row| row_cells(row, columns))
        .collect()
}

/// `{"headers": [{"name": ..}], "data": [[..]]}`
fn livy_table(value: &Value) -> Option<Table> {
    let columns = value
        .get("headers")?
        .as_array()?
        .iter()
        .map(|h| h.get("name").and_then(Value::as_str).map(str::to_string))
        .collect::<Option<Vec<_>>>()?;
    let rows = rows_of(value.get("data")?, &columns)?;
    Some(Table {
        columns,
        rows,
        partial: false,
    })
}

/// Either a SQL result `{"schema": {"fields": [..]}, "data": [[..]]}` or a
/// list of records with named columns.
fn json_table(value: &Value) -> Option<Table> {
    if let Some(fields) = value.pointer("/schema/fields").and_then(Value::as_array) {
        let columns = fields
            .iter()
            .map(|f| f.get("name").and_then(Value::as_str).map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        let rows = rows_of(value.get("data")?, &columns)?;
        return Some(Table {
            columns,
            rows,
            partial: false,
        });
    }

    let records = value.as_array()?;
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.as_object()?.keys() {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }
    if columns.is_empty() {
        return None;
    }
    let rows = rows_of(value, &columns)?;
    Some(Table {
        columns,
        rows,
        partial: false,
    })
}

/// Tab separated header line followed by one line per row
fn tsv_table(text: &str) -> Table {
    let mut lines = text
        .trim_start_matches([' ', '\n', '\r'])
        .lines()
        .filter(|line| !line.is_empty());
    let columns = lines
        .next()
        .map(|header| header.split('\t').map(str::to_string).collect())
        .unwrap_or_default();
    let rows = lines
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect();
    Table {
        columns,
        rows,
        partial: false,
    }
}

fn is_border(line: &str) -> bool {
    line.len() > 1 && line.starts_with('+') && line.chars().all(|c| c == '+' || c == '-')
}

/// Char offsets of the `+` corners in a border line
fn corners(border: &str) -> Vec<usize> {
    border
        .chars()
        .enumerate()
        .filter(|&(_, c)| c == '+')
        .map(|(i, _)| i)
        .collect()
}

/// Cells are cut at the border's corners so a `|` inside a value stays in
/// its cell. Rows whose width differs from the border (wide characters)
/// fall back to splitting on `|`.
fn ascii_row(line: &str, corners: &[usize]) -> Option<Vec<String>> {
    let chars: Vec<char> = line.chars().collect();
    let width = corners.last().map_or(0, |last| last + 1);
    if chars.len() == width && corners.iter().all(|&i| chars[i] == '|') {
        let cells = corners
            .windows(2)
            .map(|pair| {
                chars[pair[0] + 1..pair[1]]
                    .iter()
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .collect();
        return Some(cells);
    }
    let inner = line.strip_prefix('|')?.strip_suffix('|')?;
    let cells: Vec<String> = inner.split('|').map(|cell| cell.trim().to_string()).collect();
    (cells.len() + 1 == corners.len()).then_some(cells)
}

/// Parse the table printed by `Dataset.show()`:
///
/// ```text
/// +-----+-----+
/// |col_1|col_2|
/// +-----+-----+
/// |hello|   20|
/// +-----+-----+
/// only showing top 1 row
/// ```
fn ascii_table(text: &str) -> Option<Table> {
    let mut lines = text
        .lines()
        .map(str::trim_end)
        .skip_while(|line| line.trim().is_empty());
    let border = lines.next()?;
    if !is_border(border) {
        return None;
    }
    let corners = corners(border);
    let columns = ascii_row(lines.next()?, &corners)?;
    if !is_border(lines.next()?) {
        return None;
    }

    let mut rows = Vec::new();
    let mut partial = false;
    for line in lines {
        if is_border(line) {
            continue;
        }
        match ascii_row(line, &corners) {
            Some(cells) => rows.push(cells),
            None if line.starts_with("only showing top") => partial = true,
            None => {}
        }
    }
    Some(Table {
        columns,
        rows,
        partial,
    })
}
