//! Reference Tables
//!
//! Static tabular data (deduction caps, tax brackets) that table-backed agents
//! inject into their system prompt. A table is read once when its agent is
//! built and shared read-only afterwards.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{AgentError, Result};
use crate::parser::quote_literal;

/// Header plus rows of a delimited file, in file order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ReferenceTable {
    /// Read a delimited file whose first non-blank line is the header.
    pub fn load(path: impl AsRef<Path>, delimiter: char) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Table(format!("cannot read {}: {}", path.display(), e))
        })?;
        let table = Self::parse(&text, delimiter)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.rows.len(),
            "Loaded reference table"
        );
        Ok(table)
    }

    /// Parse delimited text. Blank lines are skipped and unquoted cells are
    /// trimmed; short rows are padded, rows wider than the header are rejected.
    /// A cell wrapped in `"` may hold the delimiter or a line break, and `""`
    /// inside it stands for one quote.
    pub fn parse(text: &str, delimiter: char) -> Result<Self> {
        let mut records = split_records(text, delimiter)?.into_iter();

        let headers = match records.next() {
            Some((_, headers)) => headers,
            None => return Err(AgentError::Table("table has no header row".into())),
        };

        let mut rows = Vec::new();
        for (line, mut row) in records {
            if row.len() > headers.len() {
                return Err(AgentError::Table(format!(
                    "line {} has {} cells, header has {}",
                    line,
                    row.len(),
                    headers.len()
                )));
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a list of header-keyed records for prompt injection
    pub fn render(&self) -> String {
        let mut out = String::from("[");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push('{');
            for (j, (header, cell)) in self.headers.iter().zip(row).enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}: {}", quote_literal(header), quote_literal(cell));
            }
            out.push('}');
        }
        out.push(']');
        out
    }
}

/// Cells of one record, tagged with the line the record starts on
type Record = (usize, Vec<String>);

fn split_records(text: &str, delimiter: char) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    // `quoted`: the current cell opened with a quote; `in_quotes`: still open
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1;
    let mut start = 1;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                c => {
                    if c == '\n' {
                        line += 1;
                    }
                    cell.push(c);
                }
            }
            continue;
        }

        match c {
            c if c == delimiter => row.push(finish_cell(&mut cell, &mut quoted)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(finish_cell(&mut cell, &mut quoted));
                push_record(&mut records, start, std::mem::take(&mut row));
                line += 1;
                start = line;
            }
            '"' if !quoted && cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
                in_quotes = true;
            }
            c if quoted && c.is_whitespace() => {}
            c => cell.push(c),
        }
    }

    if in_quotes {
        return Err(AgentError::Table(format!(
            "unterminated quoted cell in record starting on line {}",
            start
        )));
    }
    if quoted || !cell.is_empty() || !row.is_empty() {
        row.push(finish_cell(&mut cell, &mut quoted));
        push_record(&mut records, start, row);
    }
    Ok(records)
}

fn finish_cell(cell: &mut String, quoted: &mut bool) -> String {
    let text = std::mem::take(cell);
    if std::mem::take(quoted) {
        text
    } else {
        text.trim().to_string()
    }
}

fn push_record(records: &mut Vec<Record>, line: usize, row: Vec<String>) {
    if row.len() == 1 && row[0].is_empty() {
        return;
    }
    records.push((line, row));
}
