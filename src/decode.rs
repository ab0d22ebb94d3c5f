//! Pure decoding pipeline: buffer -> columns -> rows -> records.
//!
//! A "column" here is one unsplit row of raw text. The row separator is
//! sniffed once per buffer:
//!
//! 1. the first character outside `U+0020..=U+007F`, if any (usually `\n` or `\r`);
//! 2. otherwise `;`, if present;
//! 3. otherwise the two-character sequence backslash + `n` (not a real newline).
//!
//! The first matching rule wins. Fields are split on `,` with double-quote
//! quoting and are trimmed.

use crate::{Parsed, Record};
use tracing::{debug, trace};

/// How a buffer is cut into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSplit {
    /// First non-printable or non-ASCII character found in the buffer
    Generic(char),
    Semicolon,
    /// Literal `\` followed by `n`
    EscapedNewline,
}

impl RowSplit {
    fn split<'a>(&self, data: &'a str) -> Vec<&'a str> {
        match *self {
            RowSplit::Generic(c) => data.split(c).collect(),
            RowSplit::Semicolon => data.split(';').collect(),
            RowSplit::EscapedNewline => data.split("\\n").collect(),
        }
    }
}

fn is_printable_ascii(c: char) -> bool {
    ('\u{20}'..='\u{7F}').contains(&c)
}

/// Pick the row separator for `data`.
pub fn sniff_row_split(data: &str) -> RowSplit {
    if let Some(c) = data.chars().find(|&c| !is_printable_ascii(c)) {
        RowSplit::Generic(c)
    } else if data.contains(';') {
        RowSplit::Semicolon
    } else {
        RowSplit::EscapedNewline
    }
}

/// Cut `data` into columns using the sniffed separator.
pub fn split_columns(data: &str) -> Vec<&str> {
    let rule = sniff_row_split(data);
    debug!(?rule, "row separator chosen");
    rule.split(data)
}

#[derive(Clone, Copy)]
enum Field {
    /// Nothing but blanks so far; a quote here opens a quoted field
    Start,
    Unquoted,
    Quoted,
    /// Closing quote seen; anything up to the next comma is kept verbatim
    AfterQuote,
}

/// Split one line on commas honouring double quotes; every field is trimmed.
///
/// Always yields at least one field: an empty line is one empty field.
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = Field::Start;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        state = match (state, c) {
            (Field::Quoted, '"') => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                    Field::Quoted
                } else {
                    Field::AfterQuote
                }
            }
            (Field::Quoted, c) => {
                field.push(c);
                Field::Quoted
            }
            (_, ',') => {
                fields.push(field.trim().to_string());
                field.clear();
                Field::Start
            }
            (Field::Start, '"') => {
                field.clear();
                Field::Quoted
            }
            (Field::Start, c) if c.is_whitespace() => {
                field.push(c);
                Field::Start
            }
            (Field::AfterQuote, c) => {
                field.push(c);
                Field::AfterQuote
            }
            (_, c) => {
                field.push(c);
                Field::Unquoted
            }
        };
    }
    fields.push(field.trim().to_string());
    fields
}

/// Columns tokenized into trimmed fields, one row per column.
pub fn decode_rows(data: &str) -> Vec<Vec<String>> {
    let rows: Vec<Vec<String>> = split_columns(data)
        .into_iter()
        .map(tokenize_line)
        .collect();
    trace!(rows = rows.len(), "rows tokenized");
    rows
}

/// Promote the first row to headers and zip the rest.
///
/// Rows whose width differs from the header row are dropped without notice.
pub fn assemble_records(mut rows: Vec<Vec<String>>) -> Vec<Record> {
    if rows.is_empty() {
        return Vec::new();
    }
    let headers = rows.remove(0);
    rows.into_iter()
        .filter_map(|row| Record::try_from_pairs(&headers, row).ok())
        .collect()
}

/// Decode a whole buffer. `None` (no data acquired) yields an empty result.
pub fn decode(data: Option<&str>, with_headers: bool) -> Parsed {
    let rows = match data {
        Some(data) if !data.is_empty() => decode_rows(data),
        _ => Vec::new(),
    };
    if with_headers {
        Parsed::Records(assemble_records(rows))
    } else {
        Parsed::Rows(rows)
    }
}
