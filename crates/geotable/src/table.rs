//! Loader for the `;`-delimited entity table.
//!
//! First line is the header; fields are found by (trimmed, lowercased)
//! header name, never by position, and extra columns are ignored. Fields
//! may be double-quoted, with `""` inside quotes for a literal quote.
//! Required columns: id, name, type, life, misc, geom.
//!
//! Row errors carry the 1-based line number, counting the header as line 1
//! and empty lines as lines. Any error abandons the whole load.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::wkt::{self, WktError};
use crate::{Dataset, Entity, EntityKind};

pub const REQUIRED_COLUMNS: [&str; 6] = ["id", "name", "type", "life", "misc", "geom"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("missing header '{0}'")]
    MissingColumn(String),

    #[error("invalid {field} at line {line}: '{value}'")]
    InvalidField {
        field: &'static str,
        line: u64,
        value: String,
    },

    #[error("invalid geom at line {line}: {source}")]
    Wkt {
        line: u64,
        #[source]
        source: WktError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;

/// Split one line on `;`, honoring double-quote quoting. Outer quotes are
/// consumed and `""` inside quotes becomes one literal quote.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == ';' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    fields.push(current);
    fields
}

/// Strip one surrounding quote pair, collapsing doubled quotes inside.
/// Fields that are not quote-wrapped pass through unchanged.
fn unquote(text: &str) -> String {
    let bytes = text.as_bytes();

    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        text[1..text.len() - 1].replace("\"\"", "\"")
    } else {
        text.to_string()
    }
}

fn row_field<'a>(
    columns: &HashMap<String, usize>,
    cols: &'a [String],
    key: &'static str,
    line: u64,
) -> Result<&'a str> {
    columns
        .get(key)
        .and_then(|&index| cols.get(index))
        .map(String::as_str)
        .ok_or_else(|| TableError::InvalidField {
            field: key,
            line,
            value: String::new(),
        })
}

/// Parse a whole table from in-memory text; `load` is the file wrapper.
pub fn parse_str(text: &str) -> Result<Dataset> {
    let mut lines = text.lines();
    let header_line = lines.next().unwrap_or("");

    let mut columns: HashMap<String, usize> = HashMap::new();
    for (index, field) in split_line(header_line).iter().enumerate() {
        columns.insert(field.trim().to_ascii_lowercase(), index);
    }

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(TableError::MissingColumn(required.to_string()));
        }
    }

    let mut entities = Vec::new();
    let mut line_number: u64 = 1;

    for line in lines {
        line_number += 1;
        if line.is_empty() {
            continue;
        }

        let cols = split_line(line);

        let id_text = row_field(&columns, &cols, "id", line_number)?;
        let name = unquote(row_field(&columns, &cols, "name", line_number)?);
        let kind_text = row_field(&columns, &cols, "type", line_number)?;
        let life_text = row_field(&columns, &cols, "life", line_number)?;
        let misc = unquote(row_field(&columns, &cols, "misc", line_number)?);
        let wkt_text = unquote(row_field(&columns, &cols, "geom", line_number)?);

        let id: u32 = id_text.parse().map_err(|_| TableError::InvalidField {
            field: "id",
            line: line_number,
            value: id_text.to_string(),
        })?;

        let kind = EntityKind::parse(kind_text);

        let life: f64 = life_text.parse().map_err(|_| TableError::InvalidField {
            field: "life",
            line: line_number,
            value: life_text.to_string(),
        })?;

        let geometry = wkt::parse(&wkt_text).map_err(|source| TableError::Wkt {
            line: line_number,
            source,
        })?;

        entities.push(Entity {
            id,
            name,
            kind,
            life,
            misc,
            geometry,
        });
    }

    Ok(Dataset::from_entities(entities))
}

/// Read and parse a table file.
pub fn load(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path)?;
    parse_str(&text)
}
