//! Minimal delimited-text reader/writer (header row + records).
//!
//! Fields may be wrapped in double quotes; inside quotes the delimiter and
//! newlines are literal and `""` is an escaped quote.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::error::{Result, SurveyError};

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line on which the record starts.
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    pub header: Vec<String>,
    pub rows: Vec<Record>,
}

impl Records {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

pub fn read(path: &Path, delimiter: char) -> Result<Records> {
    let text = fs::read_to_string(path)
        .map_err(|e| SurveyError::io(format!("reading {}", path.display()), e))?;
    parse(&text, delimiter, path)
}

pub fn parse(text: &str, delimiter: char, path: &Path) -> Result<Records> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text, delimiter, path)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| SurveyError::parse(path, 1, "empty input: missing header row"))?;
    let header: Vec<String> = header.fields.into_iter().map(|h| h.trim().to_string()).collect();
    for (i, name) in header.iter().enumerate() {
        if header[..i].contains(name) {
            return Err(SurveyError::parse(
                path,
                1,
                format!("duplicate column `{name}` in header"),
            ));
        }
    }
    let mut rows = Vec::new();
    for record in records {
        if record.fields.len() != header.len() {
            return Err(SurveyError::parse(
                path,
                record.line,
                format!(
                    "expected {} fields, found {}",
                    header.len(),
                    record.fields.len()
                ),
            ));
        }
        rows.push(record);
    }
    Ok(Records { header, rows })
}

fn split_records(text: &str, delimiter: char, path: &Path) -> Result<Vec<Record>> {
    let mut out = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut quote_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut out, &mut fields, record_line);
                line += 1;
                record_line = line;
            }
            c if c == delimiter => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(SurveyError::parse(path, quote_line, "unterminated quoted field"));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut out, &mut fields, record_line);
    }
    Ok(out)
}

fn push_record(out: &mut Vec<Record>, fields: &mut Vec<String>, line: usize) {
    let taken = std::mem::take(fields);
    // blank line
    if taken.len() == 1 && taken[0].trim().is_empty() {
        return;
    }
    out.push(Record {
        line,
        fields: taken,
    });
}

/// Quote a field if it contains the delimiter, a quote, or a line break.
pub fn escape(field: &str, delimiter: char) -> Cow<'_, str> {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r')
    {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S], delimiter: char) {
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        out.push_str(&escape(f.as_ref(), delimiter));
    }
    out.push('\n');
}

pub fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| SurveyError::io(format!("creating {}", parent.display()), e))?;
    }
    fs::write(path, contents).map_err(|e| SurveyError::io(format!("writing {}", path.display()), e))
}
