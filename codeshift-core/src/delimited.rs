//! Decoding and splitting of the publisher's delimited text files.
//!
//! Release tables and crosswalks are headerless, delimited and frequently not
//! UTF-8 (older releases ship as ISO-8859-1 / windows-1252). Files are decoded
//! in full with `encoding_rs` before being handed to the `csv` reader.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

/// Field delimiter and text encoding of a release's files.
#[derive(Clone, Copy, Debug)]
pub struct TableFormat {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl TableFormat {
    pub fn new(delimiter: u8, encoding: &'static Encoding) -> Self {
        Self {
            delimiter,
            encoding,
        }
    }

    /// Build a format from a delimiter character and an encoding label
    /// such as `"UTF-8"` or `"ISO-8859-1"`.
    pub fn from_labels(delimiter: char, encoding: &str) -> Result<Self> {
        let encoding = Encoding::for_label(encoding.trim().as_bytes()).ok_or_else(|| {
            Error::UnknownEncoding {
                label: encoding.to_string(),
            }
        })?;
        if !delimiter.is_ascii() {
            return Err(Error::InvalidDelimiter { delimiter });
        }
        Ok(Self::new(delimiter as u8, encoding))
    }
}

impl Default for TableFormat {
    fn default() -> Self {
        Self::new(b';', UTF_8)
    }
}

/// A parsed row together with its one-based line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub line: u64,
    pub fields: Vec<String>,
}

impl Row {
    /// Trimmed field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.trim())
    }
}

/// Read every row of a headerless delimited file.
///
/// Rows may have differing column counts; callers decide what to do with
/// short rows.
pub fn read_rows(path: &Path, format: &TableFormat) -> Result<Vec<Row>> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let (text, used, had_errors) = format.encoding.decode(&bytes);
    if had_errors {
        tracing::warn!(
            "{} contains byte sequences that are not valid {}; they were replaced",
            path.display(),
            used.name()
        );
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push(Row {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    Ok(rows)
}
