//! Code → label tables of a single release.

use std::collections::HashMap;
use std::path::Path;

use crate::delimited::{read_rows, TableFormat};
use crate::error::{Error, Result};

/// Default spellings of the "no such code" value used by publishers.
pub const DEFAULT_UNDEFINED_TOKENS: &[&str] = &["none", "undef", "undefined"];

/// Labels of every code in one release.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    labels: HashMap<String, String>,
    undefined_code: Option<String>,
}

impl LabelTable {
    /// Load a release table: code in the first column, label in the second.
    ///
    /// A code equal (case-insensitively) to one of `undefined_tokens` becomes
    /// the release's undefined-code sentinel. Later rows overwrite earlier
    /// rows with the same code.
    pub fn load(path: &Path, format: &TableFormat, undefined_tokens: &[String]) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingVersionFile {
                path: path.to_path_buf(),
                message: "release table is not a readable file".to_string(),
            });
        }

        let mut table = Self::default();
        for row in read_rows(path, format)? {
            let (Some(code), Some(label)) = (row.field(0), row.field(1)) else {
                tracing::debug!("{}:{}: skipping row without label", path.display(), row.line);
                continue;
            };
            if code.is_empty() {
                tracing::debug!("{}:{}: skipping row without code", path.display(), row.line);
                continue;
            }
            table.insert(code, label, undefined_tokens);
        }

        if table.undefined_code.is_none() {
            tracing::warn!(
                "No undefined-code sentinel found in {}; additions and deletions in the crosswalk will be treated as ordinary codes",
                path.display()
            );
        }
        tracing::debug!("Loaded {} labels from {}", table.len(), path.display());

        Ok(table)
    }

    /// Record one code and its label.
    pub fn insert(&mut self, code: &str, label: &str, undefined_tokens: &[String]) {
        if undefined_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(code))
        {
            self.undefined_code = Some(code.to_string());
        }
        self.labels.insert(code.to_string(), label.to_string());
    }

    /// Label of `code`, if the release defines it.
    pub fn label(&self, code: &str) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// The sentinel code meaning "absent from this release", if one was seen.
    pub fn undefined_code(&self) -> Option<&str> {
        self.undefined_code.as_deref()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The default undefined tokens as owned strings.
pub fn default_undefined_tokens() -> Vec<String> {
    DEFAULT_UNDEFINED_TOKENS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
