//! Reading (old code, new code) pairs from a crosswalk file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::delimited::{read_rows, TableFormat};
use crate::error::{Error, Result};

/// Name of the old-code column in a run table's column list.
pub const CODE_OLD: &str = "code_old";
/// Name of the new-code column in a run table's column list.
pub const CODE_NEW: &str = "code_new";

/// Zero-based positions of the code columns in a crosswalk file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswalkColumns {
    pub old_code: usize,
    pub new_code: usize,
}

impl CrosswalkColumns {
    pub fn new(old_code: usize, new_code: usize) -> Self {
        Self { old_code, new_code }
    }

    /// Resolve positions from a list of column names containing
    /// [`CODE_OLD`] and [`CODE_NEW`].
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        let position = |wanted: &str| names.iter().position(|n| n.as_ref().trim() == wanted);
        Some(Self::new(position(CODE_OLD)?, position(CODE_NEW)?))
    }

    fn width(&self) -> usize {
        self.old_code.max(self.new_code) + 1
    }
}

impl Default for CrosswalkColumns {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

/// One pair of the crosswalk, in file order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswalkRow {
    pub line: u64,
    pub old_code: String,
    pub new_code: String,
}

impl CrosswalkRow {
    pub fn new(old_code: impl Into<String>, new_code: impl Into<String>) -> Self {
        Self {
            line: 0,
            old_code: old_code.into(),
            new_code: new_code.into(),
        }
    }
}

/// Read the crosswalk at `path`, keeping row order.
///
/// Fails with [`Error::MalformedRow`] on the first row that does not reach
/// both configured columns.
pub fn read_crosswalk(
    path: &Path,
    format: &TableFormat,
    columns: CrosswalkColumns,
) -> Result<Vec<CrosswalkRow>> {
    let mut pairs = Vec::new();
    for row in read_rows(path, format)? {
        let (Some(old_code), Some(new_code)) =
            (row.field(columns.old_code), row.field(columns.new_code))
        else {
            return Err(Error::MalformedRow {
                path: path.to_path_buf(),
                line: row.line,
                expected: columns.width(),
                found: row.fields.len(),
            });
        };

        if old_code.is_empty() || new_code.is_empty() {
            tracing::debug!("{}:{}: skipping row with empty code", path.display(), row.line);
            continue;
        }

        pairs.push(CrosswalkRow {
            line: row.line,
            old_code: old_code.to_string(),
            new_code: new_code.to_string(),
        });
    }

    tracing::debug!("Read {} crosswalk rows from {}", pairs.len(), path.display());
    Ok(pairs)
}
