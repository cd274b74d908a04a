//! Error types for codeshift-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codeshift-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort the analysis of a release.
///
/// Each variant names the file or folder it concerns so that a batch run can
/// report which release failed. Non-fatal crosswalk conflicts are not errors;
/// see [`crate::ledger::MappingAnomaly`].
#[derive(Error, Debug)]
pub enum Error {
    /// The old or new release table could not be located or opened.
    #[error("Missing version file in {}: {message}", path.display())]
    MissingVersionFile {
        /// Release folder or file that was inspected.
        path: PathBuf,
        /// What was missing.
        message: String,
    },

    /// No crosswalk file was found in the release folder.
    #[error("Missing transition file in {}", folder.display())]
    MissingTransitionFile {
        /// Release folder that was scanned.
        folder: PathBuf,
    },

    /// The release path does not exist or is not a directory.
    #[error("Release directory does not exist or is not a directory: {}", path.display())]
    InvalidReleaseDirectory {
        /// Path that was given.
        path: PathBuf,
    },

    /// IO error while reading or writing a file.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File the operation was performed on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Delimited file could not be parsed.
    #[error("Failed to parse {}: {source}", path.display())]
    Csv {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// A crosswalk row lacks one of the configured columns.
    #[error("Malformed row {line} in {}: expected at least {expected} columns, found {found}", path.display())]
    MalformedRow {
        /// Crosswalk file.
        path: PathBuf,
        /// One-based line number of the row.
        line: u64,
        /// Number of columns required by the column mapping.
        expected: usize,
        /// Number of columns present.
        found: usize,
    },

    /// Encoding label not known to `encoding_rs`.
    #[error("Unknown text encoding: {label}")]
    UnknownEncoding {
        /// Label as configured.
        label: String,
    },

    /// Field delimiter that cannot be used for byte-oriented parsing.
    #[error("Invalid field delimiter '{delimiter}': must be a single ASCII character")]
    InvalidDelimiter {
        /// Delimiter as configured.
        delimiter: char,
    },

    /// The batch run table is missing or has an invalid row.
    #[error("Invalid run table {}: {message}", path.display())]
    InvalidRunTable {
        /// Run table file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// No analyser is registered for the terminology name.
    #[error("Unknown terminology: {name}")]
    UnknownTerminology {
        /// Name that was looked up.
        name: String,
    },

    /// A change record reached a code/set combination the classifier cannot explain.
    ///
    /// This indicates a bug in record construction rather than bad input, so it
    /// is never silently coerced into a category.
    #[error("Invariant violation for record {key}: {message} (old: {old_codes:?}, new: {new_codes:?})")]
    InvariantViolation {
        /// Key of the offending record.
        key: String,
        /// What went wrong.
        message: String,
        /// Old-side codes of the record.
        old_codes: Vec<String>,
        /// New-side codes of the record.
        new_codes: Vec<String>,
    },
}

impl Error {
    /// Build an [`Error::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an [`Error::Csv`] for `path`.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only concerns locating the input files of a release.
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            Error::MissingVersionFile { .. }
                | Error::MissingTransitionFile { .. }
                | Error::InvalidReleaseDirectory { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingTransitionFile {
            folder: PathBuf::from("/data/ops/2010"),
        };
        assert!(err.to_string().contains("/data/ops/2010"));

        let err = Error::MalformedRow {
            path: PathBuf::from("umsteiger.txt"),
            line: 12,
            expected: 4,
            found: 2,
        };
        let message = err.to_string();
        assert!(message.contains("umsteiger.txt"));
        assert!(message.contains("12"));
        assert!(message.contains('4'));
    }

    #[test]
    fn test_invariant_violation_lists_sets() {
        let err = Error::InvariantViolation {
            key: "A".to_string(),
            message: "unexpected combination".to_string(),
            old_codes: vec!["A".to_string(), "B".to_string()],
            new_codes: vec!["X".to_string(), "Y".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("\"B\""));
        assert!(message.contains("\"Y\""));
    }

    #[test]
    fn test_is_missing_input() {
        assert!(Error::MissingTransitionFile {
            folder: PathBuf::from("x")
        }
        .is_missing_input());
        assert!(!Error::UnknownEncoding {
            label: "klingon".to_string()
        }
        .is_missing_input());
    }
}
