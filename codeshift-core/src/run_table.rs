//! The batch run table, `properties.csv`.
//!
//! Publishers change file layouts from year to year, so every release folder
//! of a terminology gets its own row:
//!
//! ```text
//! path,separator,encoding,columns
//! 2009,;,ISO-8859-1,"code_old;code_new"
//! 2010,;,UTF-8,"auto;code_old;code_new;auto"
//! ```
//!
//! `columns` is itself a delimited list, split with that row's separator; the
//! positions of `code_old` and `code_new` select the crosswalk columns.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crosswalk::{CrosswalkColumns, CODE_NEW, CODE_OLD};
use crate::delimited::TableFormat;
use crate::error::{Error, Result};
use crate::reconcile::ReleaseConfig;

/// File name of the run table inside a terminology root folder.
pub const RUN_TABLE_FILE_NAME: &str = "properties.csv";

#[derive(Debug, Deserialize)]
struct RunTableRow {
    path: String,
    separator: String,
    encoding: String,
    columns: String,
}

/// Read the run table at `root/properties.csv`, resolving release paths
/// against `root`. Rows keep file order.
pub fn load_run_table(root: &Path) -> Result<Vec<ReleaseConfig>> {
    let path = root.join(RUN_TABLE_FILE_NAME);
    if !path.is_file() {
        return Err(Error::InvalidRunTable {
            path,
            message: format!("{} not found", RUN_TABLE_FILE_NAME),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(&path)
        .map_err(|e| Error::csv(&path, e))?;

    let mut releases = Vec::new();
    for (index, row) in reader.deserialize::<RunTableRow>().enumerate() {
        let row = row.map_err(|e| Error::csv(&path, e))?;
        let release = release_config(root, &row).map_err(|message| Error::InvalidRunTable {
            path: path.clone(),
            message: format!("row {}: {}", index + 1, message),
        })?;
        releases.push(release);
    }

    tracing::debug!("Loaded {} releases from {}", releases.len(), path.display());
    Ok(releases)
}

fn release_config(root: &Path, row: &RunTableRow) -> std::result::Result<ReleaseConfig, String> {
    let mut chars = row.separator.chars();
    let separator = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(format!("separator must be one character, got '{}'", row.separator)),
    };

    let format = TableFormat::from_labels(separator, &row.encoding).map_err(|e| e.to_string())?;
    let columns = parse_columns(&row.columns, format.delimiter)?;
    let directory: PathBuf = root.join(row.path.trim());

    Ok(ReleaseConfig::new(directory, format, columns))
}

fn parse_columns(raw: &str, delimiter: u8) -> std::result::Result<CrosswalkColumns, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_reader(raw.as_bytes());

    let names: Vec<String> = match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        Some(Err(e)) => return Err(format!("cannot parse column list: {}", e)),
        None => Vec::new(),
    };

    CrosswalkColumns::from_names(&names).ok_or_else(|| {
        format!(
            "column list '{}' must name both {} and {}",
            raw, CODE_OLD, CODE_NEW
        )
    })
}
