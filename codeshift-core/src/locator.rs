//! Detection of the release tables and the crosswalk inside a release folder.
//!
//! Publishers ship each release as a folder of loosely named files, e.g.
//!
//! ```text
//! 2010/
//! ├── liesmich.txt
//! ├── ops2009syst_kodes.txt
//! ├── ops2010syst_kodes.txt
//! └── ops2010_umsteiger_2009_2010.txt
//! ```
//!
//! The crosswalk is recognized by a marker token in its name; the old and new
//! release tables are told apart by the first four-digit year in their names.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

/// Default tokens marking documentation files that are never analysed.
pub const DEFAULT_README_MARKERS: &[&str] = &["liesmich", "readme"];

/// Default tokens marking the crosswalk file.
pub const DEFAULT_CROSSWALK_MARKERS: &[&str] = &["umsteiger"];

/// Lower-case name tokens used to classify the files of a release folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMarkers {
    pub readme: Vec<String>,
    pub crosswalk: Vec<String>,
}

impl Default for FileMarkers {
    fn default() -> Self {
        Self {
            readme: DEFAULT_README_MARKERS.iter().map(|s| s.to_string()).collect(),
            crosswalk: DEFAULT_CROSSWALK_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FileMarkers {
    fn is_readme(&self, lower_name: &str) -> bool {
        self.readme.iter().any(|m| lower_name.contains(m.as_str()))
    }

    fn is_crosswalk(&self, lower_name: &str) -> bool {
        self.crosswalk
            .iter()
            .any(|m| lower_name.contains(m.as_str()))
    }
}

/// The three input files of one release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFileSet {
    /// Table of the previous release.
    pub old: PathBuf,
    /// Table of the current release.
    pub new: PathBuf,
    /// Crosswalk from old to new codes.
    pub transitions: PathBuf,
    /// Year embedded in the old table's name.
    pub old_year: u32,
    /// Year embedded in the new table's name.
    pub new_year: u32,
}

/// Extract the first four-digit run from a file name.
pub fn year_of(file_name: &str) -> Option<u32> {
    YEAR.find(file_name).and_then(|m| m.as_str().parse().ok())
}

/// Locate old table, new table and crosswalk in `folder`.
///
/// Only regular files directly inside `folder` are considered, in file name
/// order, so the result is independent of directory enumeration order.
pub fn locate(folder: &Path, markers: &FileMarkers) -> Result<VersionFileSet> {
    if !folder.is_dir() {
        return Err(Error::InvalidReleaseDirectory {
            path: folder.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(|e| Error::io(folder, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    files.sort();

    let mut transitions: Option<PathBuf> = None;
    let mut old: Option<(u32, PathBuf)> = None;
    let mut new: Option<(u32, PathBuf)> = None;

    for path in files {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_lowercase(),
            None => continue,
        };

        if markers.is_readme(&name) {
            continue;
        }

        if markers.is_crosswalk(&name) {
            match &transitions {
                None => transitions = Some(path),
                Some(first) => tracing::warn!(
                    "Several transition files in {}; using {} and ignoring {}",
                    folder.display(),
                    first.display(),
                    path.display()
                ),
            }
            continue;
        }

        let Some(year) = year_of(&name) else {
            tracing::debug!("Ignoring undated file {}", path.display());
            continue;
        };

        // Ties keep the first file by name as old and the last one as new.
        if old.as_ref().map_or(true, |(y, _)| year < *y) {
            old = Some((year, path.clone()));
        }
        if new.as_ref().map_or(true, |(y, _)| year >= *y) {
            new = Some((year, path));
        }
    }

    let (Some((old_year, old)), Some((new_year, new))) = (old, new) else {
        return Err(Error::MissingVersionFile {
            path: folder.to_path_buf(),
            message: "could not find version info files".to_string(),
        });
    };

    if old == new {
        return Err(Error::MissingVersionFile {
            path: folder.to_path_buf(),
            message: format!(
                "could only find one version info file but expected two: {}",
                old.display()
            ),
        });
    }

    let transitions = transitions.ok_or_else(|| Error::MissingTransitionFile {
        folder: folder.to_path_buf(),
    })?;

    tracing::info!("Detected old version: {}", file_name(&old));
    tracing::info!("Detected new version: {}", file_name(&new));
    tracing::info!("Detected transition information: {}", file_name(&transitions));

    Ok(VersionFileSet {
        old,
        new,
        transitions,
        old_year,
        new_year,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
