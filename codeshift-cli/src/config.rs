//! Codeshift configuration loading from `.codeshiftrc.toml`.
//!
//! The file is optional and usually sits in a terminology root folder next to
//! `properties.csv`. It is looked up in the analysed folder and then in its
//! ancestors, so a release folder picks up the settings of its terminology.
//!
//! # Example Configuration
//!
//! ```toml
//! [locator]
//! readme_markers = ["liesmich", "readme", "hinweise"]
//! crosswalk_markers = ["umsteiger", "ueberleitung"]
//!
//! [labels]
//! undefined_tokens = ["undef", "none", "leer"]
//!
//! [output]
//! format = "table"
//! color = true
//! compact = false
//! width = 160
//!
//! [batch]
//! parallel = false
//! ```

use codeshift_core::TerminologyProfile;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up in the analysed folder and its ancestors.
pub const CONFIG_FILE_NAME: &str = ".codeshiftrc.toml";

/// Root configuration structure loaded from `.codeshiftrc.toml`.
///
/// All sections are optional and will use defaults if not specified.
#[derive(Debug, Deserialize, Default)]
pub struct CodeshiftConfig {
    /// File name markers for locating release files.
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Label table settings.
    #[serde(default)]
    pub labels: LabelsConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Batch run settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Overrides for the terminology's file name markers.
///
/// An empty or missing list keeps the terminology default.
#[derive(Debug, Deserialize, Default)]
pub struct LocatorConfig {
    /// Substrings marking read-me files, which are never release tables.
    #[serde(default)]
    pub readme_markers: Vec<String>,

    /// Substrings marking the crosswalk file.
    #[serde(default)]
    pub crosswalk_markers: Vec<String>,
}

/// Overrides for label table loading.
#[derive(Debug, Deserialize, Default)]
pub struct LabelsConfig {
    /// Codes recognised (case-insensitively) as the "no such code" sentinel.
    #[serde(default)]
    pub undefined_tokens: Vec<String>,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table`, `json` or `csv`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output.
    ///
    /// Defaults to `true` when stdout is a TTY.
    #[serde(default)]
    pub color: Option<bool>,

    /// Borderless tables and single-line JSON.
    #[serde(default)]
    pub compact: bool,

    /// Fixed table width instead of the terminal width.
    #[serde(default)]
    pub width: Option<usize>,
}

/// Batch run settings.
#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    /// Analyse release folders in parallel.
    ///
    /// Default: `true`
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl CodeshiftConfig {
    /// Load the nearest `.codeshiftrc.toml` in `start` or one of its ancestors.
    ///
    /// If no file is found or it can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn discover(start: &Path) -> Self {
        match find_config(start) {
            Some(path) => {
                tracing::debug!("Using configuration {}", path.display());
                Self::load_file(&path)
            }
            None => Self::default(),
        }
    }

    fn load_file(config_path: &Path) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", config_path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", config_path.display(), e);
            }
        }
        Self::default()
    }

    /// Apply the configured overrides to a terminology profile.
    pub fn apply_to(&self, mut profile: TerminologyProfile) -> TerminologyProfile {
        if !self.locator.readme_markers.is_empty() {
            profile.markers.readme = lowercase(&self.locator.readme_markers);
        }
        if !self.locator.crosswalk_markers.is_empty() {
            profile.markers.crosswalk = lowercase(&self.locator.crosswalk_markers);
        }
        if !self.labels.undefined_tokens.is_empty() {
            profile.undefined_tokens = self.labels.undefined_tokens.clone();
        }
        profile
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Check if colored output should be used.
    ///
    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    /// Whether compact output is configured.
    pub fn compact(&self) -> bool {
        self.output.compact
    }

    /// Configured table width, if any.
    pub fn width(&self) -> Option<usize> {
        self.output.width
    }

    /// Whether batch runs may analyse releases in parallel.
    pub fn parallel(&self) -> bool {
        self.batch.parallel
    }
}

fn lowercase(markers: &[String]) -> Vec<String> {
    markers.iter().map(|m| m.to_lowercase()).collect()
}

fn find_config(start: &Path) -> Option<PathBuf> {
    let start = start
        .canonicalize()
        .unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}
