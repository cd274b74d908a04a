//! Reconciliation of one release folder.
//!
//! Locates the input files, loads both label tables, runs every crosswalk row
//! through a fresh [`ChangeLedger`] and sorts the resulting records into the
//! semantic and lexical category lists.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::crosswalk::{read_crosswalk, CrosswalkColumns};
use crate::delimited::TableFormat;
use crate::error::Result;
use crate::labels::LabelTable;
use crate::ledger::{ChangeLedger, MappingAnomaly};
use crate::locator::{locate, VersionFileSet};
use crate::record::{ChangeRecord, LexicalChange, SemanticChange};
use crate::terminology::TerminologyProfile;

/// Input settings of one release folder.
#[derive(Clone, Debug)]
pub struct ReleaseConfig {
    pub directory: PathBuf,
    pub format: TableFormat,
    pub columns: CrosswalkColumns,
}

impl ReleaseConfig {
    pub fn new(directory: impl Into<PathBuf>, format: TableFormat, columns: CrosswalkColumns) -> Self {
        Self {
            directory: directory.into(),
            format,
            columns,
        }
    }
}

/// Number of records per category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSummary {
    pub additions: usize,
    pub deletions: usize,
    pub replacements: usize,
    pub splits: usize,
    pub merges: usize,
    pub label_additions: usize,
    pub label_deletions: usize,
    pub relabelings: usize,
    pub unchanged: usize,
    pub anomalies: usize,
}

/// Classified changes between two releases.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Reconciliation {
    pub files: Option<VersionFileSet>,
    pub additions: Vec<ChangeRecord>,
    pub deletions: Vec<ChangeRecord>,
    pub replacements: Vec<ChangeRecord>,
    pub splits: Vec<ChangeRecord>,
    pub merges: Vec<ChangeRecord>,
    pub label_additions: Vec<ChangeRecord>,
    pub label_deletions: Vec<ChangeRecord>,
    pub relabelings: Vec<ChangeRecord>,
    /// Records without semantic or lexical change.
    pub unchanged: usize,
    pub anomalies: Vec<MappingAnomaly>,
    pub duration_ms: f64,
}

impl Reconciliation {
    /// Analyse the release folder described by `config`.
    pub fn run(config: &ReleaseConfig, profile: &TerminologyProfile) -> Result<Self> {
        let start = Instant::now();
        tracing::info!("Scanning directory {} for files...", config.directory.display());

        let files = locate(&config.directory, &profile.markers)?;
        let old_labels = LabelTable::load(&files.old, &config.format, &profile.undefined_tokens)?;
        let new_labels = LabelTable::load(&files.new, &config.format, &profile.undefined_tokens)?;
        let rows = read_crosswalk(&files.transitions, &config.format, config.columns)?;

        let mut ledger = ChangeLedger::for_tables(&old_labels, &new_labels);
        ledger.apply_all(&rows, &old_labels, &new_labels);
        let anomalies = ledger.anomalies().to_vec();

        let mut result = Self::from_records(ledger.into_records())?;
        result.files = Some(files);
        result.anomalies = anomalies;
        result.duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            "Reconciled {} in {:.1}ms: {} records, {} anomalies",
            config.directory.display(),
            result.duration_ms,
            result.record_count(),
            result.anomalies.len()
        );
        Ok(result)
    }

    /// Sort finished records into category lists, keeping their order.
    ///
    /// Fails on the first record whose code sets cannot be classified.
    pub fn from_records(records: Vec<ChangeRecord>) -> Result<Self> {
        let mut result = Self::default();
        for record in records {
            result.add(record)?;
        }
        Ok(result)
    }

    fn add(&mut self, record: ChangeRecord) -> Result<()> {
        let semantic = record.semantic_change()?;
        let lexical = record.lexical_change();

        if semantic == SemanticChange::None && lexical == LexicalChange::None {
            self.unchanged += 1;
            return Ok(());
        }

        match lexical {
            LexicalChange::LabelAddition => self.label_additions.push(record.clone()),
            LexicalChange::LabelDeletion => self.label_deletions.push(record.clone()),
            LexicalChange::LabelReplacement => self.relabelings.push(record.clone()),
            LexicalChange::None => {}
        }

        match semantic {
            SemanticChange::Addition => self.additions.push(record),
            SemanticChange::Deletion => self.deletions.push(record),
            SemanticChange::Replacement => self.replacements.push(record),
            SemanticChange::Split => self.splits.push(record),
            SemanticChange::Merge => self.merges.push(record),
            SemanticChange::None => {}
        }
        Ok(())
    }

    /// Records in any semantic category.
    pub fn record_count(&self) -> usize {
        self.additions.len()
            + self.deletions.len()
            + self.replacements.len()
            + self.splits.len()
            + self.merges.len()
    }

    pub fn summary(&self) -> TransitionSummary {
        TransitionSummary {
            additions: self.additions.len(),
            deletions: self.deletions.len(),
            replacements: self.replacements.len(),
            splits: self.splits.len(),
            merges: self.merges.len(),
            label_additions: self.label_additions.len(),
            label_deletions: self.label_deletions.len(),
            relabelings: self.relabelings.len(),
            unchanged: self.unchanged,
            anomalies: self.anomalies.len(),
        }
    }

    /// Year of the newer release, when the files were located from a folder.
    pub fn year(&self) -> Option<u32> {
        self.files.as_ref().map(|f| f.new_year)
    }

    /// Semantic category lists with their names, in report order.
    pub fn semantic_lists(&self) -> [(SemanticChange, &[ChangeRecord]); 5] {
        [
            (SemanticChange::Addition, self.additions.as_slice()),
            (SemanticChange::Deletion, self.deletions.as_slice()),
            (SemanticChange::Replacement, self.replacements.as_slice()),
            (SemanticChange::Split, self.splits.as_slice()),
            (SemanticChange::Merge, self.merges.as_slice()),
        ]
    }
}
