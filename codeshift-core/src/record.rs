//! Change records and their semantic / lexical classification.
//!
//! A [`ChangeRecord`] collects every old and new code linked by the crosswalk
//! into one logical change, together with the labels of those codes. The
//! category of the change is derived from the final sets only, so it can be
//! computed any number of times once the ledger is done.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of change in code identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticChange {
    Addition,
    Deletion,
    Replacement,
    Split,
    Merge,
    None,
}

impl SemanticChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticChange::Addition => "addition",
            SemanticChange::Deletion => "deletion",
            SemanticChange::Replacement => "replacement",
            SemanticChange::Split => "split",
            SemanticChange::Merge => "merge",
            SemanticChange::None => "none",
        }
    }
}

/// Kind of change in the display texts of the linked codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalChange {
    LabelAddition,
    LabelDeletion,
    LabelReplacement,
    None,
}

impl LexicalChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            LexicalChange::LabelAddition => "label_addition",
            LexicalChange::LabelDeletion => "label_deletion",
            LexicalChange::LabelReplacement => "label_replacement",
            LexicalChange::None => "none",
        }
    }
}

/// One logical change between two releases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// New code for additions, replacements and merges; old code for
    /// deletions and splits.
    pub key: String,

    /// Codes of the old release linked to this change.
    pub old_codes: BTreeSet<String>,

    /// Codes of the new release linked to this change.
    pub new_codes: BTreeSet<String>,

    /// Labels of the linked old codes.
    pub old_labels: BTreeSet<String>,

    /// Labels of the linked new codes.
    pub new_labels: BTreeSet<String>,
}

impl ChangeRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn add_old_code(&mut self, code: &str) {
        self.old_codes.insert(code.to_string());
    }

    pub fn add_new_code(&mut self, code: &str) {
        self.new_codes.insert(code.to_string());
    }

    /// Add an old label; absent labels are ignored.
    pub fn add_old_label(&mut self, label: Option<&str>) {
        if let Some(label) = label {
            self.old_labels.insert(label.to_string());
        }
    }

    /// Add a new label; absent labels are ignored.
    pub fn add_new_label(&mut self, label: Option<&str>) {
        if let Some(label) = label {
            self.new_labels.insert(label.to_string());
        }
    }

    pub fn contains_old_code(&self, code: &str) -> bool {
        self.old_codes.contains(code)
    }

    pub fn contains_new_code(&self, code: &str) -> bool {
        self.new_codes.contains(code)
    }

    /// Classify the change in code identity.
    ///
    /// A one-to-one record is only reported as a replacement when keyed by its
    /// new code, so each replacement is counted once.
    pub fn semantic_change(&self) -> Result<SemanticChange> {
        let old = self.old_codes.len();
        let new = self.new_codes.len();

        if self.old_codes == self.new_codes {
            if new != 1 {
                return Err(self.violation(format!(
                    "number of mappings expected to be 1 but was {}",
                    new
                )));
            }
            return Ok(SemanticChange::None);
        }

        match (old, new) {
            (1, 0) if self.contains_old_code(&self.key) => Ok(SemanticChange::Deletion),
            (0, 1) if self.contains_new_code(&self.key) => Ok(SemanticChange::Addition),
            (1, 0) | (0, 1) => {
                Err(self.violation("change set must contain its own code but does not".to_string()))
            }
            (1, 1) if self.contains_new_code(&self.key) => Ok(SemanticChange::Replacement),
            (1, n) if n > 1 => Ok(SemanticChange::Split),
            (n, 1) if n > 1 => Ok(SemanticChange::Merge),
            _ => {
                tracing::error!(
                    "Unclassifiable change record {}: old {:?}, new {:?}",
                    self.key,
                    self.old_codes,
                    self.new_codes
                );
                Err(self.violation("unexpected combination of old and new codes".to_string()))
            }
        }
    }

    /// Classify the change in labels.
    pub fn lexical_change(&self) -> LexicalChange {
        if self.old_labels == self.new_labels {
            return LexicalChange::None;
        }

        let added = self.new_labels.difference(&self.old_labels).next().is_some();
        let deleted = self.old_labels.difference(&self.new_labels).next().is_some();

        match (added, deleted) {
            (false, true) => LexicalChange::LabelDeletion,
            (true, false) => LexicalChange::LabelAddition,
            _ => LexicalChange::LabelReplacement,
        }
    }

    fn violation(&self, message: String) -> Error {
        Error::InvariantViolation {
            key: self.key.clone(),
            message,
            old_codes: self.old_codes.iter().cloned().collect(),
            new_codes: self.new_codes.iter().cloned().collect(),
        }
    }
}
