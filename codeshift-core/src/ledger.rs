//! Incremental linking of crosswalk rows into change records.
//!
//! Rows are applied strictly in file order. A pair of previously unseen codes
//! starts out as a one-to-one record; when a later row links one of its codes
//! to a further code, the record turns into a split (old code seen again) or a
//! merge (new code seen again). The code on the side that has become
//! ambiguous is evicted from the active index, so that the record can only be
//! extended from its single-code side.
//!
//! Records live in an arena and are addressed by `RecordId`. Besides the two
//! active indices the ledger remembers which record owns each code, which is
//! what lets it reject many-to-many rows instead of counting a code twice.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::crosswalk::CrosswalkRow;
use crate::labels::LabelTable;
use crate::record::ChangeRecord;

/// Stable index of a record in the ledger's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RecordId(usize);

/// A crosswalk row that could not be linked without creating a
/// many-to-many change. The row is skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingAnomaly {
    pub line: u64,
    pub old_code: String,
    pub new_code: String,
    pub reason: String,
}

/// Accumulates change records for one release pair.
#[derive(Debug, Default)]
pub struct ChangeLedger {
    records: Vec<ChangeRecord>,
    by_old: HashMap<String, RecordId>,
    by_new: HashMap<String, RecordId>,
    old_owner: HashMap<String, RecordId>,
    new_owner: HashMap<String, RecordId>,
    old_sentinel: Option<String>,
    new_sentinel: Option<String>,
    anomalies: Vec<MappingAnomaly>,
}

impl ChangeLedger {
    /// Create a ledger for releases whose "no such code" values are the given
    /// sentinels.
    pub fn new(old_sentinel: Option<&str>, new_sentinel: Option<&str>) -> Self {
        Self {
            old_sentinel: old_sentinel.map(str::to_string),
            new_sentinel: new_sentinel.map(str::to_string),
            ..Default::default()
        }
    }

    /// Create a ledger using the sentinels detected in two label tables.
    pub fn for_tables(old: &LabelTable, new: &LabelTable) -> Self {
        Self::new(old.undefined_code(), new.undefined_code())
    }

    /// Apply one crosswalk row.
    pub fn apply(&mut self, row: &CrosswalkRow, old_labels: &LabelTable, new_labels: &LabelTable) {
        let old_code = row.old_code.as_str();
        let new_code = row.new_code.as_str();
        let old_undefined = is_sentinel(self.old_sentinel.as_deref(), old_code);
        let new_undefined = is_sentinel(self.new_sentinel.as_deref(), new_code);

        match (old_undefined, new_undefined) {
            (true, true) => {
                tracing::debug!("Line {}: both codes undefined, skipping", row.line);
            }
            (true, false) => self.add_addition(new_code, new_labels.label(new_code)),
            (false, true) => self.add_deletion(old_code, old_labels.label(old_code)),
            (false, false) => self.link(
                row,
                old_labels.label(old_code),
                new_labels.label(new_code),
            ),
        }
    }

    /// Apply every row in order.
    pub fn apply_all<'a>(
        &mut self,
        rows: impl IntoIterator<Item = &'a CrosswalkRow>,
        old_labels: &LabelTable,
        new_labels: &LabelTable,
    ) {
        for row in rows {
            self.apply(row, old_labels, new_labels);
        }
    }

    fn add_addition(&mut self, new_code: &str, new_label: Option<&str>) {
        let id = match self.new_owner.get(new_code) {
            Some(&id) => id,
            None => {
                let id = self.create(new_code);
                self.index_new(new_code, id);
                id
            }
        };
        let record = &mut self.records[id.0];
        record.add_new_code(new_code);
        record.add_new_label(new_label);
    }

    fn add_deletion(&mut self, old_code: &str, old_label: Option<&str>) {
        let id = match self.old_owner.get(old_code) {
            Some(&id) => id,
            None => {
                let id = self.create(old_code);
                self.index_old(old_code, id);
                id
            }
        };
        let record = &mut self.records[id.0];
        record.add_old_code(old_code);
        record.add_old_label(old_label);
    }

    fn link(&mut self, row: &CrosswalkRow, old_label: Option<&str>, new_label: Option<&str>) {
        let old_code = row.old_code.as_str();
        let new_code = row.new_code.as_str();

        match (self.by_old.get(old_code).copied(), self.by_new.get(new_code).copied()) {
            (None, None) => {
                let old_owner = self.old_owner.get(old_code).copied();
                let new_owner = self.new_owner.get(new_code).copied();
                match (old_owner, new_owner) {
                    (None, None) => {
                        let id = self.create(new_code);
                        self.index_old(old_code, id);
                        self.index_new(new_code, id);
                        let record = &mut self.records[id.0];
                        record.add_old_code(old_code);
                        record.add_old_label(old_label);
                        record.add_new_code(new_code);
                        record.add_new_label(new_label);
                    }
                    (Some(a), Some(b)) if a == b => {}
                    _ => self.anomaly(
                        row,
                        "code already belongs to a resolved split or merge".to_string(),
                    ),
                }
            }
            (Some(id), None) => {
                if self.owned_elsewhere(&self.new_owner, new_code, id) {
                    self.anomaly(
                        row,
                        format!("new code {} already belongs to another change", new_code),
                    );
                    return;
                }
                self.extend_split(id, old_code, new_code, new_label);
            }
            (None, Some(id)) => {
                if self.owned_elsewhere(&self.old_owner, old_code, id) {
                    self.anomaly(
                        row,
                        format!("old code {} already belongs to another change", old_code),
                    );
                    return;
                }
                self.extend_merge(id, old_code, old_label);
            }
            (Some(a), Some(b)) if a == b => {}
            (Some(a), Some(b)) => {
                let reason = format!(
                    "old code belongs to change {} and new code to change {}",
                    self.records[a.0].key, self.records[b.0].key
                );
                self.anomaly(row, reason);
            }
        }
    }

    /// Link a further new code to the record holding the row's old code.
    fn extend_split(
        &mut self,
        id: RecordId,
        old_code: &str,
        new_code: &str,
        new_label: Option<&str>,
    ) {
        match self.records[id.0].new_codes.len() {
            // Pending deletion that turns out to be a replacement.
            0 => {
                self.records[id.0].key = new_code.to_string();
                self.index_new(new_code, id);
            }
            // First evidence of a split: the former new code is no longer a
            // replacement or merge candidate, and the split is reported under
            // its origin.
            1 => {
                let former = self.records[id.0].new_codes.iter().next().cloned();
                if let Some(former) = former {
                    self.by_new.remove(&former);
                }
                self.records[id.0].key = old_code.to_string();
                self.new_owner.insert(new_code.to_string(), id);
            }
            _ => {
                self.new_owner.insert(new_code.to_string(), id);
            }
        }
        let record = &mut self.records[id.0];
        record.add_new_code(new_code);
        record.add_new_label(new_label);
    }

    /// Link a further old code to the record holding the row's new code.
    fn extend_merge(&mut self, id: RecordId, old_code: &str, old_label: Option<&str>) {
        match self.records[id.0].old_codes.len() {
            // Pending addition that turns out to be a replacement.
            0 => self.index_old(old_code, id),
            1 => {
                let former = self.records[id.0].old_codes.iter().next().cloned();
                if let Some(former) = former {
                    self.by_old.remove(&former);
                }
                self.old_owner.insert(old_code.to_string(), id);
            }
            _ => {
                self.old_owner.insert(old_code.to_string(), id);
            }
        }
        let record = &mut self.records[id.0];
        record.add_old_code(old_code);
        record.add_old_label(old_label);
    }

    fn owned_elsewhere(
        &self,
        owners: &HashMap<String, RecordId>,
        code: &str,
        id: RecordId,
    ) -> bool {
        owners.get(code).is_some_and(|&owner| owner != id)
    }

    fn create(&mut self, key: &str) -> RecordId {
        let id = RecordId(self.records.len());
        self.records.push(ChangeRecord::new(key));
        id
    }

    fn index_old(&mut self, code: &str, id: RecordId) {
        self.by_old.insert(code.to_string(), id);
        self.old_owner.insert(code.to_string(), id);
    }

    fn index_new(&mut self, code: &str, id: RecordId) {
        self.by_new.insert(code.to_string(), id);
        self.new_owner.insert(code.to_string(), id);
    }

    fn anomaly(&mut self, row: &CrosswalkRow, reason: String) {
        tracing::warn!(
            "Line {}: cannot link {} -> {}: {}; row skipped",
            row.line,
            row.old_code,
            row.new_code,
            reason
        );
        self.anomalies.push(MappingAnomaly {
            line: row.line,
            old_code: row.old_code.clone(),
            new_code: row.new_code.clone(),
            reason,
        });
    }

    /// All records in creation order.
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.records
    }

    /// Rows skipped as many-to-many conflicts.
    pub fn anomalies(&self) -> &[MappingAnomaly] {
        &self.anomalies
    }

    /// Record currently reachable through the active old-code index.
    pub fn active_by_old(&self, code: &str) -> Option<&ChangeRecord> {
        self.by_old.get(code).map(|id| &self.records[id.0])
    }

    /// Record currently reachable through the active new-code index.
    pub fn active_by_new(&self, code: &str) -> Option<&ChangeRecord> {
        self.by_new.get(code).map(|id| &self.records[id.0])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Crosswalks do not always spell the sentinel the way the release table does.
fn is_sentinel(sentinel: Option<&str>, code: &str) -> bool {
    sentinel.is_some_and(|s| s.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::default_undefined_tokens;
    use crate::record::{LexicalChange, SemanticChange};
    use std::collections::HashSet;

    fn tables(old: &[(&str, &str)], new: &[(&str, &str)]) -> (LabelTable, LabelTable) {
        let tokens = default_undefined_tokens();
        let mut old_table = LabelTable::default();
        let mut new_table = LabelTable::default();
        old_table.insert("UNDEF", "", &tokens);
        new_table.insert("UNDEF", "", &tokens);
        for (code, label) in old {
            old_table.insert(code, label, &tokens);
        }
        for (code, label) in new {
            new_table.insert(code, label, &tokens);
        }
        (old_table, new_table)
    }

    fn run(pairs: &[(&str, &str)]) -> ChangeLedger {
        let (old, new) = tables(&[], &[]);
        run_with(pairs, &old, &new)
    }

    fn run_with(pairs: &[(&str, &str)], old: &LabelTable, new: &LabelTable) -> ChangeLedger {
        let rows: Vec<CrosswalkRow> = pairs
            .iter()
            .enumerate()
            .map(|(i, (o, n))| CrosswalkRow {
                line: i as u64 + 1,
                old_code: o.to_string(),
                new_code: n.to_string(),
            })
            .collect();
        let mut ledger = ChangeLedger::for_tables(old, new);
        ledger.apply_all(&rows, old, new);
        ledger
    }

    fn set(codes: &[&str]) -> std::collections::BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_replacement() {
        let ledger = run(&[("A", "B")]);
        assert_eq!(ledger.len(), 1);
        let record = &ledger.records()[0];
        assert_eq!(record.key, "B");
        assert_eq!(record.semantic_change().unwrap(), SemanticChange::Replacement);
        assert!(ledger.active_by_old("A").is_some());
        assert!(ledger.active_by_new("B").is_some());
    }

    #[test]
    fn test_split() {
        let ledger = run(&[("A", "X"), ("A", "Y")]);
        assert_eq!(ledger.len(), 1);
        let record = &ledger.records()[0];
        assert_eq!(record.key, "A");
        assert_eq!(record.new_codes, set(&["X", "Y"]));
        assert_eq!(record.semantic_change().unwrap(), SemanticChange::Split);
        assert!(ledger.active_by_new("X").is_none());
        assert!(ledger.active_by_old("A").is_some());
    }

    #[test]
    fn test_three_way_split() {
        let ledger = run(&[("A", "X"), ("A", "Y"), ("A", "Z")]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0].new_codes, set(&["X", "Y", "Z"]));
        assert_eq!(ledger.records()[0].key, "A");
    }

    #[test]
    fn test_merge() {
        let ledger = run(&[("A", "Z"), ("B", "Z")]);
        assert_eq!(ledger.len(), 1);
        let record = &ledger.records()[0];
        assert_eq!(record.key, "Z");
        assert_eq!(record.old_codes, set(&["A", "B"]));
        assert_eq!(record.semantic_change().unwrap(), SemanticChange::Merge);
        assert!(ledger.active_by_old("A").is_none());
        assert!(ledger.active_by_new("Z").is_some());
    }

    #[test]
    fn test_addition_and_deletion() {
        let ledger = run(&[("UNDEF", "N"), ("O", "UNDEF")]);
        assert_eq!(ledger.len(), 2);

        let addition = &ledger.records()[0];
        assert_eq!(addition.key, "N");
        assert_eq!(addition.new_codes, set(&["N"]));
        assert_eq!(addition.semantic_change().unwrap(), SemanticChange::Addition);

        let deletion = &ledger.records()[1];
        assert_eq!(deletion.key, "O");
        assert_eq!(deletion.semantic_change().unwrap(), SemanticChange::Deletion);
    }

    #[test]
    fn test_both_undefined_ignored() {
        let ledger = run(&[("UNDEF", "UNDEF")]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_sentinel_spelling_ignores_case() {
        let ledger = run(&[("undef", "N"), ("O", "Undef")]);
        assert_eq!(ledger.len(), 2);

        let addition = &ledger.records()[0];
        assert_eq!(addition.semantic_change().unwrap(), SemanticChange::Addition);
        assert!(addition.old_codes.is_empty());

        let deletion = &ledger.records()[1];
        assert_eq!(deletion.semantic_change().unwrap(), SemanticChange::Deletion);
        assert!(deletion.new_codes.is_empty());
    }

    #[test]
    fn test_unchanged_code() {
        let ledger = run(&[("A", "A")]);
        assert_eq!(
            ledger.records()[0].semantic_change().unwrap(),
            SemanticChange::None
        );
    }

    #[test]
    fn test_duplicate_rows_are_idempotent() {
        let ledger = run(&[("A", "X"), ("A", "X"), ("A", "Y"), ("A", "X")]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.anomalies().is_empty());
        assert_eq!(ledger.records()[0].new_codes, set(&["X", "Y"]));

        let ledger = run(&[("A", "Z"), ("B", "Z"), ("A", "Z")]);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.anomalies().is_empty());
    }

    #[test]
    fn test_conflicting_records_are_anomalous() {
        // A -> X and B -> Y are distinct replacements; A -> Y would join them.
        let ledger = run(&[("A", "X"), ("B", "Y"), ("A", "Y")]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.anomalies().len(), 1);
        let anomaly = &ledger.anomalies()[0];
        assert_eq!(anomaly.line, 3);
        assert_eq!(anomaly.old_code, "A");
        assert_eq!(anomaly.new_code, "Y");
        for record in ledger.records() {
            assert_eq!(
                record.semantic_change().unwrap(),
                SemanticChange::Replacement
            );
        }
    }

    #[test]
    fn test_many_to_many_after_split_is_anomalous() {
        // X is a split target of A; linking B to X would make it many-to-many.
        let ledger = run(&[("A", "X"), ("A", "Y"), ("B", "X")]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.anomalies().len(), 1);
        assert_eq!(
            ledger.records()[0].semantic_change().unwrap(),
            SemanticChange::Split
        );
    }

    #[test]
    fn test_many_to_many_after_merge_is_anomalous() {
        let ledger = run(&[("A", "Z"), ("B", "Z"), ("A", "W")]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.anomalies().len(), 1);
        assert_eq!(
            ledger.records()[0].semantic_change().unwrap(),
            SemanticChange::Merge
        );
    }

    #[test]
    fn test_split_target_reached_from_other_old_code() {
        // Y is added to A's split; a later row from B to Y conflicts with it.
        let ledger = run(&[("A", "X"), ("A", "Y"), ("B", "C"), ("B", "Y")]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.anomalies().len(), 1);
        assert_eq!(ledger.records()[0].new_codes, set(&["X", "Y"]));
        assert_eq!(ledger.records()[1].new_codes, set(&["C"]));
    }

    #[test]
    fn test_pending_deletion_upgraded_to_replacement() {
        let ledger = run(&[("A", "UNDEF"), ("A", "B")]);
        assert_eq!(ledger.len(), 1);
        let record = &ledger.records()[0];
        assert_eq!(record.key, "B");
        assert_eq!(record.semantic_change().unwrap(), SemanticChange::Replacement);
        assert!(ledger.active_by_new("B").is_some());
    }

    #[test]
    fn test_pending_addition_upgraded_to_replacement() {
        let ledger = run(&[("UNDEF", "B"), ("A", "B")]);
        assert_eq!(ledger.len(), 1);
        let record = &ledger.records()[0];
        assert_eq!(record.key, "B");
        assert_eq!(record.semantic_change().unwrap(), SemanticChange::Replacement);
        assert!(ledger.active_by_old("A").is_some());
    }

    #[test]
    fn test_addition_of_linked_code_does_not_duplicate() {
        let ledger = run(&[("A", "X"), ("A", "Y"), ("UNDEF", "X")]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.records()[0].semantic_change().unwrap(),
            SemanticChange::Split
        );
    }

    #[test]
    fn test_labels_collected() {
        let (old, new) = tables(
            &[("A", "Appendektomie"), ("B", "Cholezystektomie")],
            &[("Z", "Appendektomie"), ("N", "Neu")],
        );
        let ledger = run_with(&[("A", "Z"), ("B", "Z"), ("UNDEF", "N")], &old, &new);

        let merge = &ledger.records()[0];
        assert_eq!(merge.old_labels, set(&["Appendektomie", "Cholezystektomie"]));
        assert_eq!(merge.new_labels, set(&["Appendektomie"]));
        assert_eq!(merge.lexical_change(), LexicalChange::LabelDeletion);

        let addition = &ledger.records()[1];
        assert_eq!(addition.lexical_change(), LexicalChange::LabelAddition);
    }

    #[test]
    fn test_without_sentinel_undef_is_an_ordinary_code() {
        let empty = LabelTable::default();
        let ledger = run_with(&[("UNDEF", "N1"), ("UNDEF", "N2")], &empty, &empty);
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.records()[0].semantic_change().unwrap(),
            SemanticChange::Split
        );
    }

    #[test]
    fn test_no_code_in_two_records() {
        let pairs = [
            ("A", "X"),
            ("A", "Y"),
            ("B", "Z"),
            ("C", "Z"),
            ("D", "E"),
            ("UNDEF", "F"),
            ("G", "UNDEF"),
            ("B", "Y"),
            ("H", "Z"),
            ("D", "X"),
            ("I", "I"),
        ];
        let ledger = run(&pairs);

        let mut old_seen = HashSet::new();
        let mut new_seen = HashSet::new();
        for record in ledger.records() {
            for code in &record.old_codes {
                assert!(old_seen.insert(code.clone()), "old code {} counted twice", code);
            }
            for code in &record.new_codes {
                assert!(new_seen.insert(code.clone()), "new code {} counted twice", code);
            }
            assert!(record.semantic_change().is_ok(), "record {:?}", record);
        }
    }
}
