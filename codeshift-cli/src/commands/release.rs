//! Release command - analyse a single release folder
//!
//! Locates the old table, new table and crosswalk in one folder, reconciles
//! them and lists every classified change record.

use crate::config::CodeshiftConfig;
use crate::output::{Column, CsvOutput, Output, OutputConfig, Outputter, TableOutput};
use anyhow::{Context, Result};
use clap::ValueEnum;
use codeshift_core::{
    ChangeRecord, CrosswalkColumns, LexicalChange, MappingAnomaly, Reconciliation, ReleaseConfig,
    SemanticChange, TableFormat, Terminology, TransitionSummary,
};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Semantic categories selectable with `--change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChangeFilter {
    Addition,
    Deletion,
    Replacement,
    Split,
    Merge,
}

impl ChangeFilter {
    fn semantic(self) -> SemanticChange {
        match self {
            ChangeFilter::Addition => SemanticChange::Addition,
            ChangeFilter::Deletion => SemanticChange::Deletion,
            ChangeFilter::Replacement => SemanticChange::Replacement,
            ChangeFilter::Split => SemanticChange::Split,
            ChangeFilter::Merge => SemanticChange::Merge,
        }
    }
}

/// Input layout options of the `release` command.
#[derive(Debug, Clone)]
pub struct ReleaseArgs {
    pub terminology: Option<String>,
    pub delimiter: char,
    pub encoding: String,
    pub old_column: usize,
    pub new_column: usize,
    pub change: Option<ChangeFilter>,
}

/// One classified record, flattened for display.
#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    pub change: SemanticChange,
    pub label_change: LexicalChange,
    pub key: String,
    pub old_codes: Vec<String>,
    pub new_codes: Vec<String>,
    pub old_labels: Vec<String>,
    pub new_labels: Vec<String>,
}

impl RecordRow {
    fn new(change: SemanticChange, record: &ChangeRecord) -> Self {
        Self {
            change,
            label_change: record.lexical_change(),
            key: record.key.clone(),
            old_codes: record.old_codes.iter().cloned().collect(),
            new_codes: record.new_codes.iter().cloned().collect(),
            old_labels: record.old_labels.iter().cloned().collect(),
            new_labels: record.new_labels.iter().cloned().collect(),
        }
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("Change", "change"),
            Column::new("Key", "key"),
            Column::new("Old codes", "old_codes").with_max_width(30),
            Column::new("New codes", "new_codes").with_max_width(30),
            Column::new("Labels", "label_change"),
            Column::new("Old labels", "old_labels").with_max_width(40),
            Column::new("New labels", "new_labels").with_max_width(40),
        ]
    }
}

/// Result of the `release` command.
#[derive(Debug, Serialize)]
pub struct ReleaseReport {
    pub directory: String,
    pub terminology: Terminology,
    pub year: Option<u32>,
    pub old_file: Option<String>,
    pub new_file: Option<String>,
    pub transitions_file: Option<String>,
    pub summary: TransitionSummary,
    pub records: Vec<RecordRow>,
    pub anomalies: Vec<MappingAnomaly>,
    pub duration_ms: f64,
}

impl ReleaseReport {
    fn new(
        directory: &Path,
        terminology: Terminology,
        result: &Reconciliation,
        filter: Option<ChangeFilter>,
    ) -> Self {
        let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());

        let mut records: Vec<RecordRow> = result
            .semantic_lists()
            .iter()
            .flat_map(|(change, list)| list.iter().map(move |r| RecordRow::new(*change, r)))
            .collect();

        // Codes kept unchanged whose label changed appear only in the lexical lists.
        if filter.is_none() {
            let relabelled = result
                .label_additions
                .iter()
                .chain(&result.label_deletions)
                .chain(&result.relabelings)
                .filter(|r| matches!(r.semantic_change(), Ok(SemanticChange::None)));
            records.extend(relabelled.map(|r| RecordRow::new(SemanticChange::None, r)));
        }

        if let Some(filter) = filter {
            records.retain(|r| r.change == filter.semantic());
        }

        Self {
            directory: directory.display().to_string(),
            terminology,
            year: result.year(),
            old_file: result.files.as_ref().and_then(|f| file_name(&f.old)),
            new_file: result.files.as_ref().and_then(|f| file_name(&f.new)),
            transitions_file: result.files.as_ref().and_then(|f| file_name(&f.transitions)),
            summary: result.summary(),
            records,
            anomalies: result.anomalies.clone(),
            duration_ms: result.duration_ms,
        }
    }

    fn summary_pairs(&self) -> Vec<(&'static str, String)> {
        let s = &self.summary;
        vec![
            ("Additions", s.additions.to_string()),
            ("Deletions", s.deletions.to_string()),
            ("Replacements", s.replacements.to_string()),
            ("Splits", s.splits.to_string()),
            ("Merges", s.merges.to_string()),
            ("Label additions", s.label_additions.to_string()),
            ("Label deletions", s.label_deletions.to_string()),
            ("Relabelings", s.relabelings.to_string()),
            ("Unchanged", s.unchanged.to_string()),
        ]
    }
}

impl Outputter for ReleaseReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut lines = Vec::new();

        let title = match self.year {
            Some(year) => format!("{} release {}", self.terminology.as_str().to_uppercase(), year),
            None => format!("{} release", self.terminology.as_str().to_uppercase()),
        };
        lines.push(format!("{}", title.green().bold()));
        lines.push(format!("  {}: {}", "Directory".cyan(), self.directory));
        for (name, file) in [
            ("Old", &self.old_file),
            ("New", &self.new_file),
            ("Crosswalk", &self.transitions_file),
        ] {
            if let Some(file) = file {
                lines.push(format!("  {}: {}", name.cyan(), file));
            }
        }
        lines.push(String::new());

        lines.push(TableOutput::format_key_value(&self.summary_pairs(), config));
        lines.push(String::new());

        lines.push(TableOutput::format_with_columns(
            &self.records,
            &RecordRow::columns(),
            config,
        ));

        if !self.anomalies.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "{}",
                format!("{} crosswalk rows skipped:", self.anomalies.len())
                    .yellow()
                    .bold()
            ));
            for anomaly in &self.anomalies {
                lines.push(format!(
                    "  line {}: {} -> {} ({})",
                    anomaly.line, anomaly.old_code, anomaly.new_code, anomaly.reason
                ));
            }
        }

        lines.push(format!(
            "\n{}",
            format!("({:.1} ms)", self.duration_ms).dimmed()
        ));

        lines.join("\n")
    }

    fn to_csv(&self, config: &OutputConfig) -> String {
        CsvOutput::format_with_columns(&self.records, &RecordRow::columns(), config)
    }
}

/// Terminology for a release folder: explicit name, else the parent folder
/// name, else OPS.
fn resolve_terminology(name: Option<&str>, directory: &Path) -> Result<Terminology> {
    if let Some(name) = name {
        return name
            .parse()
            .with_context(|| format!("Cannot analyse terminology '{}'", name));
    }

    let from_parent = directory
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(|n| n.parse().ok());
    Ok(from_parent.unwrap_or_else(|| {
        tracing::debug!("No terminology given, defaulting to {}", Terminology::Ops);
        Terminology::Ops
    }))
}

/// Run the release command.
pub fn run(
    path: &str,
    args: &ReleaseArgs,
    config: &CodeshiftConfig,
    output: OutputConfig,
) -> Result<()> {
    let directory = Path::new(path)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(path));

    let terminology = resolve_terminology(args.terminology.as_deref(), &directory)?;
    let profile = config.apply_to(terminology.profile());

    let format = TableFormat::from_labels(args.delimiter, &args.encoding)
        .context("Invalid input format")?;
    let columns = CrosswalkColumns::new(args.old_column, args.new_column);
    let release = ReleaseConfig::new(&directory, format, columns);

    let result = Reconciliation::run(&release, &profile)
        .with_context(|| format!("Failed to analyse release {}", directory.display()))?;

    let report = ReleaseReport::new(&directory, terminology, &result, args.change);
    Output::with_config(report, output).render()
}
