//! Batch command - analyse every release of a terminology
//!
//! Reads `properties.csv` from the terminology root folder, reconciles each
//! listed release and writes the yearly counts to `eval_<root>.csv`.

use crate::config::CodeshiftConfig;
use crate::output::{Alignment, Column, Output, OutputConfig, Outputter, TableOutput};
use anyhow::{bail, Context, Result};
use codeshift_core::report::render_report;
use codeshift_core::{
    report_path, run_batch, terminology_from_root, write_report, BatchRun, ReportRow, Terminology,
};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A release that could not be analysed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedRelease {
    pub directory: String,
    pub error: String,
}

/// Result of the `batch` command.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub root: String,
    pub terminology: Terminology,
    pub report_file: String,
    pub rows: Vec<ReportRow>,
    pub failures: Vec<FailedRelease>,
    pub duration_ms: f64,
}

impl BatchReport {
    fn new(run: &BatchRun, terminology: Terminology, report_file: &Path) -> Self {
        Self {
            root: run.root.display().to_string(),
            terminology,
            report_file: report_file.display().to_string(),
            rows: run.report_rows(),
            failures: run
                .failures()
                .map(|(dir, err)| FailedRelease {
                    directory: dir.display().to_string(),
                    error: err.to_string(),
                })
                .collect(),
            duration_ms: run.duration_ms,
        }
    }

    fn columns() -> Vec<Column> {
        let count = |name: &str, key: &str| Column::new(name, key).with_alignment(Alignment::Right);
        vec![
            Column::new("Year", "year"),
            count("Additions", "additions"),
            count("Deletions", "deletions"),
            count("Replacements", "replacements"),
            count("Splits", "splits"),
            count("Merges", "merges"),
            count("Label add.", "label_additions"),
            count("Label del.", "label_deletions"),
            count("Relabelings", "relabelings"),
        ]
    }
}

impl Outputter for BatchReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{}",
            format!(
                "{} batch: {} releases",
                self.terminology.as_str().to_uppercase(),
                self.rows.len() + self.failures.len()
            )
            .green()
            .bold()
        ));
        lines.push(format!("  {}: {}", "Root".cyan(), self.root));
        lines.push(format!("  {}: {}", "Report".cyan(), self.report_file));
        lines.push(String::new());

        lines.push(TableOutput::format_with_columns(
            &self.rows,
            &Self::columns(),
            config,
        ));

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "{}",
                format!("{} releases failed:", self.failures.len()).red().bold()
            ));
            for failure in &self.failures {
                lines.push(format!("  {}: {}", failure.directory, failure.error));
            }
        }

        lines.push(format!(
            "\n{}",
            format!("({:.1} ms)", self.duration_ms).dimmed()
        ));

        lines.join("\n")
    }

    /// Same layout as the report file.
    fn to_csv(&self, _config: &OutputConfig) -> String {
        render_report(&self.rows).trim_end().to_string()
    }
}

/// Options of the `batch` command.
#[derive(Debug, Clone)]
pub struct BatchArgs {
    pub terminology: Option<String>,
    pub output: Option<String>,
    pub sequential: bool,
}

/// Run the batch command.
///
/// Fails only when the run table cannot be read or no release succeeded;
/// individual failures are listed in the output.
pub fn run(
    path: &str,
    args: &BatchArgs,
    config: &CodeshiftConfig,
    output: OutputConfig,
) -> Result<()> {
    let root = Path::new(path)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(path));

    let terminology = match args.terminology.as_deref() {
        Some(name) => name.parse::<Terminology>(),
        None => terminology_from_root(&root),
    }
    .context("Cannot determine terminology; pass --terminology")?;
    let profile = config.apply_to(terminology.profile());
    let parallel = !args.sequential && config.parallel();

    let batch = run_batch(&root, &profile, parallel)
        .with_context(|| format!("Failed to run batch in {}", root.display()))?;

    let report_file = args
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| report_path(&root));
    let rows = batch.report_rows();
    write_report(&report_file, &rows).context("Failed to write report")?;

    let report = BatchReport::new(&batch, terminology, &report_file);
    Output::with_config(report, output).render()?;

    if !batch.outcomes.is_empty() && batch.succeeded() == 0 {
        bail!("All {} releases failed", batch.outcomes.len());
    }
    Ok(())
}
