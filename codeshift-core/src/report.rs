//! Yearly count report of a batch run, `eval_<root>.csv`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reconcile::{Reconciliation, TransitionSummary};

/// Fixed first line of every report.
pub const REPORT_HEADER: &str = "year, additions, deletions, replacements, splits, merges, label additions, label deletions, relabelings";

/// Counts of one release, labelled with the year of the newer release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub year: Option<u32>,
    #[serde(flatten)]
    pub summary: TransitionSummary,
}

impl ReportRow {
    pub fn from_reconciliation(reconciliation: &Reconciliation) -> Self {
        Self {
            year: reconciliation.year(),
            summary: reconciliation.summary(),
        }
    }

    /// Render as a report line without trailing newline.
    pub fn to_line(&self) -> String {
        let s = &self.summary;
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}",
            year,
            s.additions,
            s.deletions,
            s.replacements,
            s.splits,
            s.merges,
            s.label_additions,
            s.label_deletions,
            s.relabelings
        )
    }
}

/// `<root>/eval_<root folder name>.csv`
pub fn report_path(root: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    root.join(format!("eval_{}.csv", name))
}

/// Header plus one line per row.
pub fn render_report(rows: &[ReportRow]) -> String {
    let mut out = String::with_capacity(REPORT_HEADER.len() + rows.len() * 32);
    out.push_str(REPORT_HEADER);
    out.push('\n');
    for row in rows {
        let _ = writeln!(out, "{}", row.to_line());
    }
    out
}

/// Write the report to `path`, replacing any existing file.
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    fs::write(path, render_report(rows)).map_err(|e| Error::io(path, e))?;
    tracing::info!("Wrote report with {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(year: u32) -> ReportRow {
        ReportRow {
            year: Some(year),
            summary: TransitionSummary {
                additions: 1,
                deletions: 2,
                replacements: 3,
                splits: 4,
                merges: 5,
                label_additions: 6,
                label_deletions: 7,
                relabelings: 8,
                unchanged: 100,
                anomalies: 0,
            },
        }
    }

    #[test]
    fn test_to_line() {
        assert_eq!(row(2010).to_line(), "2010, 1, 2, 3, 4, 5, 6, 7, 8");
    }

    #[test]
    fn test_render_report() {
        let text = render_report(&[row(2009), row(2010)]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("2010, "));
    }

    #[test]
    fn test_empty_report_has_header() {
        assert_eq!(render_report(&[]), format!("{}\n", REPORT_HEADER));
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("/data/ops"));
        assert_eq!(path, PathBuf::from("/data/ops/eval_ops.csv"));
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval_ops.csv");
        write_report(&path, &[row(2010)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("2010, 1, 2, 3, 4, 5, 6, 7, 8\n"));
    }

    #[test]
    fn test_write_report_bad_path() {
        let dir = TempDir::new().unwrap();
        let err = write_report(&dir.path().join("missing/eval.csv"), &[]).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
