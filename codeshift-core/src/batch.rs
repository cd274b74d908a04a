//! Batch analysis of every release folder listed in a run table.
//!
//! Each release is reconciled independently with its own label tables and
//! ledger, so folders can be processed in parallel. Outcomes are returned in
//! run-table order and a failed release never stops the others.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::reconcile::{Reconciliation, ReleaseConfig};
use crate::report::ReportRow;
use crate::run_table::load_run_table;
use crate::terminology::{Terminology, TerminologyProfile};

/// Result of reconciling one release folder.
#[derive(Debug)]
pub struct ReleaseOutcome {
    pub directory: PathBuf,
    pub result: Result<Reconciliation>,
}

impl ReleaseOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// All outcomes of a batch run, in run-table order.
#[derive(Debug)]
pub struct BatchRun {
    pub root: PathBuf,
    pub outcomes: Vec<ReleaseOutcome>,
    pub duration_ms: f64,
}

impl BatchRun {
    /// Report rows for the releases that were reconciled successfully.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(ReportRow::from_reconciliation)
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Outcomes that ended in an error, with their error.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.directory.as_path(), e)))
    }
}

/// Terminology named by the batch root folder, e.g. `.../ops` or `.../ICD10GM`.
pub fn terminology_from_root(root: &Path) -> Result<Terminology> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.parse()
}

/// Load `properties.csv` from `root` and reconcile every listed release.
pub fn run_batch(root: &Path, profile: &TerminologyProfile, parallel: bool) -> Result<BatchRun> {
    if !root.is_dir() {
        return Err(Error::InvalidReleaseDirectory {
            path: root.to_path_buf(),
        });
    }

    let start = Instant::now();
    let releases = load_run_table(root)?;
    tracing::info!(
        "Running batch over {} releases in {}",
        releases.len(),
        root.display()
    );

    let outcomes = run_releases(&releases, profile, parallel);
    let run = BatchRun {
        root: root.to_path_buf(),
        outcomes,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    tracing::info!(
        "Batch finished in {:.1}ms: {} succeeded, {} failed",
        run.duration_ms,
        run.succeeded(),
        run.failed()
    );
    Ok(run)
}

/// Reconcile each release, optionally on the rayon pool. Output order follows
/// `releases`.
pub fn run_releases(
    releases: &[ReleaseConfig],
    profile: &TerminologyProfile,
    parallel: bool,
) -> Vec<ReleaseOutcome> {
    let reconcile = |config: &ReleaseConfig| -> ReleaseOutcome {
        let result = Reconciliation::run(config, profile);
        match &result {
            Err(e) if e.is_missing_input() => {
                tracing::warn!("Release {} failed: {}", config.directory.display(), e)
            }
            Err(e) => tracing::error!("Release {} failed: {}", config.directory.display(), e),
            Ok(_) => {}
        }
        ReleaseOutcome {
            directory: config.directory.clone(),
            result,
        }
    };

    if parallel {
        releases.par_iter().map(reconcile).collect()
    } else {
        releases.iter().map(reconcile).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        File::create(path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
    }

    fn release(root: &Path, folder: &str, old_year: u32, new_year: u32, crosswalk: &str) {
        let dir = root.join(folder);
        fs::create_dir(&dir).unwrap();
        write(&dir.join(format!("op{old_year}.csv")), "A;Alpha\nB;Beta\n");
        write(&dir.join(format!("op{new_year}.csv")), "A;Alpha\nC;Gamma\n");
        write(&dir.join("umsteiger.csv"), crosswalk);
    }

    fn batch_root() -> TempDir {
        let root = TempDir::new().unwrap();
        release(root.path(), "2009", 2008, 2009, "A;A\nB;C\n");
        release(root.path(), "2010", 2009, 2010, "A;A\nB;C\n");
        write(
            &root.path().join("properties.csv"),
            "path,separator,encoding,columns\n\
             2009,;,UTF-8,\"code_old;code_new\"\n\
             2010,;,UTF-8,\"code_old;code_new\"\n",
        );
        root
    }

    #[test]
    fn test_run_batch_keeps_order() {
        let root = batch_root();
        let profile = Terminology::Ops.profile();

        for parallel in [true, false] {
            let run = run_batch(root.path(), &profile, parallel).unwrap();
            assert_eq!(run.outcomes.len(), 2);
            assert_eq!(run.failed(), 0);

            let years: Vec<_> = run.report_rows().iter().map(|r| r.year).collect();
            assert_eq!(years, vec![Some(2009), Some(2010)]);
            assert_eq!(run.report_rows()[0].summary.replacements, 1);
        }
    }

    #[test]
    fn test_failed_release_does_not_stop_batch() {
        let root = batch_root();
        fs::remove_file(root.path().join("2009").join("umsteiger.csv")).unwrap();

        let run = run_batch(root.path(), &Terminology::Ops.profile(), true).unwrap();
        assert_eq!(run.succeeded(), 1);
        assert_eq!(run.failed(), 1);

        let (path, err) = run.failures().next().unwrap();
        assert!(path.ends_with("2009"));
        assert!(matches!(err, Error::MissingTransitionFile { .. }));
        assert_eq!(run.report_rows().len(), 1);
    }

    #[test]
    fn test_failures_distinguish_missing_input() {
        let root = batch_root();
        fs::remove_file(root.path().join("2009").join("umsteiger.csv")).unwrap();
        write(&root.path().join("2010").join("umsteiger.csv"), "A;A\nB\n");

        let run = run_batch(root.path(), &Terminology::Ops.profile(), false).unwrap();
        assert_eq!(run.failed(), 2);

        let missing: Vec<_> = run.failures().map(|(_, e)| e.is_missing_input()).collect();
        assert_eq!(missing, vec![true, false]);
    }

    #[test]
    fn test_run_batch_missing_root() {
        let root = TempDir::new().unwrap();
        let err = run_batch(&root.path().join("nope"), &Terminology::Ops.profile(), false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReleaseDirectory { .. }));
    }

    #[test]
    fn test_terminology_from_root() {
        assert_eq!(
            terminology_from_root(Path::new("/data/OPS")).unwrap(),
            Terminology::Ops
        );
        assert_eq!(
            terminology_from_root(Path::new("/data/icd10gm")).unwrap(),
            Terminology::Icd10Gm
        );
        assert!(terminology_from_root(Path::new("/data/loinc")).is_err());
    }
}
