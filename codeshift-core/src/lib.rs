//! Codeshift Core - release transition analysis for coded classifications.
//!
//! Given two consecutive releases of a terminology (such as OPS or ICD-10-GM)
//! and the publisher's crosswalk between them, this crate groups the crosswalk
//! rows into logical changes and classifies each one.
//!
//! # Features
//!
//! - **Semantic classification**: additions, deletions, replacements, splits and merges
//! - **Lexical classification**: label additions, label deletions and relabelings
//! - **Release discovery**: old, new and crosswalk files located by file name
//! - **Batch runs**: every release folder of a terminology, in parallel, with a yearly report
//!
//! # Usage
//!
//! ```no_run
//! use codeshift_core::{Reconciliation, ReleaseConfig, TableFormat, CrosswalkColumns, Terminology};
//!
//! let config = ReleaseConfig::new("data/ops/2010", TableFormat::default(), CrosswalkColumns::default());
//! let result = Reconciliation::run(&config, &Terminology::Ops.profile())?;
//! println!("{} splits, {} merges", result.splits.len(), result.merges.len());
//! # Ok::<(), codeshift_core::Error>(())
//! ```

pub mod batch;
pub mod crosswalk;
pub mod delimited;
pub mod error;
pub mod labels;
pub mod ledger;
pub mod locator;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod run_table;
pub mod terminology;

pub use batch::{run_batch, terminology_from_root, BatchRun, ReleaseOutcome};
pub use crosswalk::{read_crosswalk, CrosswalkColumns, CrosswalkRow};
pub use delimited::TableFormat;
pub use error::{Error, Result};
pub use labels::LabelTable;
pub use ledger::{ChangeLedger, MappingAnomaly};
pub use locator::{locate, FileMarkers, VersionFileSet};
pub use reconcile::{Reconciliation, ReleaseConfig, TransitionSummary};
pub use record::{ChangeRecord, LexicalChange, SemanticChange};
pub use report::{report_path, write_report, ReportRow, REPORT_HEADER};
pub use run_table::load_run_table;
pub use terminology::{Terminology, TerminologyProfile};

