//! Evoharness Audit Library
//!
//! Offline classification of evolution run trees: which problem directories
//! carry a completed output directory, per-dataset coverage, text reports and
//! CSV export.

pub mod auditor;
pub mod error;
pub mod export;
pub mod report;

pub use auditor::{
    coverage_rate, Anomaly, AuditReport, DatasetSummary, RunArtifact, RunAuditor,
    DEFAULT_OUTPUT_DIR,
};
pub use error::{AuditError, Result};
pub use export::{export_csv, write_csv, DEFAULT_CSV_PATH};
pub use report::{render_detailed, render_summary};
