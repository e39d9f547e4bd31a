//! RunAuditor: classifies every problem directory of a run tree.
//!
//! ```text
//! <root>/<dataset>/<problem>/openevolve_output/
//! ```
//!
//! A problem has output iff the output entry exists directly beneath it and is
//! a directory. The classification is derived from the listing at call time;
//! nothing is cached, so repeated audits of an unchanged tree are identical.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AuditError, Result};

/// Default name of the completion directory beneath a problem.
pub const DEFAULT_OUTPUT_DIR: &str = "openevolve_output";

/// Something unexpected found while auditing one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The dataset directory could not be listed.
    UnreadableDataset { path: PathBuf, error: String },
    /// An entry of the dataset could not be inspected.
    UnreadableEntry { path: PathBuf, error: String },
    /// The output name exists but is not a directory.
    OutputNotDirectory { path: PathBuf },
    /// The output entry exists but could not be inspected.
    UnreadableOutput { path: PathBuf, error: String },
}

impl Anomaly {
    pub fn path(&self) -> &Path {
        match self {
            Anomaly::UnreadableDataset { path, .. }
            | Anomaly::UnreadableEntry { path, .. }
            | Anomaly::OutputNotDirectory { path }
            | Anomaly::UnreadableOutput { path, .. } => path,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Anomaly::UnreadableDataset { path, error } => {
                format!("cannot list {}: {}", path.display(), error)
            }
            Anomaly::UnreadableEntry { path, error } => {
                format!("cannot inspect {}: {}", path.display(), error)
            }
            Anomaly::OutputNotDirectory { path } => {
                format!("{} exists but is not a directory", path.display())
            }
            Anomaly::UnreadableOutput { path, error } => {
                format!("cannot inspect {}: {}", path.display(), error)
            }
        }
    }
}

/// Per-dataset classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_problems: usize,
    pub with_output: usize,
    pub without_output: usize,
    /// Percentage in `[0, 100]`; 0 for a dataset without problems.
    pub coverage_rate: f64,
    pub problems_with_output: Vec<String>,
    pub problems_without_output: Vec<String>,
    pub anomalies: Vec<Anomaly>,
}

impl DatasetSummary {
    fn finish(mut self) -> Self {
        self.with_output = self.problems_with_output.len();
        self.without_output = self.problems_without_output.len();
        self.total_problems = self.with_output + self.without_output;
        self.coverage_rate = coverage_rate(self.with_output, self.total_problems);
        self
    }
}

/// `with / total * 100`, with an empty total treated as 0%.
pub fn coverage_rate(with_output: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        with_output as f64 / total as f64 * 100.0
    }
}

/// One (dataset, problem, has-output) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifact {
    pub dataset: String,
    pub problem: String,
    pub has_output: bool,
}

/// Full result of one audit pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub root: PathBuf,
    pub output_dir_name: String,
    pub datasets: BTreeMap<String, DatasetSummary>,
}

impl AuditReport {
    pub fn total_datasets(&self) -> usize {
        self.datasets.len()
    }

    pub fn total_problems(&self) -> usize {
        self.datasets.values().map(|d| d.total_problems).sum()
    }

    pub fn total_with_output(&self) -> usize {
        self.datasets.values().map(|d| d.with_output).sum()
    }

    pub fn total_without_output(&self) -> usize {
        self.datasets.values().map(|d| d.without_output).sum()
    }

    pub fn coverage_rate(&self) -> f64 {
        coverage_rate(self.total_with_output(), self.total_problems())
    }

    /// Every triple, per dataset in name order, problems with output first.
    pub fn artifacts(&self) -> Vec<RunArtifact> {
        let mut rows = Vec::with_capacity(self.total_problems());
        for (dataset, summary) in &self.datasets {
            let with = summary.problems_with_output.iter().map(|p| (p, true));
            let without = summary.problems_without_output.iter().map(|p| (p, false));
            for (problem, has_output) in with.chain(without) {
                rows.push(RunArtifact {
                    dataset: dataset.clone(),
                    problem: problem.clone(),
                    has_output,
                });
            }
        }
        rows
    }

    pub fn anomalies(&self) -> impl Iterator<Item = (&str, &Anomaly)> {
        self.datasets
            .iter()
            .flat_map(|(name, d)| d.anomalies.iter().map(move |a| (name.as_str(), a)))
    }
}

/// Walks `<root>/<dataset>/<problem>` and classifies every problem.
#[derive(Debug, Clone)]
pub struct RunAuditor {
    output_dir_name: String,
}

impl Default for RunAuditor {
    fn default() -> Self {
        Self {
            output_dir_name: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl RunAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for `name` instead of the default output directory.
    pub fn with_output_dir_name(mut self, name: impl Into<String>) -> Self {
        self.output_dir_name = name.into();
        self
    }

    pub fn output_dir_name(&self) -> &str {
        &self.output_dir_name
    }

    /// Audit every dataset under `root`. Fails only if the root itself is
    /// missing, not a directory, or cannot be listed.
    pub fn audit(&self, root: &Path) -> Result<AuditReport> {
        let meta = match fs::metadata(root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AuditError::RootNotFound(root.to_path_buf()))
            }
            Err(source) => {
                return Err(AuditError::Io {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };
        if !meta.is_dir() {
            return Err(AuditError::RootNotDirectory(root.to_path_buf()));
        }

        let mut datasets = BTreeMap::new();
        for (name, path) in list_directories(root)? {
            let summary = self.audit_dataset(&path);
            debug!(
                dataset = %name,
                total = summary.total_problems,
                with_output = summary.with_output,
                "dataset audited"
            );
            datasets.insert(name, summary);
        }

        Ok(AuditReport {
            root: root.to_path_buf(),
            output_dir_name: self.output_dir_name.clone(),
            datasets,
        })
    }

    /// Classify the problems of one dataset directory. Never fails: problems
    /// that cannot be inspected count as without output and are recorded as
    /// anomalies.
    pub fn audit_dataset(&self, dataset_dir: &Path) -> DatasetSummary {
        let mut summary = DatasetSummary::default();

        let entries = match fs::read_dir(dataset_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dataset_dir.display(), error = %e, "cannot list dataset");
                summary.anomalies.push(Anomaly::UnreadableDataset {
                    path: dataset_dir.to_path_buf(),
                    error: e.to_string(),
                });
                return summary.finish();
            }
        };

        let mut problems = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %dataset_dir.display(), error = %e, "unreadable problem entry");
                    summary.anomalies.push(Anomaly::UnreadableEntry {
                        path: dataset_dir.to_path_buf(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => problems.push((name, path, true)),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    summary.anomalies.push(Anomaly::UnreadableEntry {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                    problems.push((name, path, false));
                }
            }
        }
        problems.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, path, readable) in problems {
            if readable && self.has_output(&path, &mut summary.anomalies) {
                summary.problems_with_output.push(name);
            } else {
                summary.problems_without_output.push(name);
            }
        }

        summary.finish()
    }

    fn has_output(&self, problem_dir: &Path, anomalies: &mut Vec<Anomaly>) -> bool {
        let output = problem_dir.join(&self.output_dir_name);
        match fs::metadata(&output) {
            Ok(meta) if meta.is_dir() => true,
            Ok(_) => {
                anomalies.push(Anomaly::OutputNotDirectory { path: output });
                false
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                anomalies.push(Anomaly::UnreadableOutput {
                    path: output,
                    error: e.to_string(),
                });
                false
            }
        }
    }
}

/// Immediate subdirectories of `dir`, sorted by name. Non-directories and
/// dangling links are skipped; only listing `dir` itself can fail.
fn list_directories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|source| AuditError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let named = entries.map(|entry| {
        entry.map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
    });
    Ok(collect_directories(dir, named))
}

fn collect_directories<I>(dir: &Path, entries: I) -> Vec<(String, PathBuf)>
where
    I: IntoIterator<Item = io::Result<(String, PathBuf)>>,
{
    let mut dirs = Vec::new();
    for entry in entries {
        let (name, path) = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => dirs.push((name, path)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "skipping dangling entry")
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable entry"),
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}
