//! Flat CSV export: one row per (dataset, problem, has_output).

use std::io;
use std::path::Path;

use serde::Serialize;

use crate::auditor::AuditReport;
use crate::error::Result;

/// File name used when no export path is given.
pub const DEFAULT_CSV_PATH: &str = "openevolve_output_summary.csv";

#[derive(Serialize)]
struct Row<'a> {
    dataset: &'a str,
    problem: &'a str,
    has_output: &'static str,
}

/// Write every row of `report` to `writer`. Returns the number of data rows.
pub fn write_csv<W: io::Write>(report: &AuditReport, writer: W) -> Result<usize> {
    // Header written explicitly so an empty report still gets one.
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(["dataset", "problem", "has_output"])?;

    let artifacts = report.artifacts();
    for artifact in &artifacts {
        csv.serialize(Row {
            dataset: &artifact.dataset,
            problem: &artifact.problem,
            has_output: if artifact.has_output { "Yes" } else { "No" },
        })?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(artifacts.len())
}

/// Write the CSV export to `path`.
pub fn export_csv(report: &AuditReport, path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path).map_err(|source| crate::AuditError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv(report, io::BufWriter::new(file))
}
