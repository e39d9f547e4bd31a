//! Plain-text rendering of an audit report.

use crate::auditor::AuditReport;

const RULE: &str = "================================================================================";

fn percent(part: usize, total: usize) -> f64 {
    crate::auditor::coverage_rate(part, total)
}

/// Overall totals, per-dataset counts and the problems missing output.
pub fn render_summary(report: &AuditReport) -> String {
    let total = report.total_problems();
    let with = report.total_with_output();
    let without = report.total_without_output();
    let name = &report.output_dir_name;

    let mut out = String::new();
    out.push_str(RULE);
    out.push_str(&format!("\nRun audit of {}\n", report.root.display()));
    out.push_str(RULE);
    out.push_str("\n\nOverall\n");
    out.push_str(&format!("  datasets: {}\n", report.total_datasets()));
    out.push_str(&format!("  problems: {}\n", total));
    out.push_str(&format!(
        "  with {}: {} ({:.1}%)\n",
        name,
        with,
        percent(with, total)
    ));
    out.push_str(&format!(
        "  without {}: {} ({:.1}%)\n",
        name,
        without,
        percent(without, total)
    ));

    out.push('\n');
    out.push_str(RULE);
    out.push_str("\nPer dataset\n");
    out.push_str(RULE);
    out.push('\n');

    for (dataset, summary) in &report.datasets {
        out.push_str(&format!("\n{}\n", dataset));
        out.push_str(&format!("  problems: {}\n", summary.total_problems));
        out.push_str(&format!(
            "  with {}: {} ({:.1}%)\n",
            name, summary.with_output, summary.coverage_rate
        ));
        out.push_str(&format!("  without {}: {}\n", name, summary.without_output));

        if !summary.problems_without_output.is_empty() {
            out.push_str("  missing:\n");
            for problem in &summary.problems_without_output {
                out.push_str(&format!("    - {}\n", problem));
            }
        }
        if !summary.anomalies.is_empty() {
            out.push_str("  anomalies:\n");
            for anomaly in &summary.anomalies {
                out.push_str(&format!("    ! {}\n", anomaly.describe()));
            }
        }
    }

    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out
}

/// Numbered lists of every problem, grouped by dataset.
pub fn render_detailed(report: &AuditReport) -> String {
    let name = &report.output_dir_name;
    let mut out = String::new();

    for (dataset, summary) in &report.datasets {
        out.push_str(RULE);
        out.push_str(&format!("\nDataset: {}\n", dataset));
        out.push_str(RULE);
        out.push('\n');

        if !summary.problems_with_output.is_empty() {
            out.push_str(&format!(
                "\nwith {} ({}):\n",
                name,
                summary.problems_with_output.len()
            ));
            for (i, problem) in summary.problems_with_output.iter().enumerate() {
                out.push_str(&format!("  {:3}. {}\n", i + 1, problem));
            }
        }
        if !summary.problems_without_output.is_empty() {
            out.push_str(&format!(
                "\nwithout {} ({}):\n",
                name,
                summary.problems_without_output.len()
            ));
            for (i, problem) in summary.problems_without_output.iter().enumerate() {
                out.push_str(&format!("  {:3}. {}\n", i + 1, problem));
            }
        }
        out.push('\n');
    }
    out
}
