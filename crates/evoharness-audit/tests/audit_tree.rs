//! Audits of real directory trees.

use std::fs;
use std::path::Path;

use evoharness_audit::{export_csv, render_summary, AuditError, RunArtifact, RunAuditor};
use tracing_test::traced_test;

fn mkdir(root: &Path, rel: &str) {
    fs::create_dir_all(root.join(rel)).unwrap();
}

#[test]
fn test_half_covered_dataset() {
    let dir = tempfile::tempdir().unwrap();
    mkdir(dir.path(), "d1/p1/openevolve_output");
    mkdir(dir.path(), "d1/p2");

    let report = RunAuditor::new().audit(dir.path()).unwrap();

    let d1 = &report.datasets["d1"];
    assert_eq!(d1.total_problems, 2);
    assert_eq!(d1.with_output, 1);
    assert_eq!(d1.without_output, 1);
    assert_eq!(d1.coverage_rate, 50.0);
    assert_eq!(d1.problems_with_output, vec!["p1"]);
    assert_eq!(d1.problems_without_output, vec!["p2"]);
    assert!(d1.anomalies.is_empty());
}

#[test]
fn test_dataset_without_problems_is_zero_percent() {
    let dir = tempfile::tempdir().unwrap();
    mkdir(dir.path(), "empty");

    let report = RunAuditor::new().audit(dir.path()).unwrap();

    let empty = &report.datasets["empty"];
    assert_eq!(empty.total_problems, 0);
    assert_eq!(empty.coverage_rate, 0.0);
    assert_eq!(report.coverage_rate(), 0.0);
}

#[test]
fn test_repeated_audits_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    mkdir(dir.path(), "b/z/openevolve_output");
    mkdir(dir.path(), "b/a");
    mkdir(dir.path(), "a/m/openevolve_output");
    fs::write(dir.path().join("b/a/openevolve_output"), "file").unwrap();

    let auditor = RunAuditor::new();
    let first = auditor.audit(dir.path()).unwrap();
    let second = auditor.audit(dir.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(render_summary(&first), render_summary(&second));
}

#[test]
fn test_files_are_not_datasets_or_problems() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README.md"), "notes").unwrap();
    mkdir(dir.path(), "d1/p1");
    fs::write(dir.path().join("d1/notes.txt"), "x").unwrap();

    let report = RunAuditor::new().audit(dir.path()).unwrap();

    assert_eq!(report.total_datasets(), 1);
    assert_eq!(report.datasets["d1"].total_problems, 1);
}

#[test]
fn test_artifacts_cover_every_problem_in_order() {
    let dir = tempfile::tempdir().unwrap();
    mkdir(dir.path(), "d2/x");
    mkdir(dir.path(), "d1/b/openevolve_output");
    mkdir(dir.path(), "d1/a");
    mkdir(dir.path(), "d1/c/openevolve_output");

    let report = RunAuditor::new().audit(dir.path()).unwrap();
    let rows: Vec<(String, String, bool)> = report
        .artifacts()
        .into_iter()
        .map(|RunArtifact { dataset, problem, has_output }| (dataset, problem, has_output))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("d1".into(), "b".into(), true),
            ("d1".into(), "c".into(), true),
            ("d1".into(), "a".into(), false),
            ("d2".into(), "x".into(), false),
        ]
    );
    assert_eq!(report.total_problems(), 4);
    assert_eq!(report.total_with_output(), 2);
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RunAuditor::new().audit(&dir.path().join("problems")).unwrap_err();
    assert!(matches!(err, AuditError::RootNotFound(_)));
}

#[test]
fn test_root_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("problems");
    fs::write(&file, "x").unwrap();
    let err = RunAuditor::new().audit(&file).unwrap_err();
    assert!(matches!(err, AuditError::RootNotDirectory(_)));
}

#[test]
fn test_export_csv_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("problems");
    mkdir(&root, "d1/p1/openevolve_output");
    mkdir(&root, "d1/p2");

    let report = RunAuditor::new().audit(&root).unwrap();
    let csv_path = dir.path().join("summary.csv");
    assert_eq!(export_csv(&report, &csv_path).unwrap(), 2);

    let content = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(content, "dataset,problem,has_output\nd1,p1,Yes\nd1,p2,No\n");
}

#[cfg(unix)]
#[traced_test]
#[test]
fn test_unreadable_dataset_is_reported_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    mkdir(dir.path(), "locked/p1");
    mkdir(dir.path(), "open/p1/openevolve_output");
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let report = RunAuditor::new().audit(dir.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let report = report.unwrap();

    assert_eq!(report.datasets["open"].with_output, 1);
    // Privileged users can still list the directory.
    if !report.datasets["locked"].anomalies.is_empty() {
        assert_eq!(report.datasets["locked"].total_problems, 0);
        assert!(logs_contain("cannot list dataset"));
    }
}
