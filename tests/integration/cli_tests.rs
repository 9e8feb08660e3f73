use clap::Parser;
use mediadupe::cli::Cli;
use mediadupe::error::ExitCode;
use mediadupe::run_app;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["mediadupe", "-q"];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_no_duplicates_exit_code() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"one").unwrap();
    fs::write(dir.path().join("b.mp4"), b"two").unwrap();

    let code = run(&["scan", &path_arg(dir.path()), "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
    assert_eq!(code.as_i32(), 2);
}

#[test]
fn test_report_only_leaves_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"same").unwrap();
    fs::write(dir.path().join("b.mp4"), b"same").unwrap();

    let code = run(&["scan", &path_arg(dir.path()), "--output", "csv"]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("a.mp4").exists());
    assert!(dir.path().join("b.mp4").exists());
}

#[test]
fn test_delete_with_yes() {
    let dir = tempdir().unwrap();
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        fs::write(dir.path().join(name), b"same").unwrap();
    }

    let code = run(&["scan", &path_arg(dir.path()), "--delete", "--yes"]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_dry_run_writes_report_and_keeps_files() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let report = out.path().join("report.json");
    for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
        fs::write(dir.path().join(name), b"same").unwrap();
    }

    let code = run(&[
        "scan",
        &path_arg(dir.path()),
        "--dry-run",
        "--report",
        &path_arg(&report),
        "--output",
        "json",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["summary"]["total_groups"], 1);
    assert_eq!(json["summary"]["total_losers"], 3);
    assert_eq!(json["disposal"]["dry_run"], true);
    assert_eq!(json["disposal"]["disposed_count"], 3);
}

#[test]
fn test_quarantine_flag() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/a.mp4"), b"same").unwrap();
    fs::write(dir.path().join("sub/b.mp4"), b"same").unwrap();

    let code = run(&[
        "scan",
        &path_arg(dir.path()),
        "--delete",
        "--yes",
        "--quarantine",
        &path_arg(quarantine.path()),
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    // Greatest path wins the final tie-break.
    assert!(dir.path().join("sub/b.mp4").exists());
    assert!(!dir.path().join("sub/a.mp4").exists());
    assert!(quarantine.path().join("sub/a.mp4").exists());
}

#[test]
fn test_unknown_criterion_is_config_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"same").unwrap();

    let err = run(&["scan", &path_arg(dir.path()), "--keep", "resolution,biggest"]).unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigError);
    assert!(format!("{:#}", err).contains("biggest"));
    assert!(dir.path().join("a.mp4").exists());
}

#[test]
fn test_negative_tolerance_is_config_error() {
    let dir = tempdir().unwrap();
    let err = run(&["scan", &path_arg(dir.path()), "--tolerance=-1"]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::ConfigError);
}

#[test]
fn test_missing_root_is_general_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = run(&["scan", &path_arg(&missing)]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_missing_manifest_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"x").unwrap();

    let result = run(&[
        "scan",
        &path_arg(dir.path()),
        "--mode",
        "tolerance",
        "--media-manifest",
        &path_arg(&dir.path().join("missing.json")),
    ]);
    assert!(result.is_err());
}
