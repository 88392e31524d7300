// SPDX-License-Identifier: Apache-2.0

use bbcov_test_helpers::RunFixture;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn run_driver(cwd: &Path, args: &[&str]) -> Output {
    let command_path = env!("CARGO_BIN_EXE_bbcov-driver");
    Command::new(command_path)
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("Failed to run bbcov-driver")
}

fn describe(output: &Output) -> String {
    format!(
        "status: {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Two blocks, `A` at A.c:1 and `B` at B.c:1, hit `a` and `b` times in a
/// single snapshot.
fn two_block_run(root: &Path, name: &str, pid: u32, a: u64, b: u64) -> RunFixture {
    RunFixture::new(root, name, pid)
        .block(0, "A", "A.c", 1)
        .block(1, "B", "B.c", 1)
        .snapshot(&[(0, a), (1, b)])
}

/// The reference (no status file, success by its name) plus one successful
/// and one failing run.
fn three_runs(root: &Path) -> Vec<PathBuf> {
    vec![
        two_block_run(root, "dd.line/ref", 100, 5, 0).write(),
        two_block_run(root, "dd.line/run2", 101, 5, 0)
            .exit_code(0)
            .write(),
        two_block_run(root, "dd.line/run3", 102, 3, 0)
            .exit_code(1)
            .write(),
    ]
}

fn path_args(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

#[test]
fn test_gen_cov_correlation_standard_indicator() {
    let tmp = tempfile::tempdir().unwrap();
    let files = path_args(&three_runs(tmp.path()));
    let out_dir = tmp.path().join("out");

    let mut args = vec![
        "gen-cov-correlation",
        "--indicator=standard",
        "--output-dir",
        out_dir.to_str().unwrap(),
    ];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert!(output.status.success(), "{}", describe(&output));

    let merged = std::fs::read_to_string(out_dir.join("coverMerged0")).unwrap();
    assert_eq!(merged, "1.00\t: A.c(1)\n0.50\t: B.c(1)\n");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NbSuccess: 2 \t nbFail 1"), "{}", stdout);
    assert!(stdout.contains("Num: 0\tMaxindicator: 1"), "{}", stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("% of coverage data merged"), "{}", stderr);
}

#[test]
fn test_gen_cov_correlation_writes_summary_json() {
    let tmp = tempfile::tempdir().unwrap();
    let mut paths = three_runs(tmp.path());
    // No status file and not a reference: discarded.
    paths.push(two_block_run(tmp.path(), "dd.line/run4", 103, 1, 1).write());
    let files = path_args(&paths);
    let summary_path = tmp.path().join("summary.json");

    let mut args = vec![
        "gen-cov-correlation",
        "--summary-json",
        summary_path.to_str().unwrap(),
    ];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("directory ignored"));

    let text = std::fs::read_to_string(&summary_path).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(summary["indicator"], "biased");
    assert_eq!(summary["merged"]["success"], 1);
    assert_eq!(summary["merged"]["fail"], 1);
    assert_eq!(summary["discarded"].as_array().unwrap().len(), 1);
    assert_eq!(summary["snapshots"][0]["keys"], 2);
    assert!(summary["reference"]
        .as_str()
        .unwrap()
        .ends_with("dd.line/ref"));
    // Biased indicator of A: 0.5 * (1/1 + 1/1).
    assert_eq!(summary["snapshots"][0]["max_indicator"], 1.0);
}

#[test]
fn test_failures_only_exits_with_no_reference_status() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = vec![
        two_block_run(tmp.path(), "a/ref", 1, 1, 1).exit_code(1).write(),
        two_block_run(tmp.path(), "a/run1", 2, 1, 1).exit_code(3).write(),
    ];
    let files = path_args(&paths);
    let mut args = vec!["gen-cov-correlation"];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert_eq!(output.status.code(), Some(42), "{}", describe(&output));
}

#[test]
fn test_successes_only_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = vec![
        two_block_run(tmp.path(), "a/ref", 1, 1, 1).write(),
        two_block_run(tmp.path(), "a/run1", 2, 1, 1).exit_code(0).write(),
    ];
    let files = path_args(&paths);
    let mut args = vec!["gen-cov-correlation"];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert_eq!(output.status.code(), Some(5), "{}", describe(&output));
    assert!(!tmp.path().join("coverMerged0").exists());
}

#[test]
fn test_snapshot_count_mismatch_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = vec![
        two_block_run(tmp.path(), "a/ref", 1, 1, 1).write(),
        two_block_run(tmp.path(), "a/run1", 2, 1, 1)
            .snapshot(&[(0, 1)])
            .exit_code(1)
            .write(),
    ];
    let files = path_args(&paths);
    let mut args = vec!["gen-cov-correlation"];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert_eq!(output.status.code(), Some(3), "{}", describe(&output));
}

#[test]
fn test_too_few_files_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let only = two_block_run(tmp.path(), "a/ref", 1, 1, 1).write();
    let output = run_driver(
        tmp.path(),
        &["gen-cov-correlation", only.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
}

#[test]
fn test_run_cmp_and_run_eval_conflict() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_driver(
        tmp.path(),
        &["gen-cov-correlation", "--run-cmp=a", "--run-eval=b"],
    );
    assert!(!output.status.success(), "{}", describe(&output));
}

#[test]
fn test_gen_cov_with_gzip_logs_and_output() {
    let tmp = tempfile::tempdir().unwrap();
    let cov = RunFixture::new(tmp.path(), "r", 77)
        .block(0, "f", "f.c", 3)
        .block(0, "f", "f.c", 4)
        .block(1, "g", "g.c", 9)
        .snapshot(&[(0, 2), (1, 1)])
        .snapshot(&[(1, 4)])
        .gzip()
        .write();
    assert!(cov.to_str().unwrap().ends_with("trace_bb_cov.log-77.gz"));

    let output = run_driver(
        tmp.path(),
        &["gen-cov", "--output-prefix=x_", cov.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", describe(&output));
    let run_dir = tmp.path().join("r");
    assert_eq!(
        std::fs::read_to_string(run_dir.join("x_cover0-77")).unwrap(),
        "2\t: f.c(3-4)\n1\t: g.c(9)\n"
    );
    assert_eq!(
        std::fs::read_to_string(run_dir.join("x_cover1-77")).unwrap(),
        "4\t: g.c(9)\n"
    );

    let output = run_driver(
        tmp.path(),
        &["gen-cov", "--compress-output", cov.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", describe(&output));
    assert!(run_dir.join("cover0-77.gz").exists());
    assert!(!run_dir.join("cover0-77").exists());
}

#[test]
fn test_gen_cov_select_default_discovers_logs() {
    let tmp = tempfile::tempdir().unwrap();
    two_block_run(tmp.path(), "deep/a", 5, 1, 2).write();
    two_block_run(tmp.path(), "b", 6, 3, 4).write();

    let output = run_driver(tmp.path(), &["gen-cov", "--select-default"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert!(tmp.path().join("deep/a/cover0-5").exists());
    assert!(tmp.path().join("b/cover0-6").exists());
}

#[test]
fn test_config_file_in_working_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let files = path_args(&three_runs(tmp.path()));
    std::fs::write(
        tmp.path().join("bbcov.toml"),
        "[analysis]\nindicator = \"standard\"\noutput_prefix = \"cfg_\"\njobs = 2\n",
    )
    .unwrap();
    let mut args = vec!["gen-cov-correlation"];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("cfg_coverMerged0")).unwrap(),
        "1.00\t: A.c(1)\n0.50\t: B.c(1)\n"
    );
}

#[test]
fn test_missing_config_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_driver(tmp.path(), &["--config=nope.toml", "version"]);
    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_catalog_dump() {
    let tmp = tempfile::tempdir().unwrap();
    let info = tmp.path().join("trace_bb_info.log-1");
    std::fs::write(
        &info,
        "0 : f : f.c : 3\n0 : f : f.c : 4\n1 : g : g.c : 9\n0 : f : f.c : 3\n",
    )
    .unwrap();
    let output = run_driver(tmp.path(), &["catalog", info.to_str().unwrap()]);
    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "0\tcorrupted\tf[f.c(3-4)]\n1\tok\tg[g.c(9)]\n"
    );
}

#[test]
fn test_malformed_catalog_exits_with_parse_status() {
    let tmp = tempfile::tempdir().unwrap();
    let info = tmp.path().join("trace_bb_info.log-1");
    std::fs::write(&info, "not a block line\n").unwrap();
    let output = run_driver(tmp.path(), &["catalog", info.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2), "{}", describe(&output));
}

#[cfg(unix)]
#[test]
fn test_gen_cov_correlation_with_evaluator() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = vec![
        two_block_run(tmp.path(), "Nearest/ref", 1, 5, 0).write(),
        two_block_run(tmp.path(), "runs/ok", 2, 5, 0).write(),
        two_block_run(tmp.path(), "runs/bad", 3, 3, 0).write(),
    ];
    std::fs::write(paths[2].parent().unwrap().join("marker"), "").unwrap();
    let eval = bbcov_test_helpers::write_script(tmp.path(), "eval.sh", r#"test ! -e "$1/marker""#);
    let files = path_args(&paths);
    let eval_arg = format!("--run-eval={}", eval.display());
    let mut args = vec!["gen-cov-correlation", "--indicator=standard", eval_arg.as_str()];
    args.extend(files.iter().map(String::as_str));
    let output = run_driver(tmp.path(), &args);
    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("coverMerged0")).unwrap(),
        "1.00\t: A.c(1)\n0.50\t: B.c(1)\n"
    );
    assert!(tmp.path().join("runs/bad/evalCmd3.out").exists());
}
