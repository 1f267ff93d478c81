// tests/cli.rs
//
// Command-line surface tests: exit codes, dump files, stats output.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_inputs(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let trace_path = dir.path().join("trace.dis");
    let mem_path = dir.path().join("mem.hex");

    let mut trace = std::fs::File::create(&trace_path).unwrap();
    writeln!(trace, "       0:\t00500093          \taddi x1, x0, 5").unwrap();
    writeln!(trace, "       4:\t00708113          \taddi x2, x1, 7").unwrap();

    let mut mem = std::fs::File::create(&mem_path).unwrap();
    writeln!(mem, "@0").unwrap();
    writeln!(mem, "00 00 00 00").unwrap();

    (trace_path, mem_path)
}

#[test]
fn test_missing_arguments_fail() {
    Command::cargo_bin("rvooo_rust")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--test_name"));
}

#[test]
fn test_missing_trace_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let (_, mem_path) = write_inputs(&dir);

    Command::cargo_bin("rvooo_rust")
        .unwrap()
        .current_dir(dir.path())
        .args(["--test_name", "no_such_trace.dis"])
        .args(["--mem_name", mem_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_normal_drain_exits_zero() {
    let dir = TempDir::new().unwrap();
    let (trace_path, mem_path) = write_inputs(&dir);

    Command::cargo_bin("rvooo_rust")
        .unwrap()
        .current_dir(dir.path())
        .args(["--test_name", trace_path.to_str().unwrap()])
        .args(["--mem_name", mem_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation drained"));
}

#[test]
fn test_dump_files_are_written() {
    let dir = TempDir::new().unwrap();
    let (trace_path, mem_path) = write_inputs(&dir);

    Command::cargo_bin("rvooo_rust")
        .unwrap()
        .current_dir(dir.path())
        .args(["--test_name", trace_path.to_str().unwrap()])
        .args(["--mem_name", mem_path.to_str().unwrap()])
        .arg("--rob_dump")
        .arg("--commit_history_dump")
        .assert()
        .success();

    let rob_log = std::fs::read_to_string(dir.path().join("rob.log")).unwrap();
    assert!(rob_log.starts_with("Cycle: 0"));

    let commit_log = std::fs::read_to_string(dir.path().join("commit.log")).unwrap();
    assert!(commit_log.contains("addi x1, x0, 5"));
    assert!(!commit_log.contains("Cycle:"));
}

#[test]
fn test_stats_json_output() {
    let dir = TempDir::new().unwrap();
    let (trace_path, mem_path) = write_inputs(&dir);

    Command::cargo_bin("rvooo_rust")
        .unwrap()
        .current_dir(dir.path())
        .args(["--test_name", trace_path.to_str().unwrap()])
        .args(["--mem_name", mem_path.to_str().unwrap()])
        .args(["--stats_json", "stats.json"])
        .args(["--dmem_seed", "7"])
        .assert()
        .success();

    let stats: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats["instructions_committed"], 2);
    assert!(stats["cycles"].as_u64().unwrap() > 0);
}
