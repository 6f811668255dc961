use std::path::PathBuf;
use std::process::Command;

use anyhow::Result;

use lazytab::ci_utils::{DocumentHost, MockDocumentHost, MockDocumentSpec, TestWorkspace};
use lazytab::tracker::TrackedResource;

fn lazytab() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lazytab"))
}

fn workflow_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("workflows")
}

/// Basic smoke tests for CLI functionality
#[test]
fn test_cli_help() {
    let output = lazytab()
        .arg("--help")
        .output()
        .expect("Failed to execute lazytab binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: lazytab"));
}

#[test]
fn test_cli_list_workflows() {
    let output = lazytab()
        .arg("list")
        .arg("--dir")
        .arg(workflow_dir())
        .output()
        .expect("Failed to execute lazytab binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("csharp_lazy_load"));
    assert!(stdout.contains("recaptioned_designer"));
}

#[test]
fn test_cli_run_by_id() {
    let output = lazytab()
        .args(["run", "csharp_lazy_load", "--json", "--seed", "3", "--dir"])
        .arg(workflow_dir())
        .output()
        .expect("Failed to execute lazytab binary");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report is JSON");
    assert_eq!(report["id"], "csharp_lazy_load");
    assert_eq!(report["shuffle_seed"], 3);
    assert_eq!(report["phases"].as_array().map(Vec::len), Some(10));
}

#[test]
fn test_cli_run_reports_mismatch() -> Result<()> {
    let ws = TestWorkspace::create("cli_mismatch")?;
    let path = ws.write_scratch_file(
        "eager.toml",
        r#"
[manifest]
id = "eager"

[wait]
timeout_ms = 200
interval_ms = 5

[[documents]]
caption = "a.txt"
load_on_restore = true

[[documents]]
caption = "b.txt"
"#,
    )?;

    let output = lazytab().arg("run").arg(&path).output()?;
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("'a.txt' expected stub, observed loaded"));
    Ok(())
}

#[test]
fn test_cli_run_unknown_workflow() {
    let output = lazytab()
        .args(["run", "no_such_workflow", "--dir"])
        .arg(workflow_dir())
        .output()
        .expect("Failed to execute lazytab binary");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_verify_snapshot() -> Result<()> {
    let ws = TestWorkspace::create("cli_verify")?;

    let mut host = MockDocumentHost::new([MockDocumentSpec::new("Program.cs", "CSharp_Console")]);
    host.open_document("Program.cs", "CSharp_Console")?;
    host.open_document("file.txt", "")?;
    host.close_solution()?;
    host.reopen_solution()?;
    host.dump_status(&ws.file("status.json"))?;

    let snapshot = vec![
        TrackedResource::new("Program.cs", "CSharp_Console"),
        TrackedResource::new("file.txt", ""),
    ];
    std::fs::write(ws.file("stub.json"), serde_json::to_string(&snapshot)?)?;

    let mut loaded = snapshot.clone();
    loaded[1].is_stub = false;
    std::fs::write(ws.file("loaded.json"), serde_json::to_string(&loaded)?)?;

    let verify = |expected: &str| {
        lazytab()
            .arg("verify")
            .arg("--expected")
            .arg(ws.file(expected))
            .arg("--status")
            .arg(ws.file("status.json"))
            .args(["--timeout-ms", "50", "--interval-ms", "10", "--wait-secs", "1"])
            .output()
    };

    assert!(verify("stub.json")?.status.success());
    assert_eq!(verify("loaded.json")?.status.code(), Some(1));
    Ok(())
}

#[test]
fn test_cli_verify_rejects_zero_interval() {
    let output = lazytab()
        .args(["verify", "--expected", "tracker.json", "--status", "status.json"])
        .args(["--interval-ms", "0"])
        .output()
        .expect("Failed to execute lazytab binary");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--interval-ms"));
}
