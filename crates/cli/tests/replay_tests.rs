// Integration tests for `conflate replay` and `conflate validate`.
// Run with: cargo test -p conflation-cli --test replay_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn conflate() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_conflate"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn run(args: &[&str]) -> Output {
    conflate().args(args).output().expect("run conflate")
}

fn replay_json(script: &str, extra: &[&str]) -> Value {
    let path = fixture(script);
    let mut args = vec!["replay", path.to_str().unwrap(), "--json"];
    args.extend_from_slice(extra);
    let output = run(&args);
    assert!(output.status.success(), "exit code: {:?}\nstderr: {}",
        output.status, String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn ids(value: &Value) -> Vec<u64> {
    value.as_array().unwrap().iter().map(|v| v.as_u64().unwrap()).collect()
}

fn strings(value: &Value) -> Vec<String> {
    value.as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect()
}

// ---------------------------------------------------------------------------
// replay: match removal, ledger and cancelled conflation
// ---------------------------------------------------------------------------

#[test]
fn replay_basic_session() {
    let json = replay_json("basic.session.toml", &[]);

    assert_eq!(json["state"], "active");
    assert_eq!(json["script"], "basic.session.toml");
    assert!(json["run_at"].as_str().is_some());

    let matches = json["matches"].as_array().unwrap();
    let pairs: Vec<(u64, u64, bool)> = matches
        .iter()
        .map(|m| {
            (
                m["reference"].as_u64().unwrap(),
                m["subject"].as_u64().unwrap(),
                m["selected"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![(1, 11, true), (3, 13, false)]);

    assert!(ids(&json["reference_only"]).is_empty());
    assert_eq!(ids(&json["subject_only"]), vec![14]);
    assert_eq!(ids(&json["ledger"]["reference"]), vec![4]);
    assert!(ids(&json["ledger"]["subject"]).is_empty());
    assert_eq!(strings(&json["history"]), vec!["Delete 1 conflation match"]);

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 9);
    assert_eq!(steps[0]["detail"], "selected 1 matches");
    assert_eq!(steps[2]["detail"], "deleted 1, parked 1");
    assert_eq!(steps[3]["detail"], "undeleted 1, restored 1");
    assert_eq!(steps[5]["detail"], "restored 0, purged 0, still deleted 1");
    assert_eq!(steps[7]["op"], "conflate");
    assert_eq!(steps[7]["detail"], "merged 1, failed 0, cancelled");
    assert_eq!(steps[8]["detail"], "undid Conflate #3 <-> #13");
}

#[test]
fn replay_unmatched_session() {
    let json = replay_json("unmatched.session.toml", &[]);

    assert_eq!(ids(&json["reference_only"]), vec![3]);
    assert!(ids(&json["subject_only"]).is_empty());
    assert!(ids(&json["ledger"]["subject"]).is_empty());
    assert_eq!(strings(&json["failures"]), vec!["tags conflict"]);
    assert_eq!(
        strings(&json["history"]),
        vec!["Copy 1 unmatched object to subject layer", "Remove 1 unmatched object"]
    );

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps[1]["detail"], "merged 0, failed 1");
    assert_eq!(steps[5]["detail"], "redid Remove 1 unmatched object");
    assert_eq!(steps[7]["detail"], "purged 1 from dataset, dropped 1 ledger entries");
}

#[test]
fn replay_respects_purge_setting() {
    let config = fixture("keep-ledger.toml");
    let json = replay_json("unmatched.session.toml", &["--config", config.to_str().unwrap()]);

    assert_eq!(ids(&json["ledger"]["subject"]), vec![13]);
    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps[7]["detail"], "purged 1 from dataset, dropped 0 ledger entries");
}

#[test]
fn replay_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.json");
    let script = fixture("basic.session.toml");
    let output = run(&["replay", script.to_str().unwrap(), "--output", out.to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty(), "JSON only goes to stdout with --json");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["state"], "active");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("replayed 9 steps"), "{stderr}");
    assert!(stderr.contains("matches: 2 (1 selected)"), "{stderr}");
    assert!(!stderr.contains("#2 <-> #12"), "{stderr}");
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

#[test]
fn replay_invalid_script_exits_4() {
    let script = fixture("invalid.session.toml");
    let output = run(&["replay", script.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("step 1 (select): unknown feature #99"), "{stderr}");
    assert!(stderr.contains("hint:"), "{stderr}");
}

#[test]
fn replay_missing_script_exits_2() {
    let output = run(&["replay", "tests/fixtures/does-not-exist.toml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn replay_bad_config_exits_3() {
    let script = fixture("basic.session.toml");
    let config = fixture("bad-history.toml");
    let output = run(&["replay", script.to_str().unwrap(), "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn validate_accepts_good_config() {
    let config = fixture("conflation.toml");
    let output = run(&["validate", config.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("history_limit=50"), "{stdout}");
    assert!(stdout.contains("show_match_layer=false"), "{stdout}");
}

#[test]
fn validate_rejects_zero_history() {
    let config = fixture("bad-history.toml");
    let output = run(&["validate", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("history_limit"), "{stderr}");
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = run(&["explode"]);
    assert_eq!(output.status.code(), Some(2));
}
