use assert_cmd::cargo::cargo_bin_cmd;

fn fixture(path: &str) -> String {
    format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR"))
}

fn stdout_of(out: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(out.get_output().stdout.clone()).expect("utf8")
}

#[test]
fn help_lists_subcommands_and_flags() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("--help");
    let out = cmd.assert().success();
    let stdout = stdout_of(&out);

    assert!(stdout.contains("run"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("--timeout-ms"));
}

#[test]
fn single_run_prints_transcript_and_passes() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.env_remove("TIMEOUT_MS").arg("run").arg("timer_ordering");
    let out = cmd.assert().code(0);
    let stdout = stdout_of(&out);

    let transcript: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.strip_prefix("  "))
        .collect();
    assert_eq!(transcript, ["Three", "Two", "Four", "Five", "One"]);
    assert!(stdout.contains("-- completed (1000 ms virtual)"));
    assert!(stdout.lines().any(|line| line == "PASS"));
}

#[test]
fn expected_error_snippet_exits_zero() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("run").arg("hoisting_temporal_dead_zone");
    let out = cmd.assert().code(0);
    let stdout = stdout_of(&out);
    assert!(stdout.contains("!! ReferenceError: "));
    assert!(stdout.contains("-- threw"));
}

#[test]
fn unknown_snippet_is_a_harness_fault() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("run").arg("no_such_snippet");
    let out = cmd.assert().code(4);
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("unknown snippet: no_such_snippet"));
}

#[test]
fn run_without_name_or_all_is_rejected() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("run");
    cmd.assert().code(4);
}

#[test]
fn batch_only_flags_with_a_name_are_rejected() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("run")
        .arg("timer_ordering")
        .arg("--exclude")
        .arg("nope")
        .arg("--verify-determinism");
    let out = cmd.assert().code(4);
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("only apply to run --all"));
    assert!(stdout_of(&out).is_empty());
}

#[test]
fn timeout_env_var_bounds_a_hanging_snippet() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.env("TIMEOUT_MS", "100").arg("run").arg("busy_wait_hang");
    let out = cmd.assert().code(0);
    assert!(stdout_of(&out).contains("-- timed_out"));
}

#[test]
fn invalid_timeout_env_var_is_a_config_fault() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.env("TIMEOUT_MS", "soon").arg("run").arg("timer_ordering");
    let out = cmd.assert().code(4);
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("TIMEOUT_MS"));
}

#[test]
fn batch_passes_every_snippet() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("--timeout-ms").arg("200").arg("run").arg("--all");
    let out = cmd.assert().code(0);
    let stdout = stdout_of(&out);
    assert!(stdout.contains("PASS  busy_wait_hang"));
    assert!(stdout.contains(" 0 failed, 0 skipped"));
}

#[test]
fn batch_reads_exclusions_from_config_file() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("--config")
        .arg(fixture("configs/fast-batch.toml"))
        .arg("run")
        .arg("--all");
    let out = cmd.assert().code(0);
    let stdout = stdout_of(&out);
    assert!(stdout.contains("SKIP  busy_wait_hang"));
    assert!(stdout.contains("1 skipped"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("--config")
        .arg(fixture("configs/unknown-key.toml"))
        .arg("list");
    cmd.assert().code(4);
}

#[test]
fn json_output_is_a_versioned_envelope() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("--json").arg("run").arg("closure_var_loop");
    let out = cmd.assert().code(0);
    let value: serde_json::Value = serde_json::from_str(&stdout_of(&out)).expect("json");
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["name"], "closure_var_loop");
    assert_eq!(value["result"]["lines"], serde_json::json!(["5", "5"]));
    assert_eq!(value["verdict"]["verdict"], "pass");
}

#[test]
fn list_names_every_topic() {
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("list");
    let out = cmd.assert().success();
    let stdout = stdout_of(&out);
    for name in ["timer_ordering", "closure_let_loop", "deep_copy", "this_top_level"] {
        assert!(stdout.contains(name), "missing {name}");
    }
}

#[test]
fn log_file_receives_run_events() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log = temp.path().join("runs.jsonl");
    let mut cmd = cargo_bin_cmd!("quirkbook");
    cmd.arg("--log-file")
        .arg(&log)
        .arg("run")
        .arg("closure_counter");
    cmd.assert().code(0);

    let text = std::fs::read_to_string(&log).expect("log written");
    assert!(text.contains("runner.run_started"));
    assert!(text.contains("runner.run_finished"));
}
