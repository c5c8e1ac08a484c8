use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn demos_root() -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("demos")
}

fn demo(name: &str) -> String {
    demos_root().join(name).to_string_lossy().to_string()
}

fn temp_state(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("wool-cli-smoke-{}-{}.json", std::process::id(), name))
        .to_string_lossy()
        .to_string()
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wool-cli"))
        .args(args)
        .output()
        .expect("wool-cli should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn state_out(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("STATE_OUT:").map(str::to_string))
        .filter(|value| value != "NONE")
}

#[test]
fn validate_accepts_every_demo() {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(demos_root())
        .expect("demos should exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();
    assert!(!entries.is_empty());

    for dir in entries {
        let output = run(&["validate", "--scripts-dir", dir.to_str().expect("utf-8 path")]);
        let out = stdout(&output);
        assert!(output.status.success(), "validate failed for {}: {}", dir.display(), out);
        assert!(out.contains("RESULT:OK"));
        assert!(out.contains("NODES:"));
    }
}

#[test]
fn agent_reply_flow_reaches_end() {
    let state_1 = temp_state("choices-1");
    let state_2 = temp_state("choices-2");

    let start = run(&[
        "agent",
        "start",
        "--scripts-dir",
        &demo("02-choices"),
        "--state-out",
        &state_1,
    ]);
    assert!(start.status.success(), "start failed");
    let start_stdout = stdout(&start);
    assert!(start_stdout.contains("RESULT:OK"));
    assert!(start_stdout.contains("EVENT:NODE"));
    assert!(start_stdout.contains("REPLY:0|basic|"));
    assert_eq!(state_out(&start_stdout).as_deref(), Some(state_1.as_str()));

    let choose = run(&[
        "agent",
        "choose",
        "--state-in",
        &state_1,
        "--reply",
        "0",
        "--state-out",
        &state_2,
    ]);
    assert!(choose.status.success(), "choose failed");
    let choose_stdout = stdout(&choose);
    assert!(choose_stdout.contains("EVENT:END"));
    assert!(choose_stdout.contains("STATE_OUT:NONE"));
}

#[test]
fn agent_input_flow_stores_answers() {
    let state_1 = temp_state("inputs-1");
    let state_2 = temp_state("inputs-2");

    let start = run(&[
        "agent",
        "start",
        "--scripts-dir",
        &demo("03-inputs"),
        "--state-out",
        &state_1,
    ]);
    assert!(start.status.success(), "start failed");
    assert!(stdout(&start).contains("REPLY:0|input|"));

    let input = run(&[
        "agent",
        "input",
        "--state-in",
        &state_1,
        "--reply",
        "0",
        "--set",
        "name=Bo",
        "--state-out",
        &state_2,
    ]);
    assert!(input.status.success(), "input failed");
    let input_stdout = stdout(&input);
    assert!(input_stdout.contains("EVENT:NODE"));
    assert!(input_stdout.contains("Bo"));
}

#[test]
fn agent_errors_use_the_error_protocol() {
    let output = run(&[
        "agent",
        "choose",
        "--state-in",
        &temp_state("does-not-exist"),
        "--reply",
        "0",
        "--state-out",
        &temp_state("unused"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("RESULT:ERROR"));
    assert!(out.contains("ERROR_CODE:CLI_STATE_NOT_FOUND"));
}

#[test]
fn play_mode_runs_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_wool-cli"))
        .args([
            "play",
            "--scripts-dir",
            &demo("02-choices"),
            "--state-file",
            &temp_state("play"),
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("play should spawn");
    child
        .stdin
        .as_mut()
        .expect("stdin should be piped")
        .write_all(b":help\n0\n")
        .expect("stdin should accept input");
    let output = child.wait_with_output().expect("play should finish");
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("commands:"));
    assert!(out.contains("[END]"));
}
