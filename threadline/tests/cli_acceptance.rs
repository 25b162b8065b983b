use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    /// Path of a core fixture log
    fn fixture(&self, name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../threadline-core/tests/fixtures")
            .join(name)
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).expect("failed to write test file");
        path
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("threadline"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute threadline: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "threadline {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn timeline_text_lists_activities_in_order() {
    let env = CliTestEnv::new();
    let log = env.fixture("mixed-session.jsonl");
    let args = ["timeline", log.to_str().unwrap()];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 7, "unexpected timeline:\n{stdout}");
    assert!(lines[0].contains("todo_update"));
    assert!(lines[2].contains("Research: Compare tokio and async-std"));
    assert!(lines[5].contains("Critique: Review the report for accuracy"));

    assert!(
        env.xdg_state.join("threadline").exists(),
        "log directory should be created under XDG_STATE_HOME"
    );
}

#[test]
fn groups_json_is_machine_readable() {
    let env = CliTestEnv::new();
    let log = env.fixture("short-terminal.jsonl");
    let args = ["groups", log.to_str().unwrap(), "--format", "json"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let groups: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let research = &groups[0];
    assert_eq!(research["kind"], "research");
    assert_eq!(research["groups"][0]["status"], "completed");
    assert_eq!(research["groups"][0]["payload_source"], "narrative");
    assert_eq!(groups[1]["groups"].as_array().map(Vec::len), Some(0));
}

#[test]
fn groups_text_reports_empty_kinds() {
    let env = CliTestEnv::new();
    let log = env.fixture("research-completed.jsonl");
    let args = ["groups", log.to_str().unwrap(), "--verbose"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Research (1 group)"));
    assert!(stdout.contains("[completed] 1-3 Survey the Rust 2024 edition changes"));
    assert!(stdout.contains("Planning: no groups"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning:"), "expected orphan warning, got:\n{stderr}");
}

#[test]
fn config_overrides_change_the_payload() {
    let env = CliTestEnv::new();
    let log = env.fixture("short-terminal.jsonl");
    // A terminal of length 2 is no longer a stub
    let config = env.write_file(
        "config.toml",
        "[segmentation.research]\nmin_terminal_len = 1\n",
    );
    let args = [
        "groups",
        log.to_str().unwrap(),
        "--format",
        "json",
        "--config",
        config.to_str().unwrap(),
    ];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let groups: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(groups[0]["groups"][0]["final_payload"], "ok");
    assert_eq!(groups[0]["groups"][0]["payload_source"], "terminal");
}

#[test]
fn malformed_log_fails_with_line_number() {
    let env = CliTestEnv::new();
    let log = env.write_file(
        "broken.jsonl",
        "{\"type\": \"human\", \"index\": 0, \"content\": \"hi\"}\nnot json\n",
    );
    let args = ["timeline", log.to_str().unwrap()];

    let output = run_bin(&env, &args);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "expected line number, got:\n{stderr}");
}

#[test]
fn invalid_config_is_rejected() {
    let env = CliTestEnv::new();
    let log = env.fixture("research-completed.jsonl");
    let config = env.write_file(
        "config.toml",
        "[segmentation.planning]\nmin_narrative_len = 0\n",
    );
    let args = [
        "timeline",
        log.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ];

    let output = run_bin(&env, &args);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("min_narrative_len"));
}
