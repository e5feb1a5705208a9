//! Black-box tests of the `shivvie` binary against on-disk fixture modules.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A scratch directory with an empty config file, so the user's own
/// configuration never leaks into a run.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn shivvie(&self) -> Command {
        let mut cmd = Command::cargo_bin("shivvie").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .arg("--no-color")
            .arg("--config")
            .arg(self.path("config.toml"));
        cmd
    }
}

// ── basics ────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_commands() {
    Command::cargo_bin("shivvie")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn version_flag() {
    Command::cargo_bin("shivvie")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_exits_2() {
    Command::cargo_bin("shivvie")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .code(2);
}

// ── exec ──────────────────────────────────────────────────────────────────────

#[test]
fn exec_renders_module_into_target() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .arg("exec")
        .arg(fixture("hello"))
        .arg("out")
        .args(["--data", "{ name: 'MyApp' }"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 2 actions"));

    assert_eq!(
        fs::read_to_string(sandbox.path("out/my_app.txt")).unwrap(),
        "Hello, MyApp!\n"
    );
    assert_eq!(
        fs::read_to_string(sandbox.path("out/README.md")).unwrap(),
        "# MyApp\n"
    );
}

#[test]
fn exec_json_report() {
    let sandbox = Sandbox::new();

    let assert = sandbox
        .shivvie()
        .args(["--output-format", "json", "exec"])
        .arg(fixture("hello"))
        .arg("out")
        .args(["-d", r#"{"name": "x"}"#])
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["actionsApplied"], 2);
    assert_eq!(report["modulesExecuted"], 1);
}

#[test]
fn exec_rejects_malformed_data() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .arg("exec")
        .arg(fixture("hello"))
        .arg("out")
        .args(["--data", "{ name: "])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid --data"));

    assert!(!sandbox.path("out").exists());
}

#[test]
fn exec_rejects_non_object_data() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .arg("exec")
        .arg(fixture("hello"))
        .arg("out")
        .args(["--data", "[1, 2]"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected an object"));
}

#[test]
fn exec_with_invalid_input_writes_nothing() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .arg("exec")
        .arg(fixture("hello"))
        .arg("out")
        .assert()
        .code(2);

    assert!(!sandbox.path("out").exists());
}

#[test]
fn exec_missing_module_exits_3() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .args(["exec", "./no-such-module", "out"])
        .assert()
        .code(3);
}

#[test]
fn exec_malformed_uri_exits_2() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .args(["exec", "gh:not-a-repo", "out"])
        .assert()
        .code(2);
}

#[test]
fn exec_target_must_not_be_a_file() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("taken"), "").unwrap();

    sandbox
        .shivvie()
        .arg("exec")
        .arg(fixture("hello"))
        .arg("taken")
        .args(["--data", "{ name: 'x' }"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn dry_run_prints_plan_and_writes_nothing() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .arg("exec")
        .arg(fixture("hello"))
        .arg("out")
        .args(["--data", "{ name: 'MyApp' }", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run: 2 actions"))
        .stdout(predicate::str::contains("my_app.txt"))
        .stdout(predicate::str::contains("cascade"));

    assert!(!sandbox.path("out").exists());
}

// ── info ──────────────────────────────────────────────────────────────────────

#[test]
fn info_describes_input() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .arg("info")
        .arg(fixture("hello"))
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("Writes a greeting"))
        .stdout(predicate::str::contains("{ name: string }"));
}

#[test]
fn info_json() {
    let sandbox = Sandbox::new();

    let assert = sandbox
        .shivvie()
        .arg("info")
        .arg(fixture("hello"))
        .args(["--format", "json"])
        .assert()
        .success();

    let info: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(info["name"], "hello");
    assert_eq!(info["input"], "{ name: string }");
    assert_eq!(info["schema"]["required"][0], "name");
}

// ── config / init / completions ──────────────────────────────────────────────

#[test]
fn config_get_reads_file() {
    let sandbox = Sandbox::new();
    fs::write(
        sandbox.path("config.toml"),
        "[engine]\nmax_delegate_depth = 4\n",
    )
    .unwrap();

    sandbox
        .shivvie()
        .args(["config", "get", "engine.max_delegate_depth"])
        .assert()
        .success()
        .stdout(predicate::str::diff("4\n"));
}

#[test]
fn environment_overrides_file() {
    let sandbox = Sandbox::new();
    fs::write(
        sandbox.path("config.toml"),
        "[engine]\nmax_delegate_depth = 4\n",
    )
    .unwrap();

    sandbox
        .shivvie()
        .env("SHIVVIE_ENGINE__MAX_DELEGATE_DEPTH", "7")
        .args(["config", "get", "engine.max_delegate_depth"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));
}

#[test]
fn config_unknown_key_exits_4() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .args(["config", "get", "engine.nope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn broken_config_file_exits_4() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("config.toml"), "[engine\n").unwrap();

    sandbox.shivvie().args(["config", "list"]).assert().code(4);
}

#[test]
fn config_path_follows_flag() {
    let sandbox = Sandbox::new();

    sandbox
        .shivvie()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn init_writes_defaults_once() {
    let sandbox = Sandbox::new();
    let path = sandbox.path("fresh/config.toml");

    let init = || {
        let mut cmd = Command::cargo_bin("shivvie").unwrap();
        cmd.current_dir(sandbox.path(""))
            .arg("--config")
            .arg(&path)
            .arg("init");
        cmd
    };

    init().assert().success();
    assert!(fs::read_to_string(&path).unwrap().contains("[engine]"));

    fs::write(&path, "# placeholder\n").unwrap();
    init()
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "# placeholder\n");

    init().arg("--force").assert().success();
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("max_delegate_depth = 32"));
    assert!(written.contains("[registry]"));
}

#[test]
fn completions_mention_binary() {
    Command::cargo_bin("shivvie")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shivvie"));
}
