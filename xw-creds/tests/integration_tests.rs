//! Integration tests for the xw-creds CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const FULL_ENV: &str = "\
# X developer portal
API_KEY=abc123
export CONSUMER_SECRET=\"xyz789\"
TWITTER_ACCESS_TOKEN=tok1
ACCESS_TOKEN_SECRET: 'tok-secret'
";

/// Isolated config, encrypted credential directory and state file
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let cred_path = temp_dir
            .path()
            .join("credentials")
            .to_string_lossy()
            .replace('\\', "\\\\");
        let state_path = temp_dir
            .path()
            .join("state.toml")
            .to_string_lossy()
            .replace('\\', "\\\\");

        let config_content = format!(
            r#"
[credentials]
storage = "encrypted"
path = "{}"

[state]
path = "{}"
"#,
            cred_path, state_path
        );

        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, config_content).unwrap();

        Self {
            temp_dir,
            config_path,
        }
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("xw-creds").unwrap();
        cmd.env("XWRITE_CONFIG", &self.config_path);
        cmd.env("XWRITE_MASTER_PASSWORD", "test-password-12345");
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_import_full_file() {
    let env = TestEnv::new();
    let file = env.write_file("x.env", FULL_ENV);

    env.cmd()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported credentials"))
        .stdout(predicate::str::contains("encrypted_file"));

    env.cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ API Key"))
        .stdout(predicate::str::contains("✓ Access Secret"))
        .stdout(predicate::str::contains("tok1").not())
        .stdout(predicate::str::contains("abc123").not());
}

#[test]
fn test_import_reports_missing_fields() {
    let env = TestEnv::new();
    let file = env.write_file(
        "partial.env",
        "API_KEY=abc123\nexport CONSUMER_SECRET=\"xyz789\"\nTWITTER_ACCESS_TOKEN=tok1\n",
    );

    env.cmd()
        .arg("import")
        .arg(&file)
        .assert()
        .code(3)
        .stderr(predicate::str::contains(
            "Missing the following variables: ACCESS_SECRET",
        ));

    // Nothing was stored
    env.cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ API Key"));
}

#[test]
fn test_import_missing_file() {
    let env = TestEnv::new();

    env.cmd()
        .args(["import", "/nonexistent/path/to/x.env"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Failed to read credentials file"));
}

#[test]
fn test_setup_with_import_flag() {
    let env = TestEnv::new();
    let file = env.write_file("x.env", FULL_ENV);

    env.cmd()
        .arg("setup")
        .arg("--import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Credentials stored in encrypted_file"));
}

#[test]
fn test_setup_requires_tty() {
    let env = TestEnv::new();

    env.cmd()
        .arg("setup")
        .write_stdin("2\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a TTY"));
}

#[test]
fn test_show_empty() {
    let env = TestEnv::new();

    env.cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ API Key (API_KEY)"))
        .stdout(predicate::str::contains("✗ Access Token (ACCESS_TOKEN)"))
        .stdout(predicate::str::contains("not verified yet"));
}

#[test]
fn test_reset_requires_confirmation() {
    let env = TestEnv::new();

    env.cmd()
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_reset_with_force() {
    let env = TestEnv::new();
    let file = env.write_file("x.env", FULL_ENV);

    env.cmd().arg("import").arg(&file).assert().success();

    env.cmd()
        .args(["reset", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted all stored credentials"));

    env.cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ API Key"))
        .stdout(predicate::str::contains("✗ Access Secret"));
}
