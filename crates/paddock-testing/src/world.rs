//! TestWorld pattern for CLI integration tests.
//!
//! Provides:
//! - An isolated data directory per test
//! - Rich and live payload directories at their default locations
//! - CLI execution with the data directory wired in

use anyhow::Result;
use assert_cmd::Command;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

use crate::fixtures::PayloadDir;

/// Declarative test environment.
///
/// # Example
/// ```no_run
/// use paddock_testing::TestWorld;
///
/// let world = TestWorld::new();
/// let result = world.run(&["cache", "stats"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    rich: PayloadDir,
    live: PayloadDir,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join(".paddock");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        Self {
            rich: PayloadDir::new(data_dir.join("payloads/rich")),
            live: PayloadDir::new(data_dir.join("payloads/live")),
            temp_dir,
            env_vars: HashMap::new(),
        }
    }

    /// Data directory passed as `--data-dir`
    pub fn data_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join(".paddock")
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn rich(&self) -> &PayloadDir {
        &self.rich
    }

    pub fn live(&self) -> &PayloadDir {
        &self.live
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Write `config.toml` into the data directory
    pub fn with_config(self, body: &str) -> Self {
        std::fs::write(self.data_dir().join("config.toml"), body)
            .expect("Failed to write config");
        self
    }

    /// Apply data-dir and environment to a command built by the caller
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("PADDOCK_PATH");
        cmd.env_remove("RUST_LOG");
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run the `paddock` binary with `args`
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("paddock")
            .map_err(|e| anyhow::anyhow!("Failed to find paddock binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run with `--format json` and parse stdout
    pub fn run_json(&self, args: &[&str]) -> Result<(CliResult, serde_json::Value)> {
        let mut full = vec!["--format", "json"];
        full.extend_from_slice(args);
        let result = self.run(&full)?;
        let value = result.json()?;
        Ok((result, value))
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
