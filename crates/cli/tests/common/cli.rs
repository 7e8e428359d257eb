//! Helpers for driving the `clog` binary
//!
//! Every command runs inside a [`Sandbox`]: a temporary directory holding the
//! workbook snapshot and config file, with the XDG data directory pointed
//! into it so session logs and settings never touch the real home.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Isolated directory for one test
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create sandbox")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.path().join("workbook.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn data_home(&self) -> PathBuf {
        self.path().join("data")
    }

    /// A `clog` invocation bound to this sandbox
    pub fn clog(&self, args: &[&str]) -> ClogCommand {
        let mut cmd = ClogCommand::new(self.path());
        cmd.args(&["--workbook", &self.workbook_path().to_string_lossy()])
            .args(&["--config", &self.config_path().to_string_lossy()])
            .env("XDG_DATA_HOME", &self.data_home().to_string_lossy())
            .env("CLOG_LOG", "debug")
            .args(args);
        cmd
    }
}

/// CLI command builder with timing
pub struct ClogCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    stdin_data: Option<String>,
}

impl ClogCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_clog")),
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            stdin_data: None,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Lines fed to the process on stdin, which is closed afterwards
    pub fn stdin_lines(&mut self, lines: &[&str]) -> &mut Self {
        let mut data = lines.join("\n");
        data.push('\n');
        self.stdin_data = Some(data);
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn clog")?;

        // Dropping stdin closes it, which ends an interactive session
        if let Some(mut stdin) = child.stdin.take() {
            if let Some(data) = &self.stdin_data {
                stdin.write_all(data.as_bytes())?;
            }
        }

        let output = child.wait_with_output().context("Failed to wait for clog")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Captured output of one run
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}
