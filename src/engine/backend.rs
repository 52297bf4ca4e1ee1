//! Invocation boundary to the `shortcuts` command-line tool.
//!
//! Everything the pipeline knows about the outside world goes through
//! [`ShortcutsBackend`]: one call to enumerate shortcut names, one
//! best-effort metadata fetch, and one execution call. Tests swap in a
//! mock; production uses [`CliBackend`] over `tokio::process`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Captured output of one external invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// The external system boundary.
#[async_trait]
pub trait ShortcutsBackend: Send + Sync {
    /// Enumerate available shortcut names.
    async fn list_names(&self) -> Result<Vec<String>>;

    /// Fetch free-text or structured metadata for one shortcut.
    ///
    /// Best-effort: `Ok(None)` when the underlying command is
    /// unavailable or fails.
    async fn view(&self, name: &str) -> Result<Option<String>>;

    /// Run a shortcut, passing `input` on stdin when present.
    ///
    /// The future owns the child process; dropping it (as the
    /// coordinator does on timeout) terminates the child.
    async fn run(&self, name: &str, input: Option<&str>) -> Result<RunOutput>;
}

/// Production backend invoking the `shortcuts` binary.
pub struct CliBackend {
    bin: String,
}

impl CliBackend {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Probe that the `shortcuts` binary is present and runnable.
    ///
    /// A missing binary is fatal to pipeline initialization; failing
    /// here keeps the error out of the per-request path.
    pub async fn ensure_available(&self) -> Result<()> {
        let probe = Command::new(&self.bin)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match probe {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::Environment(format!(
                "'{}' binary not found on PATH; s7s requires the macOS Shortcuts CLI",
                self.bin
            ))),
            Err(e) => Err(Error::Environment(format!(
                "failed to probe '{}': {}",
                self.bin, e
            ))),
        }
    }
}

#[async_trait]
impl ShortcutsBackend for CliBackend {
    async fn list_names(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.bin)
            .arg("list")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Execution(format!("failed to run '{} list': {}", self.bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Execution(format!(
                "'{} list' exited with {}: {}",
                self.bin,
                output.status,
                stderr.trim()
            )));
        }

        // One shortcut name per line
        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    async fn view(&self, name: &str) -> Result<Option<String>> {
        let output = Command::new(&self.bin)
            .args(["view", name])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
                Ok(if text.is_empty() { None } else { Some(text) })
            }
            Ok(out) => {
                debug!(
                    shortcut = %name,
                    status = %out.status,
                    "shortcut detail fetch failed, continuing without detail"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(shortcut = %name, "shortcut detail fetch errored: {}", e);
                Ok(None)
            }
        }
    }

    async fn run(&self, name: &str, input: Option<&str>) -> Result<RunOutput> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["run", name])
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The coordinator drops this future on timeout; the child
            // must not outlive it.
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Execution(format!("failed to spawn '{} run': {}", self.bin, e)))?;

        if let Some(input) = input {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| Error::Execution("child stdin unavailable".to_string()))?;
            stdin.write_all(input.as_bytes()).await?;
            drop(stdin); // close the pipe so the shortcut sees EOF
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Execution(format!("failed to wait for shortcut: {}", e)))?;

        Ok(RunOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
