//! Bounded execution of generated code.
//!
//! Each run gets a fresh scratch directory, a cleared environment, its own
//! process group, an address-space ceiling and a wall-clock timeout. A run
//! that exceeds the timeout has its whole process group killed.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;

use crate::config::SandboxConfig;

const MAX_STREAM_CHARS: usize = 10_000;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {interpreter}: {reason}")]
    Spawn { interpreter: String, reason: String },

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Execution exited with code {exit_code}: {stderr}")]
    Failed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

/// Result of a run that exited successfully.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl ExecutionOutcome {
    /// Text handed back to the reasoning capability.
    pub fn render(&self) -> String {
        let mut result = format!("Exit code: {}\n", self.exit_code);
        if !self.stdout.is_empty() {
            result.push_str("\n--- stdout ---\n");
            result.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            result.push_str("\n--- stderr ---\n");
            result.push_str(&self.stderr);
        }
        result
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Runs source code through an interpreter under resource limits.
#[derive(Debug, Clone)]
pub struct Sandbox {
    interpreter: String,
    extension: String,
    timeout: Duration,
    memory_limit_bytes: u64,
}

impl Sandbox {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            extension: extension_for(&config.interpreter).to_string(),
            interpreter: config.interpreter.clone(),
            timeout: config.timeout(),
            memory_limit_bytes: config.memory_limit_bytes(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub async fn run(&self, code: &str) -> Result<ExecutionOutcome, SandboxError> {
        let scratch = tempfile::Builder::new().prefix("docforge-sandbox-").tempdir()?;
        let script = scratch.path().join(format!("main.{}", self.extension));
        tokio::fs::write(&script, code).await?;

        tracing::info!(
            "Running generated code with {} (timeout {:?}, memory {} MB)",
            self.interpreter,
            self.timeout,
            self.memory_limit_bytes / (1024 * 1024)
        );

        let mut cmd = self.command(&script, scratch.path());
        let started = Instant::now();

        let child = cmd.spawn().map_err(|e| SandboxError::Spawn {
            interpreter: self.interpreter.clone(),
            reason: e.to_string(),
        })?;
        let pid = child.id();

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                // Dropping the wait future kills the direct child; the group
                // kill also reaps anything it forked.
                kill_process_group(pid);
                tracing::warn!("Generated code timed out after {:?}", self.timeout);
                return Err(SandboxError::Timeout(self.timeout));
            }
        };

        let duration = started.elapsed();
        let stdout = crate::tools::truncate(&String::from_utf8_lossy(&output.stdout), MAX_STREAM_CHARS);
        let stderr = crate::tools::truncate(&String::from_utf8_lossy(&output.stderr), MAX_STREAM_CHARS);
        let exit_code = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            return Err(SandboxError::Failed {
                exit_code,
                stdout,
                stderr,
            });
        }

        Ok(ExecutionOutcome {
            exit_code,
            stdout,
            stderr,
            duration,
        })
    }

    fn command(&self, script: &Path, workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script)
            .current_dir(workdir)
            .env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string()))
            .env("HOME", workdir)
            .env("LANG", "C.UTF-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            let limit = self.memory_limit_bytes;
            cmd.process_group(0);
            // SAFETY: setrlimit is async-signal-safe and touches no parent state.
            unsafe {
                cmd.pre_exec(move || {
                    let rlim = libc::rlimit {
                        rlim_cur: limit as libc::rlim_t,
                        rlim_max: limit as libc::rlim_t,
                    };
                    if libc::setrlimit(libc::RLIMIT_AS, &rlim) != 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        cmd
    }
}

fn extension_for(interpreter: &str) -> &'static str {
    let name = Path::new(interpreter)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(interpreter);
    match name {
        n if n.starts_with("python") => "py",
        "node" | "deno" | "bun" => "js",
        "sh" | "bash" | "dash" | "zsh" => "sh",
        _ => "txt",
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: plain syscall; a stale group id only yields ESRCH.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_sandbox(timeout_ms: u64) -> Sandbox {
        Sandbox::new(&SandboxConfig {
            interpreter: "sh".to_string(),
            timeout_ms,
            memory_mb: 256,
        })
    }

    #[test]
    fn extension_follows_interpreter() {
        assert_eq!(extension_for("python3"), "py");
        assert_eq!(extension_for("/usr/bin/python3.12"), "py");
        assert_eq!(extension_for("sh"), "sh");
        assert_eq!(extension_for("ruby"), "txt");
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_run() {
        let outcome = shell_sandbox(5_000).run("echo hello; echo oops >&2").await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "hello\n");
        assert_eq!(outcome.stderr, "oops\n");
        assert!(outcome.render().contains("--- stdout ---\nhello"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let err = shell_sandbox(5_000).run("echo broken >&2; exit 3").await.unwrap_err();
        match err {
            SandboxError::Failed { exit_code, stderr, .. } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn infinite_loop_is_terminated_by_timeout() {
        let started = Instant::now();
        let err = shell_sandbox(300).run("while :; do :; done").await.unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(d) if d == Duration::from_millis(300)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn environment_is_cleared() {
        std::env::set_var("DOCFORGE_SANDBOX_SECRET", "leak");
        let outcome = shell_sandbox(5_000)
            .run("echo \"[${DOCFORGE_SANDBOX_SECRET}]\"")
            .await
            .unwrap();
        assert_eq!(outcome.stdout, "[]\n");
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_error() {
        let sandbox = Sandbox::new(&SandboxConfig {
            interpreter: "docforge-no-such-interpreter".to_string(),
            timeout_ms: 1_000,
            memory_mb: 64,
        });
        let err = sandbox.run("print(1)").await.unwrap_err();
        assert!(matches!(err, SandboxError::Spawn { .. }));
    }
}
