use std::path::Path;

use tokio::process::Command;

/// What a finished external command left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// stdout on success; stderr (or stdout when stderr is empty) on failure;
    /// the spawn error when the program could not start.
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Runs external programs. No retries, no streaming, no stdin.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> CommandOutput;
}

/// Spawns real processes via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> CommandOutput {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(std::process::Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        tracing::debug!(program, ?args, ?cwd, "running command");

        let out = match cmd.output().await {
            Ok(o) => o,
            Err(e) => return CommandOutput::failed(format!("failed to run {program}: {e}")),
        };

        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        if out.status.success() {
            return CommandOutput::ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
        tracing::debug!(program, status = ?out.status.code(), "command failed");
        if stderr.trim().is_empty() {
            CommandOutput::failed(stdout)
        } else {
            CommandOutput::failed(stderr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_a_failure_not_a_panic() {
        let out = SystemRunner
            .run("devkit-definitely-not-a-real-program", &[], None)
            .await;
        assert!(!out.success);
        assert!(out.output.contains("devkit-definitely-not-a-real-program"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_on_success() {
        let out = SystemRunner.run("echo", &["hello"], None).await;
        assert!(out.success);
        assert_eq!(out.output.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stderr_on_failure() {
        let out = SystemRunner
            .run("sh", &["-c", "echo out; echo boom >&2; exit 3"], None)
            .await;
        assert!(!out.success);
        assert_eq!(out.output.trim(), "boom");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn honours_working_directory() {
        let dir = std::env::temp_dir();
        let out = SystemRunner.run("pwd", &[], Some(dir.as_path())).await;
        assert!(out.success);
        let reported = std::fs::canonicalize(out.output.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(&dir).unwrap());
    }
}
