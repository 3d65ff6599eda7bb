//! Process-based command runner
//!
//! Runs collaborator CLIs as direct OS processes with captured output.

use async_trait::async_trait;
use stackctl_core::{StackError, StackResult};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

use crate::traits::{CommandOutput, CommandRunner, CommandSpec};

/// Runs commands on the local host
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner
    pub fn new() -> Self {
        Self
    }

    /// Build the process for a command spec
    fn build_command(&self, spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);

        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        // Configure process I/O
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // a timed-out command is killed when its future is dropped
        cmd.kill_on_drop(true);

        cmd
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> StackResult<CommandOutput> {
        debug!(command = %spec, timeout_secs = spec.timeout.as_secs(), "Running command");

        let child = self.build_command(spec).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StackError::Prerequisite(format!("{} not found on PATH", spec.program))
            } else {
                error!(command = %spec, error = %e, "Failed to spawn command");
                StackError::Io(e)
            }
        })?;

        match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let out = CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                debug!(command = %spec, code = ?out.code, "Command finished");
                Ok(out)
            }
            Ok(Err(e)) => Err(StackError::Io(e)),
            Err(_) => Err(StackError::Transient(format!(
                "`{}` timed out after {}s",
                spec,
                spec.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_binary_is_prerequisite_error() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("stackctl-definitely-missing-binary", Duration::from_secs(5));
        let err = runner.run(&spec).await.unwrap_err();
        assert!(matches!(err, StackError::Prerequisite(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sh", Duration::from_secs(5))
            .args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = runner.run(&spec).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_transient() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sleep", Duration::from_millis(100)).arg("5");
        let err = runner.run(&spec).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_command_display() {
        let spec = CommandSpec::new("kubectl", Duration::from_secs(1)).args(["get", "pods"]);
        assert_eq!(spec.to_string(), "kubectl get pods");
    }
}
