//! Prerequisite checks for collaborator tools
//!
//! Every client binary is checked first. Requirements marked reachable also
//! run a command that needs the far side (cluster API, cloud account).

use stackctl_core::{Requirement, StackError, StackResult, Tool};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::traits::{CommandOutput, CommandRunner, CommandSpec};

/// Result of the check for a single tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub tool: Tool,
    pub available: bool,
    pub detail: String,
}

/// Command proving a tool is usable
fn probe_command(tool: Tool, timeout: Duration) -> CommandSpec {
    let spec = CommandSpec::new(tool.binary(), timeout);
    match tool {
        // the daemon must answer, not just the client binary
        Tool::Docker => spec.args(["info", "--format", "{{.ServerVersion}}"]),
        Tool::Kubectl => spec.args(["version", "--client"]),
        Tool::Terraform => spec.arg("version"),
        Tool::Aws => spec.arg("--version"),
    }
}

fn first_line<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(fallback)
}

/// Output of a successful run, or why the command is not usable
async fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<CommandOutput, String> {
    match runner.run(spec).await {
        Ok(output) if output.success() => Ok(output),
        Ok(output) => Err(first_line(&output.stderr, "not usable").to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Check one tool
pub async fn check_tool(runner: &dyn CommandRunner, tool: Tool, timeout: Duration) -> ToolCheck {
    let spec = probe_command(tool, timeout);
    match run_checked(runner, &spec).await {
        Ok(output) => {
            let detail = first_line(&output.combined(), "available").to_string();
            debug!(tool = %tool, detail = %detail, "Tool available");
            ToolCheck {
                tool,
                available: true,
                detail,
            }
        }
        Err(detail) => ToolCheck {
            tool,
            available: false,
            detail,
        },
    }
}

/// Check every requirement, reporting all failures in a single error
///
/// `remote` builds the command proving the far side of a reachable
/// requirement answers; a tool it has no command for needs no extra check.
pub async fn check_requirements<F>(
    runner: &dyn CommandRunner,
    requirements: &[Requirement],
    timeout: Duration,
    remote: F,
) -> StackResult<()>
where
    F: Fn(Tool) -> Option<CommandSpec>,
{
    let mut missing = Vec::new();
    for requirement in requirements {
        let check = check_tool(runner, requirement.tool, timeout).await;
        if !check.available {
            missing.push(format!("{} ({})", check.tool, check.detail));
            continue;
        }
        if !requirement.reachable {
            continue;
        }
        if let Some(spec) = remote(requirement.tool) {
            if let Err(detail) = run_checked(runner, &spec).await {
                warn!(tool = %requirement.tool, detail = %detail, "Remote side unreachable");
                missing.push(format!("{} unreachable ({})", requirement.tool, detail));
            }
        }
    }

    if missing.is_empty() {
        info!(tools = requirements.len(), "All prerequisites satisfied");
        Ok(())
    } else {
        Err(StackError::Prerequisite(format!(
            "missing or unusable: {}",
            missing.join(", ")
        )))
    }
}
