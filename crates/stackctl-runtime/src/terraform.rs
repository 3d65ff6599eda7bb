//! Infrastructure provisioning interface over `terraform`

use serde_json::Value;
use stackctl_core::{InfrastructureConfig, StackError, StackResult, TimeoutConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::classify::{classify_failure, Change};
use crate::traits::{CommandRunner, CommandSpec};

/// Client for the declared infrastructure module
pub struct TerraformClient {
    runner: Arc<dyn CommandRunner>,
    module_dir: PathBuf,
    env: Vec<(String, String)>,
    command_timeout: Duration,
    provision_timeout: Duration,
    destroy_timeout: Duration,
    initialised: OnceCell<()>,
}

impl TerraformClient {
    /// `env` carries the `TF_VAR_*` pass-through variables
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        infra: &InfrastructureConfig,
        timeouts: &TimeoutConfig,
        env: Vec<(String, String)>,
    ) -> Self {
        Self {
            runner,
            module_dir: infra.module_dir.clone(),
            env,
            command_timeout: Duration::from_secs(timeouts.command_secs),
            provision_timeout: Duration::from_secs(timeouts.provision_secs),
            destroy_timeout: Duration::from_secs(timeouts.destroy_secs),
            initialised: OnceCell::new(),
        }
    }

    fn command(&self, timeout: Duration) -> CommandSpec {
        CommandSpec::new("terraform", timeout)
            .current_dir(&self.module_dir)
            .envs(&self.env)
            .env("TF_IN_AUTOMATION", "1")
    }

    async fn run_checked(&self, spec: CommandSpec, context: &str) -> StackResult<String> {
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure(context, &output));
        }
        Ok(output.stdout)
    }

    /// `terraform init`, once per client; every other command needs the backend
    async fn init(&self) -> StackResult<()> {
        self.initialised
            .get_or_try_init(|| async {
                let spec = self
                    .command(self.provision_timeout)
                    .args(["init", "-input=false", "-no-color"]);
                self.run_checked(spec, "terraform init").await?;
                debug!(module = %self.module_dir.display(), "terraform initialised");
                Ok::<(), StackError>(())
            })
            .await?;
        Ok(())
    }

    /// `terraform apply -auto-approve`
    pub async fn apply(&self) -> StackResult<Change> {
        self.init().await?;
        let spec = self
            .command(self.provision_timeout)
            .args(["apply", "-auto-approve", "-input=false", "-no-color"]);
        let stdout = self.run_checked(spec, "terraform apply").await?;
        Ok(parse_apply_output(&stdout))
    }

    /// `terraform destroy -auto-approve`, then wait until the state is empty
    pub async fn destroy(&self) -> StackResult<Change> {
        self.init().await?;
        let spec = self
            .command(self.destroy_timeout)
            .args(["destroy", "-auto-approve", "-input=false", "-no-color"]);
        let stdout = self.run_checked(spec, "terraform destroy").await?;
        let change = parse_destroy_output(&stdout);

        let remaining = self.state_list().await?;
        if !remaining.is_empty() {
            return Err(StackError::Operation(format!(
                "terraform destroy left {} resources in state: {}",
                remaining.len(),
                remaining.join(", ")
            )));
        }
        info!(module = %self.module_dir.display(), "Infrastructure state is empty");
        Ok(change)
    }

    /// Addresses still tracked in state
    pub async fn state_list(&self) -> StackResult<Vec<String>> {
        self.init().await?;
        let spec = self.command(self.command_timeout).args(["state", "list"]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            // no state at all means nothing is left
            if output.stderr.contains("No state file was found") {
                return Ok(Vec::new());
            }
            return Err(classify_failure("terraform state list", &output));
        }
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Named outputs, sensitive values masked
    pub async fn outputs(&self) -> StackResult<Vec<(String, String)>> {
        self.init().await?;
        let spec = self.command(self.command_timeout).args(["output", "-json"]);
        let stdout = self.run_checked(spec, "terraform output").await?;
        parse_outputs(&stdout)
    }
}

fn parse_apply_output(stdout: &str) -> Change {
    let summary = stdout
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("Apply complete!") || l.starts_with("No changes."))
        .unwrap_or("apply finished")
        .to_string();
    if summary.starts_with("No changes.") || summary.contains("0 added, 0 changed, 0 destroyed") {
        Change::Unchanged(summary)
    } else {
        Change::Changed(summary)
    }
}

fn parse_destroy_output(stdout: &str) -> Change {
    let summary = stdout
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("Destroy complete!") || l.starts_with("No changes."))
        .unwrap_or("destroy finished")
        .to_string();
    if summary.contains("Resources: 0 destroyed") || summary.starts_with("No changes.") {
        Change::Unchanged(summary)
    } else {
        Change::Changed(summary)
    }
}

fn parse_outputs(stdout: &str) -> StackResult<Vec<(String, String)>> {
    let doc: Value = serde_json::from_str(stdout)?;
    let map = doc
        .as_object()
        .ok_or_else(|| StackError::Serialization("terraform output is not an object".into()))?;

    let mut outputs: Vec<(String, String)> = map
        .iter()
        .map(|(name, entry)| {
            let value = if entry["sensitive"].as_bool() == Some(true) {
                "<sensitive>".to_string()
            } else {
                match &entry["value"] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            };
            (name.clone(), value)
        })
        .collect();
    outputs.sort();
    Ok(outputs)
}
