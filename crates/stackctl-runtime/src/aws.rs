//! Cloud provider interface over the `aws` CLI

use serde_json::Value;
use stackctl_core::{InfrastructureConfig, StackError, StackResult, TimeoutConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::classify::{classify_failure, Change};
use crate::traits::{CommandRunner, CommandSpec};

/// Client for the CloudFormation stack and managed cluster credentials
pub struct AwsClient {
    runner: Arc<dyn CommandRunner>,
    region: String,
    cluster_name: String,
    stack_name: String,
    command_timeout: Duration,
    destroy_timeout: Duration,
}

impl AwsClient {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        infra: &InfrastructureConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            runner,
            region: infra.region.clone(),
            cluster_name: infra.cluster_name.clone(),
            stack_name: infra.cloudformation_stack.clone(),
            command_timeout: Duration::from_secs(timeouts.command_secs),
            destroy_timeout: Duration::from_secs(timeouts.destroy_secs),
        }
    }

    fn command(&self, timeout: Duration) -> CommandSpec {
        CommandSpec::new("aws", timeout).args(["--region", self.region.as_str()])
    }

    /// `aws sts get-caller-identity`, which needs valid account credentials
    pub fn identity_command(&self) -> CommandSpec {
        self.command(self.command_timeout)
            .args(["sts", "get-caller-identity"])
    }

    /// Current stack status, `None` when the stack does not exist
    pub async fn stack_status(&self) -> StackResult<Option<String>> {
        let spec = self.command(self.command_timeout).args([
            "cloudformation",
            "describe-stacks",
            "--stack-name",
            self.stack_name.as_str(),
            "--output",
            "json",
        ]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            if output.stderr.contains("does not exist") {
                return Ok(None);
            }
            return Err(classify_failure("describe-stacks", &output));
        }

        let doc: Value = serde_json::from_str(&output.stdout)?;
        let status = doc["Stacks"][0]["StackStatus"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StackError::Serialization("describe-stacks returned no status".into()))?;
        Ok(Some(status))
    }

    /// Delete the stack and block until deletion completes
    pub async fn delete_stack(&self) -> StackResult<Change> {
        if self.stack_status().await?.is_none() {
            return Ok(Change::Unchanged(format!(
                "stack {} does not exist",
                self.stack_name
            )));
        }

        let spec = self.command(self.command_timeout).args([
            "cloudformation",
            "delete-stack",
            "--stack-name",
            self.stack_name.as_str(),
        ]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("delete-stack", &output));
        }
        info!(stack = %self.stack_name, "Waiting for stack deletion");

        let wait = self.command(self.destroy_timeout).args([
            "cloudformation",
            "wait",
            "stack-delete-complete",
            "--stack-name",
            self.stack_name.as_str(),
        ]);
        let output = self.runner.run(&wait).await?;
        if !output.success() {
            return Err(classify_failure("wait stack-delete-complete", &output));
        }
        Ok(Change::Changed(format!("stack {} deleted", self.stack_name)))
    }

    /// Point the local cluster configuration at the provisioned cluster
    pub async fn update_kubeconfig(&self) -> StackResult<()> {
        let spec = self.command(self.command_timeout).args([
            "eks",
            "update-kubeconfig",
            "--name",
            self.cluster_name.as_str(),
        ]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("update-kubeconfig", &output));
        }
        debug!(cluster = %self.cluster_name, "kubeconfig updated");
        Ok(())
    }
}
