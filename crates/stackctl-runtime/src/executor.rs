//! Production executor
//!
//! Dispatches each descriptor to the collaborator owning its kind, retries
//! transient failures and folds every result into an [`OperationOutcome`].

use async_trait::async_trait;
use stackctl_core::{
    ContainerState, OperationOutcome, PodReadiness, ResourceDescriptor, ResourceKind,
    Requirement, StackConfig, StackResult, Tool,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::aws::AwsClient;
use crate::classify::Change;
use crate::compose::ComposeClient;
use crate::kubectl::KubectlClient;
use crate::prereq;
use crate::retry::RetryPolicy;
use crate::terraform::TerraformClient;
use crate::traits::{CommandRunner, Executor, InfraProvider};

/// Executor backed by the `kubectl`, `terraform`, `aws` and `docker` CLIs
pub struct StackExecutor {
    runner: Arc<dyn CommandRunner>,
    kubectl: KubectlClient,
    terraform: TerraformClient,
    aws: AwsClient,
    compose: ComposeClient,
    retry: RetryPolicy,
    image: String,
    infra_label: String,
    update_kubeconfig: bool,
    command_timeout: Duration,
}

impl StackExecutor {
    /// Create an executor for one environment
    pub fn new(config: &StackConfig, environment: &str, runner: Arc<dyn CommandRunner>) -> Self {
        let mut compose_env = config.workload.to_env();
        compose_env.push(("ENVIRONMENT".to_string(), environment.to_string()));

        Self {
            kubectl: KubectlClient::new(runner.clone(), &config.cluster, &config.timeouts),
            terraform: TerraformClient::new(
                runner.clone(),
                &config.infrastructure,
                &config.timeouts,
                config.workload.to_terraform_env(environment),
            ),
            aws: AwsClient::new(runner.clone(), &config.infrastructure, &config.timeouts),
            compose: ComposeClient::new(
                runner.clone(),
                &config.project,
                &config.containers,
                &config.timeouts,
                compose_env,
            ),
            runner,
            retry: RetryPolicy::from(&config.retry),
            image: config.project.image.clone(),
            infra_label: ResourceDescriptor::new(
                config.project.name.as_str(),
                ResourceKind::InfrastructureStack,
            )
            .label(),
            update_kubeconfig: config.infrastructure.update_kubeconfig,
            command_timeout: Duration::from_secs(config.timeouts.command_secs),
        }
    }

    async fn provision(&self) -> StackResult<Change> {
        let change = self.terraform.apply().await?;
        if self.update_kubeconfig {
            self.aws.update_kubeconfig().await?;
        }
        Ok(change)
    }

    async fn apply_once(&self, descriptor: &ResourceDescriptor) -> StackResult<Change> {
        match descriptor.kind {
            ResourceKind::ContainerSet => self.compose.up().await,
            ResourceKind::InfrastructureStack => self.provision().await,
            _ => self.kubectl.apply(descriptor).await,
        }
    }

    async fn delete_once(&self, descriptor: &ResourceDescriptor) -> StackResult<Change> {
        match descriptor.kind {
            ResourceKind::ContainerSet => self.compose.down().await,
            _ => self.kubectl.delete(descriptor).await,
        }
    }
}

/// Fold a classified result into an outcome, logging it
fn outcome(resource: &str, result: StackResult<Change>, attempts: u32) -> OperationOutcome {
    match result {
        Ok(Change::Changed(message)) => {
            info!(resource = %resource, attempts = attempts, status = "applied", "{}", message);
            OperationOutcome::applied(resource, message, attempts)
        }
        Ok(Change::Unchanged(message)) => {
            info!(resource = %resource, attempts = attempts, status = "alreadyExists", "{}", message);
            OperationOutcome::already_exists(resource, message, attempts)
        }
        Err(e) => {
            error!(resource = %resource, attempts = attempts, status = "failed", error = %e, "Operation failed");
            OperationOutcome::failed(resource, e.to_string(), attempts)
        }
    }
}

#[async_trait]
impl Executor for StackExecutor {
    async fn verify_prerequisites(&self, requirements: &[Requirement]) -> StackResult<()> {
        prereq::check_requirements(
            self.runner.as_ref(),
            requirements,
            self.command_timeout,
            |tool| match tool {
                Tool::Kubectl => Some(self.kubectl.cluster_info_command()),
                Tool::Aws => Some(self.aws.identity_command()),
                // `docker info` already needs the daemon
                Tool::Docker | Tool::Terraform => None,
            },
        )
        .await
    }

    async fn apply(&self, descriptor: &ResourceDescriptor) -> OperationOutcome {
        let label = descriptor.label();
        let (result, attempts) = self
            .retry
            .run(&label, || self.apply_once(descriptor))
            .await;
        outcome(&label, result, attempts)
    }

    async fn delete(&self, descriptor: &ResourceDescriptor) -> OperationOutcome {
        let label = descriptor.label();
        if descriptor.destructive_only {
            warn!(resource = %label, "Refusing generic delete of a destroy-only resource");
            return OperationOutcome::skipped(label, "removed only by the infrastructure destroy path");
        }
        let (result, attempts) = self
            .retry
            .run(&label, || self.delete_once(descriptor))
            .await;
        outcome(&label, result, attempts)
    }

    async fn build_image(&self) -> OperationOutcome {
        let label = format!("image/{}", self.image);
        let (result, attempts) = self.retry.run(&label, || self.compose.build()).await;
        outcome(&label, result, attempts)
    }

    async fn destroy_infrastructure(&self, provider: InfraProvider) -> OperationOutcome {
        let label = format!("{} ({})", self.infra_label, provider);
        warn!(resource = %label, "Destroying infrastructure");
        let (result, attempts) = match provider {
            InfraProvider::Terraform => {
                self.retry
                    .run(&label, || self.terraform.destroy())
                    .await
            }
            InfraProvider::CloudFormation => {
                self.retry
                    .run(&label, || self.aws.delete_stack())
                    .await
            }
        };
        outcome(&label, result, attempts)
    }

    async fn pod_readiness(&self) -> StackResult<PodReadiness> {
        self.kubectl.pod_readiness().await
    }

    async fn list_resources(&self) -> StackResult<Vec<String>> {
        self.kubectl.list_resources().await
    }

    async fn container_states(&self) -> StackResult<Vec<ContainerState>> {
        self.compose.ps().await
    }

    async fn infrastructure_outputs(&self) -> StackResult<Vec<(String, String)>> {
        self.terraform.outputs().await
    }

    async fn condition_met(&self, descriptor: &ResourceDescriptor) -> StackResult<bool> {
        match descriptor.kind {
            ResourceKind::ContainerSet => {
                let states = self.compose.ps().await?;
                Ok(!states.is_empty() && states.iter().all(|s| s.running))
            }
            ResourceKind::InfrastructureStack => {
                Ok(!self.terraform.state_list().await?.is_empty())
            }
            _ => self.kubectl.condition_met(descriptor).await,
        }
    }

    fn name(&self) -> &'static str {
        "stack"
    }
}
