//! Executor and command runner trait definitions

use async_trait::async_trait;
use stackctl_core::{
    ContainerState, OperationOutcome, PodReadiness, Requirement, ResourceDescriptor, StackResult,
};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Which provisioning interface owns the infrastructure stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraProvider {
    Terraform,
    CloudFormation,
}

impl fmt::Display for InfraProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfraProvider::Terraform => write!(f, "terraform"),
            InfraProvider::CloudFormation => write!(f, "cloudformation"),
        }
    }
}

/// Side-effecting operations against the external systems
///
/// Mutating calls never fail at the Rust level: every error is folded into
/// the returned [`OperationOutcome`] so the orchestrator can record it.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Fail with a prerequisite error if any requirement is not met
    async fn verify_prerequisites(&self, requirements: &[Requirement]) -> StackResult<()>;

    /// Idempotently create or update a resource
    async fn apply(&self, descriptor: &ResourceDescriptor) -> OperationOutcome;

    /// Delete a resource; an absent resource is not a failure
    async fn delete(&self, descriptor: &ResourceDescriptor) -> OperationOutcome;

    /// Build the workload image
    async fn build_image(&self) -> OperationOutcome;

    /// Irreversibly destroy the infrastructure stack and wait until it is gone
    async fn destroy_infrastructure(&self, provider: InfraProvider) -> OperationOutcome;

    /// Ready versus total pods in the namespace
    async fn pod_readiness(&self) -> StackResult<PodReadiness>;

    /// Names of the objects present in the namespace
    async fn list_resources(&self) -> StackResult<Vec<String>>;

    /// State of every container of the local set
    async fn container_states(&self) -> StackResult<Vec<ContainerState>>;

    /// Named outputs of the provisioned infrastructure
    async fn infrastructure_outputs(&self) -> StackResult<Vec<(String, String)>>;

    /// Whether a resource reports its ready condition
    async fn condition_met(&self, descriptor: &ResourceDescriptor) -> StackResult<bool>;

    /// Get the executor name
    fn name(&self) -> &'static str;
}

/// One external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs(mut self, env: &[(String, String)]) -> Self {
        self.env.extend(env.iter().cloned());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr together; some tools report progress on stderr
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs external commands
///
/// A non-zero exit is returned as output, not as an error; only spawn
/// failures (missing binary) and timeouts are errors.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> StackResult<CommandOutput>;
}
