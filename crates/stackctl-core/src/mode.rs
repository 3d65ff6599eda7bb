//! Run modes: what to do, and against which layer of the stack

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StackError;

/// Selected command and deployment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "target", rename_all = "kebab-case")]
pub enum Mode {
    Deploy(DeployTarget),
    Cleanup(CleanupTarget),
    HealthCheck(HealthTarget),
}

/// Deployment types accepted by `deploy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    /// Single-host container set
    Docker,
    /// Resource sequence in the cluster namespace
    Kubernetes,
    /// Infrastructure provisioning only
    Aws,
    /// Infrastructure provisioning, then the cluster sequence
    Full,
}

/// Deployment types accepted by `cleanup`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupTarget {
    Docker,
    Kubernetes,
    /// Terraform-managed infrastructure (`aws` or `terraform`)
    Terraform,
    CloudFormation,
    /// Cluster objects, then infrastructure, then local containers
    All,
}

/// Deployment types accepted by `health-check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTarget {
    Docker,
    Kubernetes,
    Aws,
}

/// External tools the orchestrator drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Docker,
    Kubectl,
    Terraform,
    Aws,
}

impl Tool {
    /// Binary name looked up on the PATH
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Docker => "docker",
            Tool::Kubectl => "kubectl",
            Tool::Terraform => "terraform",
            Tool::Aws => "aws",
        }
    }
}

/// A tool a run depends on, and whether its remote side must answer too
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub tool: Tool,
    /// The cluster API or cloud account must be reachable, not just the client
    pub reachable: bool,
}

impl Requirement {
    pub fn client(tool: Tool) -> Self {
        Self {
            tool,
            reachable: false,
        }
    }

    pub fn reachable(tool: Tool) -> Self {
        Self {
            tool,
            reachable: true,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl Mode {
    /// Every cleanup is destructive and needs an explicit go-ahead
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Mode::Cleanup(_))
    }

    /// Collaborators that must be usable before any side effect
    ///
    /// `deploy full` provisions the cluster itself, so only the kubectl
    /// client is checked there.
    pub fn requirements(&self) -> Vec<Requirement> {
        use Requirement as R;
        match self {
            Mode::Deploy(DeployTarget::Docker) => vec![R::client(Tool::Docker)],
            Mode::Deploy(DeployTarget::Kubernetes) => vec![R::reachable(Tool::Kubectl)],
            Mode::Deploy(DeployTarget::Aws) => {
                vec![R::client(Tool::Terraform), R::reachable(Tool::Aws)]
            }
            Mode::Deploy(DeployTarget::Full) => vec![
                R::client(Tool::Terraform),
                R::reachable(Tool::Aws),
                R::client(Tool::Kubectl),
            ],
            Mode::Cleanup(CleanupTarget::Docker) => vec![R::client(Tool::Docker)],
            Mode::Cleanup(CleanupTarget::Kubernetes) => vec![R::reachable(Tool::Kubectl)],
            Mode::Cleanup(CleanupTarget::Terraform) => vec![R::client(Tool::Terraform)],
            Mode::Cleanup(CleanupTarget::CloudFormation) => vec![R::reachable(Tool::Aws)],
            Mode::Cleanup(CleanupTarget::All) => vec![
                R::reachable(Tool::Kubectl),
                R::client(Tool::Terraform),
                R::client(Tool::Docker),
            ],
            Mode::HealthCheck(HealthTarget::Docker) => vec![R::client(Tool::Docker)],
            Mode::HealthCheck(HealthTarget::Kubernetes) => vec![R::reachable(Tool::Kubectl)],
            Mode::HealthCheck(HealthTarget::Aws) => vec![R::client(Tool::Terraform)],
        }
    }
}

impl FromStr for DeployTarget {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(DeployTarget::Docker),
            "kubernetes" | "k8s" => Ok(DeployTarget::Kubernetes),
            "aws" => Ok(DeployTarget::Aws),
            "full" => Ok(DeployTarget::Full),
            other => Err(StackError::UnknownMode(format!(
                "'{}' (expected docker, kubernetes|k8s, aws, full)",
                other
            ))),
        }
    }
}

impl FromStr for CleanupTarget {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(CleanupTarget::Docker),
            "kubernetes" | "k8s" => Ok(CleanupTarget::Kubernetes),
            "aws" | "terraform" => Ok(CleanupTarget::Terraform),
            "cloudformation" | "cfn" => Ok(CleanupTarget::CloudFormation),
            "all" => Ok(CleanupTarget::All),
            other => Err(StackError::UnknownMode(format!(
                "'{}' (expected docker, kubernetes|k8s, aws|terraform, cloudformation|cfn, all)",
                other
            ))),
        }
    }
}

impl FromStr for HealthTarget {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(HealthTarget::Docker),
            "kubernetes" | "k8s" => Ok(HealthTarget::Kubernetes),
            "aws" => Ok(HealthTarget::Aws),
            other => Err(StackError::UnknownMode(format!(
                "'{}' (expected docker, kubernetes|k8s, aws)",
                other
            ))),
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployTarget::Docker => write!(f, "docker"),
            DeployTarget::Kubernetes => write!(f, "kubernetes"),
            DeployTarget::Aws => write!(f, "aws"),
            DeployTarget::Full => write!(f, "full"),
        }
    }
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupTarget::Docker => write!(f, "docker"),
            CleanupTarget::Kubernetes => write!(f, "kubernetes"),
            CleanupTarget::Terraform => write!(f, "terraform"),
            CleanupTarget::CloudFormation => write!(f, "cloudformation"),
            CleanupTarget::All => write!(f, "all"),
        }
    }
}

impl fmt::Display for HealthTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthTarget::Docker => write!(f, "docker"),
            HealthTarget::Kubernetes => write!(f, "kubernetes"),
            HealthTarget::Aws => write!(f, "aws"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Deploy(t) => write!(f, "deploy-{}", t),
            Mode::Cleanup(t) => write!(f, "cleanup-{}", t),
            Mode::HealthCheck(t) => write!(f, "health-check-{}", t),
        }
    }
}
