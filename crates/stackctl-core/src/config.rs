//! Configuration types for stackctl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{StackError, StackResult};

/// File name looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "stackctl.toml";

/// Main stack configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Project-wide naming
    pub project: ProjectConfig,
    /// Cluster (namespace and manifests) configuration
    pub cluster: ClusterConfig,
    /// Infrastructure module configuration
    pub infrastructure: InfrastructureConfig,
    /// Local container set configuration
    pub containers: ContainersConfig,
    /// Readiness probe configuration
    pub probes: ProbesConfig,
    /// Per-operation timeouts
    pub timeouts: TimeoutConfig,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
    /// Variables passed through to the workload unchanged
    pub workload: WorkloadVars,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl StackConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> StackResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StackError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: StackConfig = toml::from_str(&content)
            .map_err(|e| StackError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from `stackctl.toml` in `dir` when it
    /// exists, or fall back to defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> StackResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values that would make the orchestrator loop or hang
    pub fn validate(&self) -> StackResult<()> {
        if self.cluster.namespace.trim().is_empty() {
            return Err(StackError::Config("cluster.namespace must not be empty".into()));
        }
        if self.project.image.trim().is_empty() {
            return Err(StackError::Config("project.image must not be empty".into()));
        }
        if self.probes.interval_secs == 0 {
            return Err(StackError::Config("probes.interval_secs must be positive".into()));
        }
        if self.probes.timeout_secs == 0 || self.probes.health_check_timeout_secs == 0 {
            return Err(StackError::Config("probe timeouts must be positive".into()));
        }
        let zero_timeout = self.timeouts.entries().into_iter().find(|(_, secs)| *secs == 0);
        if let Some((name, _)) = zero_timeout {
            return Err(StackError::Config(format!("timeouts.{} must be positive", name)));
        }
        if self.retry.max_attempts == 0 {
            return Err(StackError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(StackError::Config("retry.multiplier must be >= 1.0".into()));
        }
        Ok(())
    }
}

/// Project naming shared by every layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used for tags and the compose project
    pub name: String,
    /// Container image reference built for the workload
    pub image: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "infinite-ai".to_string(),
            image: "infinite-ai:latest".to_string(),
        }
    }
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Namespace every cluster object lives in
    pub namespace: String,
    /// Name of the workload (deployment) object
    pub workload_name: String,
    /// Directory holding the fixed manifest set
    pub manifests_dir: PathBuf,
    /// Host the service endpoint is reachable on
    pub service_host: String,
    /// Port the service endpoint is reachable on
    pub service_port: u16,
    /// kubectl context, current context when unset
    pub context: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace: "infinite-ai".to_string(),
            workload_name: "infinite-ai-app".to_string(),
            manifests_dir: PathBuf::from("k8s"),
            service_host: "localhost".to_string(),
            service_port: 8080,
            context: None,
        }
    }
}

/// Infrastructure module configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureConfig {
    /// Directory of the declarative infrastructure module
    pub module_dir: PathBuf,
    /// Cloud region
    pub region: String,
    /// Managed cluster name, used to refresh the kubeconfig after provisioning
    pub cluster_name: String,
    /// CloudFormation stack torn down by `cleanup cloudformation`
    pub cloudformation_stack: String,
    /// Run `aws eks update-kubeconfig` after a successful provision
    pub update_kubeconfig: bool,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            module_dir: PathBuf::from("terraform"),
            region: "us-east-1".to_string(),
            cluster_name: "infinite-ai-cluster".to_string(),
            cloudformation_stack: "infinite-ai-stack".to_string(),
            update_kubeconfig: true,
        }
    }
}

/// Local container set configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainersConfig {
    /// Compose file describing the container set
    pub compose_file: PathBuf,
    /// Dockerfile used to build the workload image
    pub dockerfile: PathBuf,
    /// Build context directory
    pub build_context: PathBuf,
}

impl Default for ContainersConfig {
    fn default() -> Self {
        Self {
            compose_file: PathBuf::from("docker-compose.yml"),
            dockerfile: PathBuf::from("Dockerfile"),
            build_context: PathBuf::from("."),
        }
    }
}

/// Readiness probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    /// Host the local container set publishes its ports on
    pub host: String,
    /// Port of the primary health endpoint
    pub primary_port: u16,
    /// Path of the primary health endpoint
    pub primary_path: String,
    /// Port of the auxiliary metrics endpoint
    pub metrics_port: u16,
    /// Path of the auxiliary metrics endpoint
    pub metrics_path: String,
    /// Readiness wait after a deploy, in seconds
    pub timeout_secs: u64,
    /// Delay between two checks, in seconds
    pub interval_secs: u64,
    /// Readiness wait in health-check mode, in seconds
    pub health_check_timeout_secs: u64,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            primary_port: 8080,
            primary_path: "/health".to_string(),
            metrics_port: 9090,
            metrics_path: "/metrics".to_string(),
            timeout_secs: 120,
            interval_secs: 5,
            health_check_timeout_secs: 10,
        }
    }
}

impl ProbesConfig {
    /// Primary health endpoint on `host`
    pub fn primary_endpoint(&self, host: &str) -> Endpoint {
        Endpoint::new(host.to_string(), self.primary_port)
    }

    /// Auxiliary metrics endpoint on `host`
    pub fn metrics_endpoint(&self, host: &str) -> Endpoint {
        Endpoint::new(host.to_string(), self.metrics_port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }
}

/// Network endpoint of the running application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Endpoint {
    /// Create a new plain-HTTP endpoint
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Get the base URL for this endpoint
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// URL of `path` on this endpoint
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.url(), path)
        } else {
            format!("{}/{}", self.url(), path)
        }
    }
}

/// Explicit timeouts for every external operation, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Short read-only commands (version checks, get, describe)
    pub command_secs: u64,
    /// Applying one cluster object or starting the container set
    pub apply_secs: u64,
    /// Deleting one cluster object or stopping the container set
    pub delete_secs: u64,
    /// Building the workload image
    pub build_secs: u64,
    /// Provisioning the infrastructure stack
    pub provision_secs: u64,
    /// Destroying the infrastructure stack
    pub destroy_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 30,
            apply_secs: 120,
            delete_secs: 120,
            build_secs: 900,
            provision_secs: 1800,
            destroy_secs: 1800,
        }
    }
}

impl TimeoutConfig {
    fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("command_secs", self.command_secs),
            ("apply_secs", self.apply_secs),
            ("delete_secs", self.delete_secs),
            ("build_secs", self.build_secs),
            ("provision_secs", self.provision_secs),
            ("destroy_secs", self.destroy_secs),
        ]
    }
}

/// Retry policy for transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_backoff_ms: u64,
    /// Growth factor applied after each retry
    pub multiplier: f64,
    /// Upper bound on a single delay, in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            multiplier: 2.0,
            max_backoff_ms: 16000,
        }
    }
}

/// Workload variables, passed through to the workload unchanged
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadVars {
    pub model_path: String,
    pub region: String,
    pub log_level: String,
    pub max_workers: u32,
    pub gpu_enabled: bool,
    pub bucket: String,
    pub metrics_port: u16,
}

impl Default for WorkloadVars {
    fn default() -> Self {
        Self {
            model_path: "/models".to_string(),
            region: "us-east-1".to_string(),
            log_level: "INFO".to_string(),
            max_workers: 4,
            gpu_enabled: false,
            bucket: "infinite-ai-models".to_string(),
            metrics_port: 9090,
        }
    }
}

impl WorkloadVars {
    /// Environment handed to the container set
    pub fn to_env(&self) -> Vec<(String, String)> {
        vec![
            ("AI_MODEL_PATH".to_string(), self.model_path.clone()),
            ("AWS_REGION".to_string(), self.region.clone()),
            ("LOG_LEVEL".to_string(), self.log_level.clone()),
            ("MAX_WORKERS".to_string(), self.max_workers.to_string()),
            ("GPU_ENABLED".to_string(), self.gpu_enabled.to_string()),
            ("S3_BUCKET".to_string(), self.bucket.clone()),
            ("METRICS_PORT".to_string(), self.metrics_port.to_string()),
        ]
    }

    /// Environment handed to the infrastructure module (`TF_VAR_*`)
    pub fn to_terraform_env(&self, environment: &str) -> Vec<(String, String)> {
        vec![
            ("TF_VAR_environment".to_string(), environment.to_string()),
            ("TF_VAR_aws_region".to_string(), self.region.clone()),
            ("TF_VAR_s3_bucket_name".to_string(), self.bucket.clone()),
            ("TF_VAR_gpu_enabled".to_string(), self.gpu_enabled.to_string()),
        ]
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
