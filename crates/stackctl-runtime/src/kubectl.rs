//! Cluster resource interface over `kubectl`

use serde_json::Value;
use stackctl_core::{
    ClusterConfig, PodReadiness, ResourceDescriptor, ResourceKind, StackError, StackResult,
    TimeoutConfig,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::classify::{classify_failure, Change};
use crate::traits::{CommandRunner, CommandSpec};

/// Client for typed, named, namespaced cluster objects
pub struct KubectlClient {
    runner: Arc<dyn CommandRunner>,
    namespace: String,
    context: Option<String>,
    command_timeout: Duration,
    apply_timeout: Duration,
    delete_timeout: Duration,
}

impl KubectlClient {
    pub fn new(runner: Arc<dyn CommandRunner>, cluster: &ClusterConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            runner,
            namespace: cluster.namespace.clone(),
            context: cluster.context.clone(),
            command_timeout: Duration::from_secs(timeouts.command_secs),
            apply_timeout: Duration::from_secs(timeouts.apply_secs),
            delete_timeout: Duration::from_secs(timeouts.delete_secs),
        }
    }

    fn command(&self, timeout: Duration) -> CommandSpec {
        let spec = CommandSpec::new("kubectl", timeout);
        match &self.context {
            Some(ctx) => spec.args(["--context", ctx.as_str()]),
            None => spec,
        }
    }

    /// `kubectl cluster-info`, which needs the API server to answer
    pub fn cluster_info_command(&self) -> CommandSpec {
        self.command(self.command_timeout).arg("cluster-info")
    }

    fn scoped(&self, spec: CommandSpec, kind: ResourceKind) -> CommandSpec {
        if kind == ResourceKind::Namespace {
            spec
        } else {
            spec.args(["-n", self.namespace.as_str()])
        }
    }

    /// `kubectl apply -f <manifest>`
    pub async fn apply(&self, descriptor: &ResourceDescriptor) -> StackResult<Change> {
        let manifest = descriptor.manifest.as_deref().ok_or_else(|| {
            StackError::Operation(format!("{} has no manifest to apply", descriptor.label()))
        })?;
        ensure_manifest(manifest)?;

        let spec = self.scoped(
            self.command(self.apply_timeout)
                .arg("apply")
                .arg("-f")
                .arg(manifest.display().to_string()),
            descriptor.kind,
        );
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure(&format!("apply {}", descriptor.label()), &output));
        }

        debug!(resource = %descriptor.label(), stdout = %output.stdout.trim(), "kubectl apply");
        Ok(parse_apply_output(&output.stdout))
    }

    /// `kubectl delete --ignore-not-found`, by manifest when it exists, by type/name otherwise
    pub async fn delete(&self, descriptor: &ResourceDescriptor) -> StackResult<Change> {
        let mut spec = self.command(self.delete_timeout).arg("delete");
        match descriptor.manifest.as_deref().filter(|m| m.exists()) {
            Some(manifest) => {
                spec = spec.arg("-f").arg(manifest.display().to_string());
            }
            None => {
                let cluster_type = descriptor.kind.cluster_type().ok_or_else(|| {
                    StackError::Internal(format!("{} is not a cluster object", descriptor.label()))
                })?;
                spec = spec.arg(cluster_type).arg(&descriptor.name);
            }
        }
        let spec = self.scoped(
            spec.arg("--ignore-not-found=true")
                .arg(format!("--timeout={}s", self.delete_timeout.as_secs())),
            descriptor.kind,
        );

        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure(&format!("delete {}", descriptor.label()), &output));
        }

        let stdout = output.stdout.trim();
        if stdout.is_empty() {
            Ok(Change::Unchanged("not found".to_string()))
        } else {
            Ok(Change::Changed(stdout.to_string()))
        }
    }

    /// Ready versus total pods in the namespace
    pub async fn pod_readiness(&self) -> StackResult<PodReadiness> {
        let spec = self
            .command(self.command_timeout)
            .args(["get", "pods", "-n", self.namespace.as_str(), "-o", "json"]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("get pods", &output));
        }
        let doc: Value = serde_json::from_str(&output.stdout)?;
        Ok(count_ready_pods(&doc))
    }

    /// `kubectl get all -o name`
    pub async fn list_resources(&self) -> StackResult<Vec<String>> {
        let spec = self
            .command(self.command_timeout)
            .args(["get", "all", "-n", self.namespace.as_str(), "-o", "name"]);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(classify_failure("get all", &output));
        }
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Whether the object reports its ready condition
    pub async fn condition_met(&self, descriptor: &ResourceDescriptor) -> StackResult<bool> {
        let cluster_type = descriptor.kind.cluster_type().ok_or_else(|| {
            StackError::Internal(format!("{} is not a cluster object", descriptor.label()))
        })?;
        let spec = self.scoped(
            self.command(self.command_timeout)
                .arg("get")
                .arg(format!("{}/{}", cluster_type, descriptor.name))
                .args(["-o", "json"]),
            descriptor.kind,
        );
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            // not created yet counts as not ready, anything else is an error
            if output.stderr.contains("NotFound") {
                return Ok(false);
            }
            return Err(classify_failure(&format!("get {}", descriptor.label()), &output));
        }
        let doc: Value = serde_json::from_str(&output.stdout)?;
        Ok(object_is_ready(descriptor.kind, &doc))
    }
}

fn ensure_manifest(manifest: &Path) -> StackResult<()> {
    if manifest.exists() {
        Ok(())
    } else {
        Err(StackError::Operation(format!(
            "manifest {} not found",
            manifest.display()
        )))
    }
}

/// `namespace/x unchanged` on every line means nothing changed
fn parse_apply_output(stdout: &str) -> Change {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let summary = lines.join("; ");
    if !lines.is_empty() && lines.iter().all(|l| l.ends_with("unchanged")) {
        Change::Unchanged(summary)
    } else {
        Change::Changed(summary)
    }
}

fn count_ready_pods(doc: &Value) -> PodReadiness {
    let items = doc["items"].as_array().cloned().unwrap_or_default();
    let total = items.len() as u32;
    let ready = items
        .iter()
        .filter(|pod| {
            let running = pod["status"]["phase"].as_str() == Some("Running");
            let statuses = pod["status"]["containerStatuses"].as_array();
            running
                && statuses
                    .map(|s| !s.is_empty() && s.iter().all(|c| c["ready"].as_bool() == Some(true)))
                    .unwrap_or(false)
        })
        .count() as u32;
    PodReadiness { ready, total }
}

fn object_is_ready(kind: ResourceKind, doc: &Value) -> bool {
    match kind {
        ResourceKind::Workload => {
            let desired = doc["spec"]["replicas"].as_u64().unwrap_or(1);
            let ready = doc["status"]["readyReplicas"].as_u64().unwrap_or(0);
            let available = doc["status"]["conditions"]
                .as_array()
                .map(|conds| {
                    conds.iter().any(|c| {
                        c["type"].as_str() == Some("Available") && c["status"].as_str() == Some("True")
                    })
                })
                .unwrap_or(false);
            available && ready >= desired
        }
        ResourceKind::Namespace => doc["status"]["phase"].as_str() == Some("Active"),
        // other objects are ready once they exist
        _ => true,
    }
}
