//! Resource descriptors and the fixed descriptor registry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::{CleanupTarget, DeployTarget, HealthTarget, Mode, StackConfig};

/// Kinds of manageable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Namespace,
    ConfigMap,
    Secret,
    Workload,
    Service,
    Ingress,
    Autoscaler,
    NetworkPolicy,
    InfrastructureStack,
    ContainerSet,
}

impl ResourceKind {
    /// Dependency depth; a kind is applied after every kind of lower depth
    pub fn default_apply_order(&self) -> u32 {
        match self {
            ResourceKind::InfrastructureStack | ResourceKind::ContainerSet => 0,
            ResourceKind::Namespace => 1,
            ResourceKind::ConfigMap | ResourceKind::Secret => 2,
            ResourceKind::Workload => 3,
            ResourceKind::Service => 4,
            ResourceKind::Ingress | ResourceKind::Autoscaler | ResourceKind::NetworkPolicy => 5,
        }
    }

    /// Objects living in the cluster namespace
    pub fn is_cluster_scoped(&self) -> bool {
        !matches!(
            self,
            ResourceKind::InfrastructureStack | ResourceKind::ContainerSet
        )
    }

    /// Name used by the cluster interface (`kubectl get <kind>`)
    pub fn cluster_type(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Namespace => Some("namespace"),
            ResourceKind::ConfigMap => Some("configmap"),
            ResourceKind::Secret => Some("secret"),
            ResourceKind::Workload => Some("deployment"),
            ResourceKind::Service => Some("service"),
            ResourceKind::Ingress => Some("ingress"),
            ResourceKind::Autoscaler => Some("horizontalpodautoscaler"),
            ResourceKind::NetworkPolicy => Some("networkpolicy"),
            ResourceKind::InfrastructureStack | ResourceKind::ContainerSet => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Secret => "secret",
            ResourceKind::Workload => "workload",
            ResourceKind::Service => "service",
            ResourceKind::Ingress => "ingress",
            ResourceKind::Autoscaler => "autoscaler",
            ResourceKind::NetworkPolicy => "networkPolicy",
            ResourceKind::InfrastructureStack => "infrastructureStack",
            ResourceKind::ContainerSet => "containerSet",
        };
        f.write_str(name)
    }
}

/// Static declaration of one manageable external resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Object name in the external system
    pub name: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// Position in the apply sequence; equal values have no mutual dependency
    pub apply_order: u32,
    /// Only removable through the dedicated destroy path
    pub destructive_only: bool,
    /// Manifest handed to the cluster interface, if any
    pub manifest: Option<PathBuf>,
}

impl ResourceDescriptor {
    /// Create a descriptor with the kind's default order and no manifest
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            apply_order: kind.default_apply_order(),
            destructive_only: kind == ResourceKind::InfrastructureStack,
            manifest: None,
        }
    }

    /// Attach the manifest file applied for this resource
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    /// `kind/name` label for logs and reports
    pub fn label(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }
}

/// Fixed, immutable set of descriptors loaded once per run
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    descriptors: Vec<ResourceDescriptor>,
}

impl DescriptorRegistry {
    /// Create a registry from an explicit descriptor list
    pub fn new(descriptors: Vec<ResourceDescriptor>) -> Self {
        Self { descriptors }
    }

    /// The pre-declared resource list for the configured stack
    pub fn from_config(config: &StackConfig) -> Self {
        let dir = &config.cluster.manifests_dir;
        let ns = &config.cluster.namespace;
        let app = &config.cluster.workload_name;

        let cluster = [
            (ns.clone(), ResourceKind::Namespace, "namespace.yaml"),
            (format!("{}-config", app), ResourceKind::ConfigMap, "configmap.yaml"),
            (format!("{}-secrets", app), ResourceKind::Secret, "secret.yaml"),
            (app.clone(), ResourceKind::Workload, "deployment.yaml"),
            (format!("{}-service", app), ResourceKind::Service, "service.yaml"),
            (format!("{}-ingress", app), ResourceKind::Ingress, "ingress.yaml"),
            (format!("{}-hpa", app), ResourceKind::Autoscaler, "hpa.yaml"),
            (format!("{}-netpol", app), ResourceKind::NetworkPolicy, "network-policy.yaml"),
        ];

        let mut descriptors = vec![
            ResourceDescriptor::new(&config.project.name, ResourceKind::InfrastructureStack)
                .with_manifest(&config.infrastructure.module_dir),
            ResourceDescriptor::new(&config.project.name, ResourceKind::ContainerSet)
                .with_manifest(&config.containers.compose_file),
        ];
        descriptors.extend(
            cluster
                .into_iter()
                .map(|(name, kind, file)| ResourceDescriptor::new(name, kind).with_manifest(dir.join(file))),
        );

        Self { descriptors }
    }

    /// All descriptors, in declaration order
    pub fn all(&self) -> &[ResourceDescriptor] {
        &self.descriptors
    }

    /// Descriptors the selected mode walks through, already in walk order
    pub fn list_for_mode(&self, mode: Mode) -> Vec<ResourceDescriptor> {
        match mode {
            Mode::Deploy(DeployTarget::Docker)
            | Mode::Cleanup(CleanupTarget::Docker)
            | Mode::HealthCheck(HealthTarget::Docker) => self.of_kind(ResourceKind::ContainerSet),
            Mode::Deploy(DeployTarget::Aws) | Mode::HealthCheck(HealthTarget::Aws) => {
                self.of_kind(ResourceKind::InfrastructureStack)
            }
            Mode::Deploy(DeployTarget::Kubernetes) | Mode::HealthCheck(HealthTarget::Kubernetes) => {
                self.cluster_ascending()
            }
            Mode::Deploy(DeployTarget::Full) => {
                let mut list = self.of_kind(ResourceKind::InfrastructureStack);
                list.extend(self.cluster_ascending());
                list
            }
            Mode::Cleanup(CleanupTarget::Kubernetes) => self.cluster_descending(),
            // infrastructure goes through the dedicated destroy call
            Mode::Cleanup(CleanupTarget::Terraform) | Mode::Cleanup(CleanupTarget::CloudFormation) => {
                Vec::new()
            }
            Mode::Cleanup(CleanupTarget::All) => {
                let mut list = self.cluster_descending();
                list.extend(self.of_kind(ResourceKind::ContainerSet));
                list
            }
        }
    }

    fn of_kind(&self, kind: ResourceKind) -> Vec<ResourceDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    fn cluster_ascending(&self) -> Vec<ResourceDescriptor> {
        let mut list: Vec<ResourceDescriptor> = self
            .descriptors
            .iter()
            .filter(|d| d.kind.is_cluster_scoped())
            .cloned()
            .collect();
        // stable: ties keep declaration order
        list.sort_by_key(|d| d.apply_order);
        list
    }

    fn cluster_descending(&self) -> Vec<ResourceDescriptor> {
        let mut list = self.cluster_ascending();
        list.reverse();
        list
    }
}
