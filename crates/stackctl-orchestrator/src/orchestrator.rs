//! Orchestration of one deploy, cleanup or health-check run
//!
//! Phases run strictly in sequence; readiness polling is the only suspension
//! point. Deploys stop at the first failed operation and leave what was
//! created in place. Cleanups ask for confirmation first, then continue past
//! individual failures.

use stackctl_core::{
    CleanupTarget, Confirmation, DeployTarget, DescriptorRegistry, Endpoint, HealthTarget, Mode,
    Observation, OperationOutcome, ProbeRole, ResourceDescriptor, ResourceKind, RunReport,
    StackConfig, StackError, StackResult, Verdict,
};
use stackctl_network::{
    Interrupt, PointCheck, PollSchedule, ProbeSignal, ProbeTarget, ReadinessProbe,
};
use stackctl_runtime::{Executor, InfraProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::confirm::ConfirmationGate;

/// Everything a run needs to know about its environment
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Free-form environment tag (e.g. `production`)
    pub environment: String,
    pub stack: StackConfig,
    pub registry: DescriptorRegistry,
}

impl OrchestratorConfig {
    /// Configuration with the registry derived from `stack`
    pub fn new(environment: impl Into<String>, stack: StackConfig) -> Self {
        let registry = DescriptorRegistry::from_config(&stack);
        Self {
            environment: environment.into(),
            stack,
            registry,
        }
    }

    /// Replace the descriptor registry
    pub fn with_registry(mut self, registry: DescriptorRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// Drives a mode through the executor, probes and confirmation gate
pub struct Orchestrator {
    config: OrchestratorConfig,
    executor: Arc<dyn Executor>,
    check: Arc<dyn PointCheck>,
    probe: ReadinessProbe,
    gate: Arc<dyn ConfirmationGate>,
    interrupt: Interrupt,
}

impl Orchestrator {
    /// Create an orchestrator that is never interrupted
    pub fn new(
        config: OrchestratorConfig,
        executor: Arc<dyn Executor>,
        check: Arc<dyn PointCheck>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        let interrupt = Interrupt::never();
        Self {
            config,
            executor,
            probe: ReadinessProbe::new(check.clone(), interrupt.clone()),
            check,
            gate,
            interrupt,
        }
    }

    /// Abort in-flight waits when `interrupt` fires
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.probe = ReadinessProbe::new(self.check.clone(), interrupt.clone());
        self.interrupt = interrupt;
        self
    }

    /// Run one mode to completion
    ///
    /// Fails only when a prerequisite is missing; every other problem is
    /// recorded in the report and reflected in its verdict.
    pub async fn run(&self, mode: Mode) -> StackResult<RunReport> {
        info!(
            mode = %mode,
            environment = %self.config.environment,
            executor = self.executor.name(),
            "Starting run"
        );

        self.executor
            .verify_prerequisites(&mode.requirements())
            .await?;

        let mut report = RunReport::new(mode, self.config.environment.as_str());
        let proceed = !mode.requires_confirmation() || {
            let prompt = format!(
                "{} will delete resources in environment '{}'. Continue?",
                mode, self.config.environment
            );
            self.confirm(&mut report, &prompt).await
        };
        if proceed {
            match mode {
                Mode::Deploy(target) => self.deploy(target, &mut report).await,
                Mode::Cleanup(target) => self.cleanup(target, &mut report).await,
                Mode::HealthCheck(target) => self.health_check(target, &mut report).await,
            }
        }

        let report = report.finish();
        match report.verdict {
            Verdict::Success => info!(verdict = %report.verdict, "{}", report.summary()),
            _ => warn!(verdict = %report.verdict, "{}", report.summary()),
        }
        Ok(report)
    }

    async fn deploy(&self, target: DeployTarget, report: &mut RunReport) {
        let descriptors = self.config.registry.list_for_mode(report.mode);

        if target == DeployTarget::Docker {
            let outcome = self.executor.build_image().await;
            if !self.record_applied(report, outcome) {
                return;
            }
        }

        for descriptor in &descriptors {
            if self.stop_requested(report) {
                return;
            }
            let outcome = self.executor.apply(descriptor).await;
            if !self.record_applied(report, outcome) {
                return;
            }
            if descriptor.kind == ResourceKind::Workload {
                self.await_rollout(descriptor, report).await;
            }
        }

        let probes = &self.config.stack.probes;
        let schedule = PollSchedule::new(probes.timeout(), probes.interval());
        match target {
            DeployTarget::Aws => {}
            DeployTarget::Docker => {
                let host = probes.host.as_str();
                self.probe_endpoints(
                    report,
                    probes.primary_endpoint(host),
                    Some(probes.metrics_endpoint(host)),
                    schedule,
                )
                .await;
            }
            DeployTarget::Kubernetes | DeployTarget::Full => {
                let cluster = &self.config.stack.cluster;
                self.probe_endpoints(
                    report,
                    Endpoint::new(cluster.service_host.clone(), cluster.service_port),
                    Some(probes.metrics_endpoint(&cluster.service_host)),
                    schedule,
                )
                .await;
            }
        }
    }

    /// Record a deploy outcome; false means the sequence must stop
    fn record_applied(&self, report: &mut RunReport, outcome: OperationOutcome) -> bool {
        let failed = outcome.is_failure();
        if failed {
            error!(
                resource = %outcome.resource,
                attempts = outcome.attempts,
                message = %outcome.message,
                "Deploy stopped at failed resource; created resources are left in place"
            );
            report.degrade(Verdict::Failure);
        }
        report.record(outcome);
        !failed
    }

    async fn await_rollout(&self, workload: &ResourceDescriptor, report: &mut RunReport) {
        let probes = &self.config.stack.probes;
        let target = ProbeTarget::primary(
            format!("rollout {}", workload.label()),
            ProbeSignal::Condition {
                resource: workload.clone(),
            },
        );
        self.await_probe(report, &target, PollSchedule::new(probes.timeout(), probes.interval()))
            .await;
    }

    async fn probe_endpoints(
        &self,
        report: &mut RunReport,
        primary: Endpoint,
        auxiliary: Option<Endpoint>,
        schedule: PollSchedule,
    ) {
        let probes = &self.config.stack.probes;
        let target = ProbeTarget::primary(
            "health",
            ProbeSignal::Http {
                url: primary.join(&probes.primary_path),
            },
        );
        self.await_probe(report, &target, schedule).await;

        if let Some(endpoint) = auxiliary {
            let target = ProbeTarget::auxiliary(
                "metrics",
                ProbeSignal::Http {
                    url: endpoint.join(&probes.metrics_path),
                },
            );
            self.await_probe(report, &target, schedule).await;
        }
    }

    /// Wait for a probe and fold the result into the report
    async fn await_probe(
        &self,
        report: &mut RunReport,
        target: &ProbeTarget,
        schedule: PollSchedule,
    ) {
        let result = self.probe.await_ready(target, schedule).await;
        if !result.healthy {
            match target.role {
                ProbeRole::Primary => {
                    warn!(
                        target = %target.name,
                        detail = ?result.error_detail,
                        "Primary probe timed out, run is partial"
                    );
                    report.degrade(Verdict::Partial);
                }
                ProbeRole::Auxiliary => {
                    warn!(
                        target = %target.name,
                        detail = ?result.error_detail,
                        "Auxiliary probe degraded"
                    );
                }
            }
        }
        report.probes.push(result);
    }

    /// An interrupt between operations ends the sequence as partial
    fn stop_requested(&self, report: &mut RunReport) -> bool {
        if self.interrupt.is_triggered() {
            warn!("Run interrupted, remaining operations skipped");
            report.degrade(Verdict::Partial);
            return true;
        }
        false
    }

    async fn cleanup(&self, target: CleanupTarget, report: &mut RunReport) {
        let descriptors = self.config.registry.list_for_mode(report.mode);
        match target {
            CleanupTarget::Docker | CleanupTarget::Kubernetes => {
                self.delete_all(&descriptors, report).await;
            }
            CleanupTarget::Terraform => {
                self.destroy(InfraProvider::Terraform, report).await;
            }
            CleanupTarget::CloudFormation => {
                self.destroy(InfraProvider::CloudFormation, report).await;
            }
            CleanupTarget::All => {
                let (cluster, local): (Vec<_>, Vec<_>) = descriptors
                    .into_iter()
                    .partition(|d| d.kind.is_cluster_scoped());

                self.delete_all(&cluster, report).await;

                let prompt = format!(
                    "Destroy the infrastructure of environment '{}'? This cannot be undone.",
                    self.config.environment
                );
                if self.stop_requested(report) {
                    return;
                }
                if self.gate.confirm(&prompt).await {
                    if self.gate.is_forced() {
                        warn!("Infrastructure destroy confirmed by force flag");
                    }
                    self.destroy(InfraProvider::Terraform, report).await;
                } else {
                    warn!("Infrastructure destroy declined, infrastructure left in place");
                    report.record(OperationOutcome::skipped(
                        format!("infrastructureStack/{}", self.config.stack.project.name),
                        "destroy declined",
                    ));
                    report.degrade(Verdict::Partial);
                }

                self.delete_all(&local, report).await;
            }
        }
    }

    /// Ask the gate; a decline aborts the run before any side effect
    async fn confirm(&self, report: &mut RunReport, prompt: &str) -> bool {
        if !self.gate.confirm(prompt).await {
            warn!(
                mode = %report.mode,
                error = %StackError::ConfirmationDeclined,
                "Nothing was changed"
            );
            report.confirmation = Confirmation::Declined;
            report.degrade(Verdict::Aborted);
            return false;
        }
        report.confirmation = if self.gate.is_forced() {
            warn!(mode = %report.mode, "Confirmation bypassed by force flag");
            Confirmation::Bypassed
        } else {
            Confirmation::Accepted
        };
        true
    }

    async fn delete_all(&self, descriptors: &[ResourceDescriptor], report: &mut RunReport) {
        for descriptor in descriptors {
            if self.stop_requested(report) {
                return;
            }
            let outcome = self.executor.delete(descriptor).await;
            self.record_deleted(report, outcome);
        }
    }

    async fn destroy(&self, provider: InfraProvider, report: &mut RunReport) {
        let outcome = self.executor.destroy_infrastructure(provider).await;
        self.record_deleted(report, outcome);
    }

    /// Record a cleanup outcome; failures degrade but never stop the run
    fn record_deleted(&self, report: &mut RunReport, outcome: OperationOutcome) {
        if outcome.is_failure() {
            error!(
                resource = %outcome.resource,
                message = %outcome.message,
                "Delete failed, continuing"
            );
            report.degrade(Verdict::Partial);
        }
        report.record(outcome);
    }

    async fn health_check(&self, target: HealthTarget, report: &mut RunReport) {
        let probes = &self.config.stack.probes;
        let schedule = PollSchedule::new(probes.health_check_timeout(), probes.interval());

        match target {
            HealthTarget::Kubernetes => {
                let observation = match self.executor.list_resources().await {
                    Ok(names) => {
                        info!(namespace = %self.config.stack.cluster.namespace, count = names.len(), "Resources listed");
                        Observation::new("resources", format!("{} objects", names.len()), !names.is_empty())
                    }
                    Err(e) => Observation::new("resources", e.to_string(), false),
                };
                report.observations.push(observation);

                let observation = match self.executor.pod_readiness().await {
                    Ok(pods) => Observation::new("pods", pods.to_string(), pods.all_ready()),
                    Err(e) => Observation::new("pods", e.to_string(), false),
                };
                report.observations.push(observation);

                let cluster = &self.config.stack.cluster;
                self.probe_endpoints(
                    report,
                    Endpoint::new(cluster.service_host.clone(), cluster.service_port),
                    None,
                    schedule,
                )
                .await;
            }
            HealthTarget::Docker => {
                let observation = match self.executor.container_states().await {
                    Ok(states) => {
                        let running = states.iter().filter(|s| s.running).count();
                        for state in states.iter().filter(|s| !s.running) {
                            warn!(container = %state.name, status = %state.status, "Container not running");
                        }
                        Observation::new(
                            "containers",
                            format!("{}/{} running", running, states.len()),
                            !states.is_empty() && running == states.len(),
                        )
                    }
                    Err(e) => Observation::new("containers", e.to_string(), false),
                };
                report.observations.push(observation);

                let host = probes.host.as_str();
                self.probe_endpoints(
                    report,
                    probes.primary_endpoint(host),
                    Some(probes.metrics_endpoint(host)),
                    schedule,
                )
                .await;
            }
            HealthTarget::Aws => match self.executor.infrastructure_outputs().await {
                Ok(outputs) if outputs.is_empty() => {
                    report
                        .observations
                        .push(Observation::new("infrastructure", "no outputs", false));
                }
                Ok(outputs) => {
                    for (name, value) in outputs {
                        report.observations.push(Observation::new(name, value, true));
                    }
                }
                Err(e) => {
                    report
                        .observations
                        .push(Observation::new("infrastructure", e.to_string(), false));
                }
            },
        }

        report.verdict = health_verdict(report);
    }
}

/// All signals healthy is success, none healthy is failure
fn health_verdict(report: &RunReport) -> Verdict {
    let signals: Vec<bool> = report
        .observations
        .iter()
        .map(|o| o.healthy)
        .chain(
            report
                .probes
                .iter()
                .filter(|p| p.role == ProbeRole::Primary)
                .map(|p| p.healthy),
        )
        .collect();

    if signals.iter().all(|&healthy| healthy) {
        Verdict::Success
    } else if signals.iter().any(|&healthy| healthy) {
        Verdict::Partial
    } else {
        Verdict::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{AutoConfirm, AutoDecline};
    use crate::testing::{FakeCheck, FakeExecutor, ScriptedGate};
    use async_trait::async_trait;
    use stackctl_core::{OperationStatus, StackError};
    use stackctl_network::InterruptHandle;
    use stackctl_runtime::{CommandOutput, CommandRunner, CommandSpec, StackExecutor};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// kubectl client installed, API server refusing every connection
    #[derive(Default)]
    struct UnreachableCluster {
        calls: Mutex<Vec<String>>,
    }

    impl UnreachableCluster {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for UnreachableCluster {
        async fn run(&self, spec: &CommandSpec) -> StackResult<CommandOutput> {
            self.calls.lock().unwrap().push(spec.to_string());
            if spec.args.iter().any(|a| a == "--client") {
                Ok(CommandOutput {
                    code: Some(0),
                    stdout: "Client Version: v1.29.0".to_string(),
                    stderr: String::new(),
                })
            } else {
                Ok(CommandOutput {
                    code: Some(1),
                    stdout: String::new(),
                    stderr: "The connection to the server localhost:6443 was refused".to_string(),
                })
            }
        }
    }

    fn descriptor(name: &str, kind: ResourceKind) -> ResourceDescriptor {
        ResourceDescriptor::new(name, kind).with_manifest(format!("k8s/{}.yaml", name))
    }

    fn orchestrator(
        registry: Option<DescriptorRegistry>,
        executor: &Arc<FakeExecutor>,
        check: &Arc<FakeCheck>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Orchestrator {
        let mut config = OrchestratorConfig::new("staging", StackConfig::default());
        if let Some(registry) = registry {
            config = config.with_registry(registry);
        }
        Orchestrator::new(config, executor.clone(), check.clone(), gate)
    }

    fn statuses(report: &RunReport) -> Vec<(String, OperationStatus)> {
        report
            .outcomes
            .iter()
            .map(|o| (o.resource.clone(), o.status))
            .collect()
    }

    #[tokio::test]
    async fn test_deploy_stops_at_first_failure() {
        let registry = DescriptorRegistry::new(vec![
            descriptor("a", ResourceKind::Namespace),
            descriptor("b", ResourceKind::ConfigMap),
            descriptor("c", ResourceKind::Service),
        ]);
        let executor = Arc::new(FakeExecutor::new().failing("configmap/b"));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(Some(registry), &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Kubernetes)).await.unwrap();

        assert_eq!(executor.calls_to("apply"), vec!["namespace/a", "configmap/b"]);
        assert_eq!(
            statuses(&report),
            vec![
                ("namespace/a".to_string(), OperationStatus::Applied),
                ("configmap/b".to_string(), OperationStatus::Failed),
            ]
        );
        assert_eq!(report.verdict, Verdict::Failure);
        assert!(report.probes.is_empty());
        assert_ne!(report.verdict.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_continues_past_failures() {
        let registry = DescriptorRegistry::new(vec![
            descriptor("a", ResourceKind::Namespace),
            descriptor("b", ResourceKind::ConfigMap),
            descriptor("c", ResourceKind::Service),
        ]);
        let executor = Arc::new(FakeExecutor::new().failing("configmap/b"));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(Some(registry), &executor, &check, Arc::new(AutoConfirm));

        let report = orch.run(Mode::Cleanup(CleanupTarget::Kubernetes)).await.unwrap();

        assert_eq!(
            executor.calls_to("delete"),
            vec!["service/c", "configmap/b", "namespace/a"]
        );
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.verdict, Verdict::Partial);
    }

    #[tokio::test]
    async fn test_declined_cleanup_changes_nothing() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Cleanup(CleanupTarget::All)).await.unwrap();

        assert!(report.outcomes.is_empty());
        assert_eq!(report.verdict, Verdict::Aborted);
        assert_eq!(report.confirmation, Confirmation::Declined);
        assert!(executor.calls_to("delete").is_empty());
        assert!(executor.calls_to("destroy").is_empty());
    }

    #[tokio::test]
    async fn test_missing_prerequisite_aborts_before_side_effects() {
        let executor = Arc::new(FakeExecutor::new().missing_tools());
        let check = Arc::new(FakeCheck::healthy());
        let gate = Arc::new(ScriptedGate::new(&[true]));
        let orch = orchestrator(None, &executor, &check, gate.clone());

        let err = orch
            .run(Mode::Cleanup(CleanupTarget::Kubernetes))
            .await
            .unwrap_err();

        assert!(matches!(err, StackError::Prerequisite(_)));
        assert_eq!(executor.calls().len(), 1);
        assert!(gate.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_cluster_is_a_prerequisite_error() {
        let runner = Arc::new(UnreachableCluster::default());
        let config = OrchestratorConfig::new("staging", StackConfig::default());
        let executor = Arc::new(StackExecutor::new(&config.stack, "staging", runner.clone()));
        let gate = Arc::new(ScriptedGate::new(&[true]));
        let orch = Orchestrator::new(config, executor, Arc::new(FakeCheck::healthy()), gate.clone());

        let err = orch
            .run(Mode::Cleanup(CleanupTarget::Kubernetes))
            .await
            .unwrap_err();

        assert!(matches!(err, StackError::Prerequisite(_)));
        assert!(err.to_string().contains("kubectl unreachable"));
        assert!(gate.prompts().is_empty());
        assert_eq!(
            runner.calls(),
            vec!["kubectl version --client", "kubectl cluster-info"]
        );
    }

    #[tokio::test]
    async fn test_deploy_cluster_with_five_descriptors() {
        let registry = DescriptorRegistry::new(vec![
            descriptor("infinite-ai", ResourceKind::Namespace),
            descriptor("app-config", ResourceKind::ConfigMap),
            descriptor("app-secrets", ResourceKind::Secret),
            descriptor("app", ResourceKind::Workload),
            descriptor("app-service", ResourceKind::Service),
        ]);
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(Some(registry), &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Kubernetes)).await.unwrap();

        assert_eq!(report.verdict, Verdict::Success);
        assert_eq!(report.verdict.exit_code(), 0);
        assert_eq!(report.outcomes.len(), 5);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == OperationStatus::Applied));
        assert_eq!(
            check.seen(),
            vec![
                "condition of workload/app",
                "http://localhost:8080/health",
                "http://localhost:9090/metrics",
            ]
        );
        assert_eq!(report.confirmation, Confirmation::NotRequired);
    }

    #[tokio::test]
    async fn test_deploy_cluster_stops_at_failed_ingress() {
        let executor = Arc::new(FakeExecutor::new().failing("ingress/infinite-ai-app-ingress"));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Kubernetes)).await.unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                ("namespace/infinite-ai".to_string(), OperationStatus::Applied),
                ("configmap/infinite-ai-app-config".to_string(), OperationStatus::Applied),
                ("secret/infinite-ai-app-secrets".to_string(), OperationStatus::Applied),
                ("workload/infinite-ai-app".to_string(), OperationStatus::Applied),
                ("service/infinite-ai-app-service".to_string(), OperationStatus::Applied),
                ("ingress/infinite-ai-app-ingress".to_string(), OperationStatus::Failed),
            ]
        );
        assert_eq!(report.verdict, Verdict::Failure);
        assert_ne!(report.verdict.exit_code(), 0);
        assert!(!executor.calls().iter().any(|c| c.contains("autoscaler")));
        assert!(!executor.calls().iter().any(|c| c.contains("networkPolicy")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_with_partially_ready_pods() {
        let executor = Arc::new(FakeExecutor::new().pods(3, 4));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch
            .run(Mode::HealthCheck(HealthTarget::Kubernetes))
            .await
            .unwrap();

        let pods = report
            .observations
            .iter()
            .find(|o| o.subject == "pods")
            .unwrap();
        assert_eq!(pods.detail, "3/4 ready");
        assert_eq!(report.verdict, Verdict::Partial);
        assert_eq!(check.seen(), vec!["http://localhost:8080/health"]);
        assert!(report.outcomes.is_empty());
        assert!(executor.calls_to("apply").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_with_nothing_running_fails() {
        let executor = Arc::new(FakeExecutor::new().pods(0, 0).resources(&[]));
        let check = Arc::new(FakeCheck::unhealthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch
            .run(Mode::HealthCheck(HealthTarget::Kubernetes))
            .await
            .unwrap();
        assert_eq!(report.verdict, Verdict::Failure);
    }

    #[tokio::test]
    async fn test_cleanup_all_runs_destructive_phases_in_order() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoConfirm));

        let report = orch.run(Mode::Cleanup(CleanupTarget::All)).await.unwrap();

        let calls: Vec<String> = executor
            .calls()
            .into_iter()
            .filter(|c| !c.starts_with("verify"))
            .collect();
        assert_eq!(
            calls,
            vec![
                "delete networkPolicy/infinite-ai-app-netpol",
                "delete autoscaler/infinite-ai-app-hpa",
                "delete ingress/infinite-ai-app-ingress",
                "delete service/infinite-ai-app-service",
                "delete workload/infinite-ai-app",
                "delete secret/infinite-ai-app-secrets",
                "delete configmap/infinite-ai-app-config",
                "delete namespace/infinite-ai",
                "destroy terraform",
                "delete containerSet/infinite-ai",
            ]
        );
        assert_eq!(report.verdict, Verdict::Success);
        assert_eq!(report.confirmation, Confirmation::Bypassed);
    }

    #[tokio::test]
    async fn test_declined_infrastructure_destroy_is_partial() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::healthy());
        let gate = Arc::new(ScriptedGate::new(&[true, false]));
        let orch = orchestrator(None, &executor, &check, gate.clone());

        let report = orch.run(Mode::Cleanup(CleanupTarget::All)).await.unwrap();

        assert_eq!(gate.prompts().len(), 2);
        assert!(executor.calls_to("destroy").is_empty());
        assert_eq!(executor.calls_to("delete").len(), 9);
        let skipped: Vec<_> = report
            .outcomes
            .iter()
            .filter(|o| o.status == OperationStatus::Skipped)
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(report.verdict, Verdict::Partial);
        assert_eq!(report.confirmation, Confirmation::Accepted);
    }

    #[tokio::test]
    async fn test_interrupt_between_cluster_deletes_stops_cleanup() {
        let (handle, interrupt) = InterruptHandle::new();
        let executor = Arc::new(
            FakeExecutor::new().interrupting_at("ingress/infinite-ai-app-ingress", handle),
        );
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoConfirm))
            .with_interrupt(interrupt);

        let report = orch.run(Mode::Cleanup(CleanupTarget::Kubernetes)).await.unwrap();

        assert_eq!(
            executor.calls_to("delete"),
            vec![
                "networkPolicy/infinite-ai-app-netpol",
                "autoscaler/infinite-ai-app-hpa",
                "ingress/infinite-ai-app-ingress",
            ]
        );
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failures().count(), 0);
        assert_eq!(report.verdict, Verdict::Partial);
    }

    #[tokio::test]
    async fn test_interrupt_before_infrastructure_prompt_skips_remaining_phases() {
        let (handle, interrupt) = InterruptHandle::new();
        let executor =
            Arc::new(FakeExecutor::new().interrupting_at("namespace/infinite-ai", handle));
        let check = Arc::new(FakeCheck::healthy());
        let gate = Arc::new(ScriptedGate::new(&[true, true]));
        let orch = orchestrator(None, &executor, &check, gate.clone()).with_interrupt(interrupt);

        let report = orch.run(Mode::Cleanup(CleanupTarget::All)).await.unwrap();

        assert_eq!(gate.prompts().len(), 1);
        let deleted = executor.calls_to("delete");
        assert_eq!(deleted.len(), 8);
        assert!(!deleted.contains(&"containerSet/infinite-ai".to_string()));
        assert!(executor.calls_to("destroy").is_empty());
        assert_eq!(report.verdict, Verdict::Partial);
        assert_eq!(report.confirmation, Confirmation::Accepted);
    }

    #[tokio::test]
    async fn test_failed_infrastructure_destroy_still_stops_containers() {
        let executor = Arc::new(FakeExecutor::new().failing("destroy terraform"));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoConfirm));

        let report = orch.run(Mode::Cleanup(CleanupTarget::All)).await.unwrap();

        let calls = executor.calls();
        let destroy = calls.iter().position(|c| c == "destroy terraform").unwrap();
        let containers = calls
            .iter()
            .position(|c| c == "delete containerSet/infinite-ai")
            .unwrap();
        assert!(destroy < containers);

        let last = report.outcomes.last().unwrap();
        assert_eq!(last.resource, "containerSet/infinite-ai");
        assert_eq!(last.status, OperationStatus::Applied);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.verdict, Verdict::Partial);
    }

    #[tokio::test]
    async fn test_cluster_cleanup_never_destroys_infrastructure() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoConfirm));

        orch.run(Mode::Cleanup(CleanupTarget::Kubernetes)).await.unwrap();
        assert!(executor.calls_to("destroy").is_empty());
        assert!(!executor
            .calls()
            .iter()
            .any(|c| c.contains("infrastructureStack")));
    }

    #[tokio::test]
    async fn test_terraform_cleanup_only_destroys() {
        let executor = Arc::new(FakeExecutor::new().failing("destroy terraform"));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoConfirm));

        let report = orch.run(Mode::Cleanup(CleanupTarget::Terraform)).await.unwrap();
        assert_eq!(executor.calls_to("destroy"), vec!["terraform"]);
        assert!(executor.calls_to("delete").is_empty());
        assert_eq!(report.verdict, Verdict::Partial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_probe_timeout_is_partial() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::new(|signal| {
            !signal.to_string().ends_with("/health")
        }));
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Docker)).await.unwrap();

        assert_eq!(executor.calls_to("build"), vec!["image"]);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.verdict, Verdict::Partial);
        assert!(!report.probes[0].healthy);
        assert!(report.probes[1].healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auxiliary_probe_timeout_keeps_success() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::new(|signal| {
            !signal.to_string().ends_with("/metrics")
        }));
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Docker)).await.unwrap();

        assert_eq!(report.verdict, Verdict::Success);
        assert_eq!(report.probes.len(), 2);
        assert!(!report.probes[1].healthy);
        assert_eq!(report.probes[1].role, ProbeRole::Auxiliary);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollout_timeout_is_partial_without_rollback() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::new(|signal| {
            !matches!(signal, ProbeSignal::Condition { .. })
        }));
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Kubernetes)).await.unwrap();

        assert_eq!(report.verdict, Verdict::Partial);
        assert_eq!(report.outcomes.len(), 8);
        assert!(executor.calls_to("delete").is_empty());
    }

    #[tokio::test]
    async fn test_build_failure_stops_docker_deploy() {
        let executor = Arc::new(FakeExecutor::new().failing("build"));
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Docker)).await.unwrap();
        assert_eq!(report.verdict, Verdict::Failure);
        assert!(executor.calls_to("apply").is_empty());
    }

    #[tokio::test]
    async fn test_deploy_full_provisions_before_cluster() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::Deploy(DeployTarget::Full)).await.unwrap();

        let applied = executor.calls_to("apply");
        assert_eq!(applied[0], "infrastructureStack/infinite-ai");
        assert_eq!(applied[1], "namespace/infinite-ai");
        assert_eq!(applied.len(), 9);
        assert_eq!(report.verdict, Verdict::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_ends_wait_as_partial() {
        let executor = Arc::new(FakeExecutor::new());
        let check = Arc::new(FakeCheck::unhealthy());
        let (handle, interrupt) = InterruptHandle::new();
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline))
            .with_interrupt(interrupt);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            handle.trigger();
        });

        let started = Instant::now();
        let report = orch.run(Mode::Deploy(DeployTarget::Docker)).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(report.verdict, Verdict::Partial);
        assert_eq!(
            report.probes[0].error_detail.as_deref(),
            Some(stackctl_network::probe::INTERRUPTED)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_docker_health_check() {
        let executor = Arc::new(
            FakeExecutor::new().containers(&[("app", true), ("redis", true)]),
        );
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch
            .run(Mode::HealthCheck(HealthTarget::Docker))
            .await
            .unwrap();
        assert_eq!(report.observations[0].detail, "2/2 running");
        assert_eq!(report.probes.len(), 2);
        assert_eq!(report.verdict, Verdict::Success);
    }

    #[tokio::test]
    async fn test_aws_health_check_reports_outputs() {
        let executor = Arc::new(
            FakeExecutor::new().outputs(&[("cluster_endpoint", "https://eks.example")]),
        );
        let check = Arc::new(FakeCheck::healthy());
        let orch = orchestrator(None, &executor, &check, Arc::new(AutoDecline));

        let report = orch.run(Mode::HealthCheck(HealthTarget::Aws)).await.unwrap();
        assert_eq!(report.observations.len(), 1);
        assert_eq!(report.observations[0].subject, "cluster_endpoint");
        assert_eq!(report.verdict, Verdict::Success);

        let empty = Arc::new(FakeExecutor::new());
        let orch = orchestrator(None, &empty, &check, Arc::new(AutoDecline));
        let report = orch.run(Mode::HealthCheck(HealthTarget::Aws)).await.unwrap();
        assert_eq!(report.verdict, Verdict::Failure);
    }
}
