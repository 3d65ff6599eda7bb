//! In-memory collaborators for orchestration tests

use async_trait::async_trait;
use stackctl_core::{
    ContainerState, OperationOutcome, PodReadiness, Requirement, ResourceDescriptor, StackError,
    StackResult,
};
use stackctl_network::{InterruptHandle, PointCheck, ProbeSignal};
use stackctl_runtime::{Executor, InfraProvider};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::confirm::ConfirmationGate;

/// Executor that records every call and fails the labels it is told to
pub struct FakeExecutor {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    missing_tools: bool,
    pods: PodReadiness,
    resources: Vec<String>,
    containers: Vec<ContainerState>,
    outputs: Vec<(String, String)>,
    conditions_met: bool,
    interrupt_at: Option<(String, InterruptHandle)>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            missing_tools: false,
            pods: PodReadiness { ready: 2, total: 2 },
            resources: vec!["deployment.apps/infinite-ai-app".to_string()],
            containers: Vec::new(),
            outputs: Vec::new(),
            conditions_met: true,
            interrupt_at: None,
        }
    }

    /// Fail operations on `label` (`kind/name`, `build` or `destroy <provider>`)
    pub fn failing(mut self, label: &str) -> Self {
        self.failing.insert(label.to_string());
        self
    }

    pub fn missing_tools(mut self) -> Self {
        self.missing_tools = true;
        self
    }

    pub fn pods(mut self, ready: u32, total: u32) -> Self {
        self.pods = PodReadiness { ready, total };
        self
    }

    pub fn resources(mut self, resources: &[&str]) -> Self {
        self.resources = resources.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn containers(mut self, states: &[(&str, bool)]) -> Self {
        self.containers = states
            .iter()
            .map(|(name, running)| ContainerState {
                name: name.to_string(),
                running: *running,
                status: if *running { "Up" } else { "Exited (1)" }.to_string(),
            })
            .collect();
        self
    }

    pub fn outputs(mut self, outputs: &[(&str, &str)]) -> Self {
        self.outputs = outputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn conditions_met(mut self, met: bool) -> Self {
        self.conditions_met = met;
        self
    }

    /// Fire `handle` once the operation on `label` has run
    pub fn interrupting_at(mut self, label: &str, handle: InterruptHandle) -> Self {
        self.interrupt_at = Some((label.to_string(), handle));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls with a given verb, reduced to their label
    pub fn calls_to(&self, verb: &str) -> Vec<String> {
        let prefix = format!("{} ", verb);
        self.calls()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(&self, label: String) -> OperationOutcome {
        if let Some((at, handle)) = &self.interrupt_at {
            if *at == label {
                handle.trigger();
            }
        }
        if self.failing.contains(&label) {
            OperationOutcome::failed(label, "forced failure", 1)
        } else {
            OperationOutcome::applied(label, "ok", 1)
        }
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn verify_prerequisites(&self, requirements: &[Requirement]) -> StackResult<()> {
        self.record(format!("verify {}", requirements.len()));
        if self.missing_tools {
            return Err(StackError::Prerequisite("kubectl not found on PATH".into()));
        }
        Ok(())
    }

    async fn apply(&self, descriptor: &ResourceDescriptor) -> OperationOutcome {
        self.record(format!("apply {}", descriptor.label()));
        self.outcome(descriptor.label())
    }

    async fn delete(&self, descriptor: &ResourceDescriptor) -> OperationOutcome {
        self.record(format!("delete {}", descriptor.label()));
        self.outcome(descriptor.label())
    }

    async fn build_image(&self) -> OperationOutcome {
        self.record("build image".to_string());
        self.outcome("build".to_string())
    }

    async fn destroy_infrastructure(&self, provider: InfraProvider) -> OperationOutcome {
        self.record(format!("destroy {}", provider));
        self.outcome(format!("destroy {}", provider))
    }

    async fn pod_readiness(&self) -> StackResult<PodReadiness> {
        Ok(self.pods)
    }

    async fn list_resources(&self) -> StackResult<Vec<String>> {
        Ok(self.resources.clone())
    }

    async fn container_states(&self) -> StackResult<Vec<ContainerState>> {
        Ok(self.containers.clone())
    }

    async fn infrastructure_outputs(&self) -> StackResult<Vec<(String, String)>> {
        Ok(self.outputs.clone())
    }

    async fn condition_met(&self, _descriptor: &ResourceDescriptor) -> StackResult<bool> {
        Ok(self.conditions_met)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

type Health = dyn Fn(&ProbeSignal) -> bool + Send + Sync;

/// Point check answering from a closure and recording what it was asked
pub struct FakeCheck {
    health: Box<Health>,
    seen: Mutex<Vec<String>>,
}

impl FakeCheck {
    pub fn new(health: impl Fn(&ProbeSignal) -> bool + Send + Sync + 'static) -> Self {
        Self {
            health: Box::new(health),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(|_| true)
    }

    pub fn unhealthy() -> Self {
        Self::new(|_| false)
    }

    /// Distinct signals checked, in first-seen order
    pub fn seen(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for s in self.seen.lock().unwrap().iter() {
            if !seen.contains(s) {
                seen.push(s.clone());
            }
        }
        seen
    }
}

#[async_trait]
impl PointCheck for FakeCheck {
    async fn check(&self, signal: &ProbeSignal) -> Result<(), String> {
        self.seen.lock().unwrap().push(signal.to_string());
        if (self.health)(signal) {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

/// Gate answering from a fixed list; declines once the list runs out
pub struct ScriptedGate {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGate {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}
