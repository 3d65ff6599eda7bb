//! Operation outcomes, probe results and the run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::Mode;

/// Result status of one executed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// The change took effect (created, updated or deleted)
    Applied,
    /// Nothing to do: already present for apply, already gone for delete
    AlreadyExists,
    /// Deliberately not executed
    Skipped,
    /// The operation did not converge
    Failed,
}

impl OperationStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, OperationStatus::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Applied => write!(f, "applied"),
            OperationStatus::AlreadyExists => write!(f, "alreadyExists"),
            OperationStatus::Skipped => write!(f, "skipped"),
            OperationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one side-effecting operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Resource label (`kind/name`) or action name
    pub resource: String,
    pub status: OperationStatus,
    pub message: String,
    /// Number of attempts made, retries included
    pub attempts: u32,
}

impl OperationOutcome {
    pub fn new(
        resource: impl Into<String>,
        status: OperationStatus,
        message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            resource: resource.into(),
            status,
            message: message.into(),
            attempts,
        }
    }

    pub fn applied(resource: impl Into<String>, message: impl Into<String>, attempts: u32) -> Self {
        Self::new(resource, OperationStatus::Applied, message, attempts)
    }

    pub fn already_exists(
        resource: impl Into<String>,
        message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::new(resource, OperationStatus::AlreadyExists, message, attempts)
    }

    pub fn skipped(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(resource, OperationStatus::Skipped, message, 0)
    }

    pub fn failed(resource: impl Into<String>, message: impl Into<String>, attempts: u32) -> Self {
        Self::new(resource, OperationStatus::Failed, message, attempts)
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

/// Whether a failed probe blocks success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeRole {
    /// Primary health signal; unhealthy degrades the verdict
    Primary,
    /// Auxiliary signal such as metrics; unhealthy is only logged
    Auxiliary,
}

/// Last result of a readiness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub target: String,
    pub role: ProbeRole,
    pub healthy: bool,
    /// Duration of the last check
    #[serde(with = "duration_ms")]
    pub latency: Duration,
    pub error_detail: Option<String>,
    /// Number of checks issued
    pub attempts: u32,
}

impl ProbeResult {
    /// Probe did not report healthy in time (timed out or interrupted)
    pub fn timed_out(&self) -> bool {
        !self.healthy
    }
}

/// A read-only fact gathered by a health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub subject: String,
    pub detail: String,
    pub healthy: bool,
}

impl Observation {
    pub fn new(subject: impl Into<String>, detail: impl Into<String>, healthy: bool) -> Self {
        Self {
            subject: subject.into(),
            detail: detail.into(),
            healthy,
        }
    }
}

/// Ready versus desired pod count in a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodReadiness {
    pub ready: u32,
    pub total: u32,
}

impl PodReadiness {
    pub fn all_ready(&self) -> bool {
        self.total > 0 && self.ready == self.total
    }
}

impl fmt::Display for PodReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ready", self.ready, self.total)
    }
}

/// State of one container of the local container set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    pub name: String,
    pub running: bool,
    pub status: String,
}

/// How the confirmation gate was passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    NotRequired,
    Accepted,
    /// Non-interactive force flag supplied by the invoker
    Bypassed,
    Declined,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::NotRequired => write!(f, "not required"),
            Confirmation::Accepted => write!(f, "accepted"),
            Confirmation::Bypassed => write!(f, "bypassed"),
            Confirmation::Declined => write!(f, "declined"),
        }
    }
}

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Partial,
    Failure,
    Aborted,
}

impl Verdict {
    /// Process exit code; non-zero whenever the verdict is not success
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Success => 0,
            _ => 1,
        }
    }

    /// Combine with another verdict, keeping the worse one
    pub fn worst(self, other: Verdict) -> Verdict {
        fn rank(v: Verdict) -> u8 {
            match v {
                Verdict::Success => 0,
                Verdict::Partial => 1,
                Verdict::Failure => 2,
                Verdict::Aborted => 3,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => write!(f, "success"),
            Verdict::Partial => write!(f, "partial"),
            Verdict::Failure => write!(f, "failure"),
            Verdict::Aborted => write!(f, "aborted"),
        }
    }
}

/// Ordered record of one orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: Mode,
    pub environment: String,
    pub outcomes: Vec<OperationOutcome>,
    pub probes: Vec<ProbeResult>,
    pub observations: Vec<Observation>,
    pub confirmation: Confirmation,
    pub verdict: Verdict,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Start an empty report
    pub fn new(mode: Mode, environment: impl Into<String>) -> Self {
        Self {
            mode,
            environment: environment.into(),
            outcomes: Vec::new(),
            probes: Vec::new(),
            observations: Vec::new(),
            confirmation: Confirmation::NotRequired,
            verdict: Verdict::Success,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Degrade the verdict; never improves it
    pub fn degrade(&mut self, verdict: Verdict) {
        self.verdict = self.verdict.worst(verdict);
    }

    pub fn record(&mut self, outcome: OperationOutcome) -> &OperationOutcome {
        self.outcomes.push(outcome);
        &self.outcomes[self.outcomes.len() - 1]
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Stamp the end time and hand the report back
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let failed = self.failures().count();
        format!(
            "{} [{}]: {} ({} operations, {} failed, {} probes)",
            self.mode,
            self.environment,
            self.verdict,
            self.outcomes.len(),
            failed,
            self.probes.len()
        )
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
