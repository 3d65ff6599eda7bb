//! Bounded readiness polling
//!
//! A probe issues a fresh point check, waits `interval`, and repeats until the
//! signal reports healthy or `timeout` has elapsed. Checks are scheduled at a
//! fixed rate from the start of the wait (`start + k * interval`), each check
//! is cut off after `interval`, and no sleep extends past the deadline, so a
//! wait returns within `timeout + interval`.

use stackctl_core::{ProbeResult, ProbeRole, ResourceDescriptor, StackError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::health::PointCheck;
use crate::interrupt::Interrupt;

/// Detail recorded when an external interrupt aborts a wait
pub const INTERRUPTED: &str = "interrupted";

/// The external signal a probe polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeSignal {
    /// Endpoint reachability: any 2xx response
    Http { url: String },
    /// Resource condition reported by the cluster (e.g. workload available)
    Condition { resource: ResourceDescriptor },
}

impl fmt::Display for ProbeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeSignal::Http { url } => write!(f, "{}", url),
            ProbeSignal::Condition { resource } => write!(f, "condition of {}", resource.label()),
        }
    }
}

/// A named signal and whether it gates success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub name: String,
    pub role: ProbeRole,
    pub signal: ProbeSignal,
}

impl ProbeTarget {
    pub fn primary(name: impl Into<String>, signal: ProbeSignal) -> Self {
        Self {
            name: name.into(),
            role: ProbeRole::Primary,
            signal,
        }
    }

    pub fn auxiliary(name: impl Into<String>, signal: ProbeSignal) -> Self {
        Self {
            name: name.into(),
            role: ProbeRole::Auxiliary,
            signal,
        }
    }
}

/// Timeout and interval of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSchedule {
    /// Create a schedule; a zero interval is raised to one millisecond
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

/// Polls point checks until healthy, timed out or interrupted
pub struct ReadinessProbe {
    check: Arc<dyn PointCheck>,
    interrupt: Interrupt,
}

impl ReadinessProbe {
    /// Create a probe over `check`, abortable through `interrupt`
    pub fn new(check: Arc<dyn PointCheck>, interrupt: Interrupt) -> Self {
        Self { check, interrupt }
    }

    /// Wait for `target` to become healthy
    pub async fn await_ready(&self, target: &ProbeTarget, schedule: PollSchedule) -> ProbeResult {
        let start = Instant::now();
        let deadline = start + schedule.timeout;
        let mut next_tick = start;
        let mut attempts = 0u32;
        let mut latency = Duration::ZERO;
        let mut last_error: Option<String> = None;

        info!(
            target = %target.name,
            signal = %target.signal,
            timeout_secs = schedule.timeout.as_secs(),
            "Waiting for readiness"
        );

        loop {
            if self.interrupt.is_triggered() {
                return self.interrupted(target, latency, attempts);
            }

            attempts += 1;
            let check_started = Instant::now();
            let outcome = tokio::select! {
                res = tokio::time::timeout(schedule.interval, self.check.check(&target.signal)) => {
                    match res {
                        Ok(outcome) => outcome,
                        Err(_) => Err(format!("check exceeded {:?}", schedule.interval)),
                    }
                }
                _ = self.interrupt.triggered() => {
                    return self.interrupted(target, check_started.elapsed(), attempts);
                }
            };
            latency = check_started.elapsed();

            match outcome {
                Ok(()) => {
                    info!(target = %target.name, attempts = attempts, "Target is healthy");
                    return ProbeResult {
                        target: target.name.clone(),
                        role: target.role,
                        healthy: true,
                        latency,
                        error_detail: None,
                        attempts,
                    };
                }
                Err(detail) => {
                    debug!(target = %target.name, attempt = attempts, error = %detail, "Not ready yet");
                    last_error = Some(detail);
                }
            }

            if Instant::now() >= deadline {
                break;
            }

            next_tick += schedule.interval;
            let wake = next_tick.min(deadline);
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {}
                _ = self.interrupt.triggered() => {
                    return self.interrupted(target, latency, attempts);
                }
            }
        }

        warn!(
            target = %target.name,
            attempts = attempts,
            error = last_error.as_deref().unwrap_or("unknown"),
            "Readiness wait timed out"
        );
        ProbeResult {
            target: target.name.clone(),
            role: target.role,
            healthy: false,
            latency,
            error_detail: Some(
                StackError::ReadinessTimeout(format!(
                    "no success within {:?}: {}",
                    schedule.timeout,
                    last_error.unwrap_or_else(|| "no check completed".to_string())
                ))
                .to_string(),
            ),
            attempts,
        }
    }

    fn interrupted(&self, target: &ProbeTarget, latency: Duration, attempts: u32) -> ProbeResult {
        warn!(target = %target.name, attempts = attempts, "Readiness wait interrupted");
        ProbeResult {
            target: target.name.clone(),
            role: target.role,
            healthy: false,
            latency,
            error_detail: Some(INTERRUPTED.to_string()),
            attempts,
        }
    }
}
