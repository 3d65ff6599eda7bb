//! stackctl-orchestrator: Deployment orchestration
//!
//! This crate drives one run of a mode over the descriptor registry:
//! - Fail-fast, ordered apply for deploys, gated on readiness probes
//! - Confirmation-gated, best-effort teardown in reverse order
//! - Read-only health checks folded into a verdict

pub mod checks;
pub mod confirm;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use checks::StackCheck;
pub use confirm::{AutoConfirm, AutoDecline, ConfirmationGate, InteractiveGate};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
