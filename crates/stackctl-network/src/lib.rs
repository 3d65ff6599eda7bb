//! stackctl-network: Readiness probing
//!
//! This crate provides the health signals the orchestrator gates on:
//! - Point checks against HTTP health and metrics endpoints
//! - Bounded readiness polling with a fixed interval
//! - An interrupt signal that aborts an in-flight wait

pub mod health;
pub mod interrupt;
pub mod probe;

pub use health::{HttpCheck, PointCheck};
pub use interrupt::{Interrupt, InterruptHandle};
pub use probe::{PollSchedule, ProbeSignal, ProbeTarget, ReadinessProbe};
