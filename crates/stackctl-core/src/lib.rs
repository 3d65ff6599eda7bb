//! stackctl-core: Core types for the stackctl orchestrator
//!
//! This crate provides the fundamental types used throughout stackctl:
//! - Resource descriptors and the fixed descriptor registry
//! - Deploy / cleanup / health-check modes
//! - Configuration types
//! - Operation outcomes, probe results and run reports
//! - Error handling

pub mod config;
pub mod descriptor;
pub mod error;
pub mod mode;
pub mod report;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use mode::*;
pub use report::*;
