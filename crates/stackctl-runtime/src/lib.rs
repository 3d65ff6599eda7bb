//! stackctl-runtime: Operation executor
//!
//! This crate invokes the external collaborators that own all real state:
//! - Cluster resource interface (`kubectl`)
//! - Infrastructure provisioning interface (`terraform`, `aws`)
//! - Container build/run interface (`docker`, `docker compose`)
//!
//! Every invocation runs under an explicit timeout, transient failures are
//! retried with exponential backoff, and each result is classified into an
//! operation outcome.

pub mod aws;
pub mod classify;
pub mod compose;
pub mod executor;
pub mod kubectl;
pub mod prereq;
pub mod process;
pub mod retry;
pub mod terraform;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{classify_failure, Change};
pub use executor::StackExecutor;
pub use process::SystemRunner;
pub use retry::RetryPolicy;
pub use traits::{CommandOutput, CommandRunner, CommandSpec, Executor, InfraProvider};
