//! Point checks backed by the HTTP client and the executor

use async_trait::async_trait;
use stackctl_network::{HttpCheck, PointCheck, ProbeSignal};
use stackctl_runtime::Executor;
use std::sync::Arc;

/// Answers HTTP signals over the network and condition signals through the
/// cluster interface
pub struct StackCheck {
    http: HttpCheck,
    executor: Arc<dyn Executor>,
}

impl StackCheck {
    pub fn new(http: HttpCheck, executor: Arc<dyn Executor>) -> Self {
        Self { http, executor }
    }
}

#[async_trait]
impl PointCheck for StackCheck {
    async fn check(&self, signal: &ProbeSignal) -> Result<(), String> {
        match signal {
            ProbeSignal::Http { url } => self.http.check_url(url).await,
            ProbeSignal::Condition { resource } => {
                match self.executor.condition_met(resource).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(format!("{} is not ready yet", resource.label())),
                    Err(e) => Err(e.to_string()),
                }
            }
        }
    }
}
