//! Point checks against health signals

use async_trait::async_trait;
use stackctl_core::{StackError, StackResult};
use std::time::Duration;
use tracing::{debug, warn};

use crate::probe::ProbeSignal;

/// One fresh check of a health signal; `Err` carries the failure detail
#[async_trait]
pub trait PointCheck: Send + Sync {
    async fn check(&self, signal: &ProbeSignal) -> Result<(), String>;
}

/// HTTP health checker for the application's endpoints
pub struct HttpCheck {
    /// HTTP client for health checks
    client: reqwest::Client,
    /// Per-request timeout
    timeout: Duration,
}

impl HttpCheck {
    /// Create a new HTTP checker
    pub fn new(timeout: Duration) -> StackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StackError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Check one URL; any 2xx status is healthy
    pub async fn check_url(&self, url: &str) -> Result<(), String> {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(endpoint = %url, "Health check passed");
                    Ok(())
                } else {
                    warn!(endpoint = %url, status = %status, "Health check failed");
                    Err(format!("{} returned {}", url, status))
                }
            }
            Err(e) => {
                debug!(endpoint = %url, error = %e, "Health check error");
                Err(format!("{} unreachable: {}", url, e))
            }
        }
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl PointCheck for HttpCheck {
    async fn check(&self, signal: &ProbeSignal) -> Result<(), String> {
        match signal {
            ProbeSignal::Http { url } => self.check_url(url).await,
            other => Err(format!("HTTP checker cannot evaluate {}", other)),
        }
    }
}
