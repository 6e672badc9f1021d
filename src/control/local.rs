//! Control plane stand-in for running without a sidecar.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{ClientError, ControlPlaneClient};

/// Logs and counts reports instead of sending them anywhere.
#[derive(Debug, Default)]
pub struct LocalClient {
    ready: AtomicU64,
    healthy: AtomicU64,
}

impl LocalClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of readiness reports received so far.
    #[must_use]
    pub fn ready_count(&self) -> u64 {
        self.ready.load(Ordering::SeqCst)
    }

    /// Number of health reports received so far.
    #[must_use]
    pub fn healthy_count(&self) -> u64 {
        self.healthy.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlaneClient for LocalClient {
    async fn report_ready(&self) -> Result<(), ClientError> {
        let count = self.ready.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(count, "Local control plane received ready");
        Ok(())
    }

    async fn report_healthy(&self) -> Result<(), ClientError> {
        let count = self.healthy.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(count, "Local control plane received health ping");
        Ok(())
    }
}
