//! Control plane client trait and errors.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from control plane calls.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to build control plane client: {0}")]
    Build(String),
    #[error("control plane unreachable: {0}")]
    Unreachable(String),
    #[error("control plane rejected the call with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("control plane request timed out")]
    Timeout,
}

/// Reports process readiness and liveness to an orchestrator.
///
/// Implementations must tolerate concurrent calls: the heartbeat task and
/// the stream tasks share one client.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Tell the control plane the wrapped server is accepting traffic.
    async fn report_ready(&self) -> Result<(), ClientError>;

    /// Tell the control plane the wrapped server is still alive.
    async fn report_healthy(&self) -> Result<(), ClientError>;
}
