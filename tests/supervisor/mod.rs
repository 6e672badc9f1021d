//! Supervisor module tests.

mod concurrency_test;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use readiness_wrapper::control::{ClientError, ControlPlaneClient};

/// Control plane double that counts calls and fails on demand.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    ready: AtomicU64,
    healthy: AtomicU64,
    fail_ready: bool,
    fail_health: bool,
}

impl ScriptedClient {
    pub fn failing_ready() -> Self {
        Self {
            fail_ready: true,
            ..Self::default()
        }
    }

    pub fn failing_health() -> Self {
        Self {
            fail_health: true,
            ..Self::default()
        }
    }

    pub fn ready_count(&self) -> u64 {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn healthy_count(&self) -> u64 {
        self.healthy.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlaneClient for ScriptedClient {
    async fn report_ready(&self) -> Result<(), ClientError> {
        self.ready.fetch_add(1, Ordering::SeqCst);
        if self.fail_ready {
            return Err(ClientError::Rejected {
                status: 500,
                body: "ready rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn report_healthy(&self) -> Result<(), ClientError> {
        self.healthy.fetch_add(1, Ordering::SeqCst);
        if self.fail_health {
            return Err(ClientError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Verify the public supervisor surface is exported from the library.
#[test]
fn all_supervisor_types_exported() {
    use readiness_wrapper::supervisor::{
        fatal_channel, is_benign_pipe_error, FatalError, ForwardOutcome, Heartbeat,
        ReadinessDetector, ReadinessLatch, StreamKind, Supervisor, FATAL_EXIT_CODE,
    };

    let _ = ReadinessLatch::new();
    let (fatal, _rx) = fatal_channel();
    let client = std::sync::Arc::new(ScriptedClient::default());
    let _ = ReadinessDetector::new("ready", client.clone(), fatal.clone());
    let _ = Heartbeat::new(client.clone(), std::time::Duration::from_secs(1), fatal);
    let _ = Supervisor::new(
        readiness_wrapper::config::SupervisorConfig::new("server"),
        client,
    );

    let _: fn() -> FatalError = || FatalError::MissingPipe(StreamKind::Stdout);
    let _ = ForwardOutcome::ClosedByShutdown;
    assert!(!is_benign_pipe_error(&std::io::Error::other("boom")));
    assert_eq!(FATAL_EXIT_CODE, 1);
}
