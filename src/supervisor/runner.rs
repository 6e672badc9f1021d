//! Supervisor runner for the wrapped server process.
//!
//! This module ties the pieces together: it starts the heartbeat, spawns the
//! child, wires its output streams through the forwarder and readiness
//! detector, then waits for whichever comes first: the child exiting or a
//! background task raising a fatal condition. Either one ends the supervisor.

use std::convert::Infallible;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinSet;

use crate::child::ChildProcess;
use crate::config::SupervisorConfig;
use crate::control::ControlPlaneClient;
use crate::display;

use super::{fatal_channel, forward_stream, FatalError, Heartbeat, ReadinessDetector, StreamKind};

/// Supervises one child process for the lifetime of the program.
pub struct Supervisor {
    config: SupervisorConfig,
    client: Arc<dyn ControlPlaneClient>,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig, client: Arc<dyn ControlPlaneClient>) -> Self {
        Self { config, client }
    }

    /// Supervise the child until something ends it.
    ///
    /// There is no successful outcome: the returned value is the condition
    /// that ended supervision, and the caller is expected to exit with
    /// [`FATAL_EXIT_CODE`](super::FATAL_EXIT_CODE). Background tasks are
    /// aborted and the child is killed before this returns.
    pub async fn run(self) -> FatalError {
        match self.supervise().await {
            Ok(never) => match never {},
            Err(e) => e,
        }
    }

    async fn supervise(self) -> Result<Infallible, FatalError> {
        self.config.validate()?;

        let (fatal, mut fatal_rx) = fatal_channel();
        let mut tasks = JoinSet::new();

        display::banner("Starting health checking");
        let heartbeat = Heartbeat::new(
            self.client.clone(),
            self.config.heartbeat_interval,
            fatal.clone(),
        );
        tasks.spawn(heartbeat.run());

        display::banner(format_args!(
            "Starting wrapper for {} {:?}",
            self.config.command, self.config.args
        ));
        let mut process = ChildProcess::spawn(&self.config.command, &self.config.args)?;
        let stdout = process
            .take_stdout()
            .ok_or(FatalError::MissingPipe(StreamKind::Stdout))?;
        let stderr = process
            .take_stderr()
            .ok_or(FatalError::MissingPipe(StreamKind::Stderr))?;
        tracing::info!(pid = process.id(), command = %self.config.command, "Server started");

        let detector = Arc::new(ReadinessDetector::new(
            self.config.readiness_marker.clone(),
            self.client.clone(),
            fatal.clone(),
        ));
        self.spawn_forwarder(
            &mut tasks,
            stdout,
            tokio::io::stdout(),
            StreamKind::Stdout,
            &detector,
        );
        self.spawn_forwarder(
            &mut tasks,
            stderr,
            tokio::io::stderr(),
            StreamKind::Stderr,
            &detector,
        );

        let cause = tokio::select! {
            status = process.wait() => match status {
                Ok(status) => FatalError::ChildExited(status),
                Err(e) => FatalError::Wait(e),
            },
            Some(error) = fatal_rx.recv() => {
                // The child is still healthy when only the control plane failed,
                // so it gets a chance to shut down. Anything else drops it, which
                // kills it.
                if error.is_control_plane() {
                    tracing::warn!(
                        pid = process.id(),
                        timeout = ?self.config.terminate_timeout,
                        "Terminating server after control plane failure"
                    );
                    if let Err(e) = process.graceful_terminate(self.config.terminate_timeout).await {
                        tracing::warn!(error = %e, "Failed to terminate server");
                    }
                }
                error
            }
        };

        tracing::debug!(
            ready = detector.latch().is_fired(),
            trigger = detector.latch().trigger(),
            "Supervision ended"
        );
        tasks.abort_all();
        Err(cause)
    }

    fn spawn_forwarder<R, W>(
        &self,
        tasks: &mut JoinSet<()>,
        source: R,
        destination: W,
        stream: StreamKind,
        detector: &Arc<ReadinessDetector>,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let detector = self.config.is_trigger(stream).then(|| detector.clone());
        tasks.spawn(async move {
            let outcome = forward_stream(source, destination, stream, detector.as_deref()).await;
            tracing::debug!(%stream, ?outcome, "Forwarding finished");
        });
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
