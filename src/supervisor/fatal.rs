//! Fatal conditions and the channel that carries them to the main task.

use std::process::ExitStatus;

use tokio::sync::mpsc;

use crate::child::{describe_exit, SpawnError};
use crate::config::ConfigError;
use crate::control::ClientError;

use super::StreamKind;

/// Exit status of the supervisor for every fatal condition.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Only the first fatal condition matters; later ones are dropped.
const FATAL_CHANNEL_BUFFER: usize = 1;

/// A condition that ends the supervisor.
#[derive(thiserror::Error, Debug)]
pub enum FatalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not connect to control plane: {0}")]
    Connect(ClientError),

    #[error("error starting server: {0}")]
    Spawn(#[from] SpawnError),

    #[error("failed to get {0} pipe")]
    MissingPipe(StreamKind),

    #[error("server shut down unexpectedly: {}", describe_exit(*.0))]
    ChildExited(ExitStatus),

    #[error("failed waiting for server: {0}")]
    Wait(std::io::Error),

    #[error("could not send health ping: {0}")]
    Heartbeat(ClientError),

    #[error("could not send ready message: {0}")]
    ReadyReport(ClientError),
}

impl FatalError {
    /// Whether the supervisor lost contact with the control plane while the
    /// child was still running.
    #[must_use]
    pub fn is_control_plane(&self) -> bool {
        matches!(self, Self::Heartbeat(_) | Self::ReadyReport(_))
    }
}

/// Sending half of the fatal channel, shared by every background task.
#[derive(Debug, Clone)]
pub struct FatalSignal {
    tx: mpsc::Sender<FatalError>,
}

impl FatalSignal {
    /// Report a fatal condition. Never blocks.
    pub fn raise(&self, error: FatalError) {
        tracing::error!(error = %error, "Fatal condition raised");
        if let Err(e) = self.tx.try_send(error) {
            tracing::debug!(error = %e, "Fatal condition already pending, dropping");
        }
    }
}

/// Create the fatal channel observed by the main task.
#[must_use]
pub fn fatal_channel() -> (FatalSignal, mpsc::Receiver<FatalError>) {
    let (tx, rx) = mpsc::channel(FATAL_CHANNEL_BUFFER);
    (FatalSignal { tx }, rx)
}
