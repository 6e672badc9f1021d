//! Periodic health pings.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::control::ControlPlaneClient;

use super::{FatalError, FatalSignal};

/// Pings the control plane on a fixed period until the process ends.
///
/// The first ping is sent immediately. A single failed ping is fatal.
pub struct Heartbeat {
    client: Arc<dyn ControlPlaneClient>,
    interval: Duration,
    fatal: FatalSignal,
}

impl Heartbeat {
    #[must_use]
    pub fn new(client: Arc<dyn ControlPlaneClient>, interval: Duration, fatal: FatalSignal) -> Self {
        Self {
            client,
            interval,
            fatal,
        }
    }

    /// Ping until a ping fails, then raise [`FatalError::Heartbeat`] and return.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut beats: u64 = 0;

        loop {
            ticker.tick().await;
            if let Err(e) = self.client.report_healthy().await {
                self.fatal.raise(FatalError::Heartbeat(e));
                return;
            }
            beats += 1;
            tracing::trace!(beats, "Health ping sent");
        }
    }
}
