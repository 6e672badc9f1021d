//! Readiness detection.
//!
//! A [`ReadinessDetector`] is shared by every trigger stream. The first line
//! containing the marker flips the [`ReadinessLatch`] and reports readiness;
//! every later match, on any stream, is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::control::ControlPlaneClient;
use crate::display;

use super::{FatalError, FatalSignal, StreamKind};

/// One-shot flag recording that readiness has been reached.
#[derive(Debug, Default)]
pub struct ReadinessLatch {
    fired: AtomicBool,
    trigger: OnceLock<String>,
}

impl ReadinessLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the latch. Returns `true` for the single caller that wins.
    pub fn try_fire(&self, trigger: impl Into<String>) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.trigger.set(trigger.into());
        true
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Label of the event that fired the latch.
    #[must_use]
    pub fn trigger(&self) -> Option<&str> {
        self.trigger.get().map(String::as_str)
    }
}

/// Scans lines for the readiness marker and reports readiness once.
pub struct ReadinessDetector {
    marker: String,
    latch: ReadinessLatch,
    client: Arc<dyn ControlPlaneClient>,
    fatal: FatalSignal,
}

impl ReadinessDetector {
    #[must_use]
    pub fn new(
        marker: impl Into<String>,
        client: Arc<dyn ControlPlaneClient>,
        fatal: FatalSignal,
    ) -> Self {
        Self {
            marker: marker.into(),
            latch: ReadinessLatch::new(),
            client,
            fatal,
        }
    }

    #[must_use]
    pub fn latch(&self) -> &ReadinessLatch {
        &self.latch
    }

    /// Inspect one line from `stream`.
    ///
    /// Returns `true` if this call fired the latch. A failed readiness report
    /// is raised as [`FatalError::ReadyReport`].
    pub async fn on_line(&self, line: &str, stream: StreamKind) -> bool {
        if self.latch.is_fired() || !line.contains(&self.marker) {
            return false;
        }
        if !self.latch.try_fire(format!("{stream} line")) {
            return false;
        }

        let trigger = self.latch.trigger().unwrap_or_default();
        display::ready(trigger);
        tracing::info!(%stream, trigger, "Readiness marker observed");

        if let Err(e) = self.client.report_ready().await {
            self.fatal.raise(FatalError::ReadyReport(e));
        }
        true
    }
}

impl std::fmt::Debug for ReadinessDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessDetector")
            .field("marker", &self.marker)
            .field("latch", &self.latch)
            .finish_non_exhaustive()
    }
}
