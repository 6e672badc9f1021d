//! Supervision of the wrapped server: readiness detection, heartbeats,
//! output forwarding and the process lifecycle that ties them together.

mod fatal;
mod forward;
mod heartbeat;
mod readiness;
mod runner;

pub use fatal::*;
pub use forward::*;
pub use heartbeat::*;
pub use readiness::*;
pub use runner::*;
