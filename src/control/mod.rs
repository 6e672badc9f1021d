//! Control plane clients for reporting readiness and health.
//!
//! The supervisor only ever talks to the control plane through the
//! [`ControlPlaneClient`] trait. Two implementations ship with the crate:
//!
//! - [`HttpSdkClient`] speaks the Agones SDK sidecar REST protocol.
//! - [`LocalClient`] logs and counts reports without any sidecar.

mod client;
mod http;
mod local;

pub use client::*;
pub use http::*;
pub use local::*;
