//! Readiness Wrapper - report readiness and health of a wrapped server
//! to its orchestrator.

pub mod child;
pub mod config;
pub mod control;
pub mod display;
pub mod supervisor;
