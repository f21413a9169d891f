//! Metrics Module
//!
//! Workspace observation and folding into system state.

pub mod collector;

pub use collector::{MetricsCollector, WorkspaceObservation};
