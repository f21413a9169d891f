//! Events Module
//!
//! Buffering, fan-out and dispatch of environmental events.

pub mod bus;
pub mod processor;
pub mod queue;

pub use bus::{GovernanceBus, StateChannel};
pub use processor::{DirectorFailure, DispatchReport, EventProcessor};
pub use queue::EventQueue;
