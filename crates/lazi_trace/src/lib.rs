//! Observability for the lazi resolver.
//!
//! - [`TracingSetup`] - Installs a `tracing` subscriber
//! - [`TraceObserver`] - Logs every resolver event

/// Resolver event logging.
pub mod observer;
/// Subscriber setup.
pub mod setup;

pub use observer::TraceObserver;
pub use setup::{TracingFormat, TracingSetup};
