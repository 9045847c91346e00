//! # Lazi Internal Library
//!
//! Re-exports the core lazi crates for convenience.

/// Layer 1: Resolution and materialization engine.
pub use lazi_core;

/// Layer 2: Reference locators and initializers.
pub use lazi_host;

/// Layer 2: Tracing setup and event logging.
pub use lazi_trace;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lazi_core::prelude::*;
    pub use lazi_host::{FsLocator, MemoryHost, SourceInitializer};
    pub use lazi_trace::{TraceObserver, TracingFormat, TracingSetup};
}
