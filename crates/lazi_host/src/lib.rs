//! Reference collaborators for the lazi resolver.
//!
//! - [`MemoryHost`] - Locator and initializer over an in-memory table
//! - [`FsLocator`] - Locator over a directory tree
//! - [`SourceInitializer`] - Reads located files into their objects

mod error;
/// Filesystem host.
pub mod fs;
/// In-memory host.
pub mod memory;

pub use error::HostError;
pub use fs::{FsLocator, SourceInitializer};
pub use memory::{InitFn, MemoryHost};
