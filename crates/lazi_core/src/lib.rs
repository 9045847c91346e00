//! The lazy resolution and materialization engine.
//!
//! `lazi_core` defers the expensive initialization of named, dot-separated
//! resources until first real use. Callers get a [`Proxy`](proxy::Proxy)
//! that looks like the resource; the first qualifying access materializes
//! it, exactly once.
//!
//! - [`resolver`] - Names to records; installation, registry, invalidation
//! - [`materializer`] - The per-record state machine
//! - [`proxy`] - Transparent stand-ins with reserved metadata attributes
//! - [`record`] - Per-name bookkeeping and dependency edges
//! - [`spec`] - Specifications and origins
//! - [`level`] - Laziness levels and the per-name level table
//! - [`config`] - Configuration from code, JSON or environment
//! - [`collab`] - The [`Locator`](collab::Locator) and
//!   [`Initializer`](collab::Initializer) a host plugs in
//! - [`hooks`] - Observers for resolver events
//! - [`object`] - Backing objects and attribute values
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use lazi_core::prelude::*;
//!
//! struct Host;
//!
//! impl Locator for Host {
//!     fn locate(&self, name: &str, _: Option<&[PathBuf]>, _: Option<&Object>) -> Option<Origin> {
//!         Some(Origin::source(format!("mem://{name}")))
//!     }
//! }
//!
//! impl Initializer for Host {
//!     fn initialize(&self, ctx: &mut InitContext<'_>) -> Result<(), BoxError> {
//!         ctx.object().set("name", ctx.name());
//!         Ok(())
//!     }
//! }
//!
//! let resolver = Resolver::new(Host, Host);
//! let _installed = resolver.scoped();
//!
//! let config = resolver.import("app.config").unwrap();
//! assert_eq!(config.get("__name__").unwrap(), Value::from("app.config"));
//! assert_eq!(config.state(), State::Lazy);
//!
//! assert_eq!(config.get("name").unwrap(), Value::from("app.config"));
//! assert_eq!(config.state(), State::Loaded);
//! ```

/// Collaborator traits implemented by hosts.
pub mod collab;

/// Resolver configuration.
pub mod config;

/// Error types.
pub mod error;

/// Observer registry and resolver events.
pub mod hooks;

/// Laziness levels.
pub mod level;

/// The materializer state machine.
pub mod materializer;

/// Backing objects and values.
pub mod object;

/// Proxies.
pub mod proxy;

/// Records.
pub mod record;

/// The resolver.
pub mod resolver;

/// Specifications and origins.
pub mod spec;

/// Registry statistics.
pub mod stat;

/// Dependency trees.
pub mod tree;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::collab::{BoxError, InitContext, Initializer, Locator};
    pub use crate::config::Config;
    pub use crate::error::LaziError;
    pub use crate::hooks::schedule::*;
    pub use crate::hooks::{HookRegistrationError, HooksAPI, ResolverEvent};
    pub use crate::level::{Level, LevelRule, LevelSource};
    pub use crate::materializer::State;
    pub use crate::object::{Native, Object, Value};
    pub use crate::proxy::Proxy;
    pub use crate::record::Record;
    pub use crate::resolver::{InstallGuard, Resolver};
    pub use crate::spec::{Origin, OriginKind, Specification};
    pub use crate::stat::Stat;
    pub use crate::tree::{DependencyTree, TreeFilter};
}
