//! Lifecycle hooks for resolution and materialization.
//!
//! The hook system lets hosts observe the resolver without taking part in
//! it: tracing, statistics, test instrumentation.
//!
//! - **Schedule markers** ([`schedule`]): empty types that identify hook points
//! - **Events** ([`events`]): the `ResolverEvent` enum every observer receives
//! - **API** ([`api`]): registration and invocation
//!
//! # Example
//!
//! ```
//! use lazi_core::hooks::ResolverEvent;
//! use lazi_core::hooks::schedule::{OnMaterialized, OnMaterializeFailed};
//! use lazi_core::prelude::*;
//!
//! # struct Nothing;
//! # impl Locator for Nothing {
//! #     fn locate(&self, _: &str, _: Option<&[std::path::PathBuf]>, _: Option<&Object>) -> Option<Origin> { None }
//! # }
//! # impl Initializer for Nothing {
//! #     fn initialize(&self, _: &mut InitContext<'_>) -> Result<(), BoxError> { Ok(()) }
//! # }
//! let resolver = Resolver::new(Nothing, Nothing);
//! resolver
//!     .hooks()
//!     .register_observer::<(OnMaterialized, OnMaterializeFailed), _>(
//!         "report",
//!         |event: &ResolverEvent| match event {
//!             ResolverEvent::Materialized { name } => println!("loaded {name}"),
//!             ResolverEvent::MaterializeFailed { name, error } => println!("{name}: {error}"),
//!             _ => {}
//!         },
//!     )
//!     .unwrap();
//! ```

pub mod api;
pub mod events;
pub mod schedule;

pub use api::{HookRegistrationError, HooksAPI};
pub use events::ResolverEvent;
