//! Deferred loading of named resources.
//!
//! A resource is located when its name is resolved and initialized on first
//! real use, exactly once.
//!
//! ```
//! use std::rc::Rc;
//! use lazi::prelude::*;
//!
//! let host = Rc::new(MemoryHost::new().with_resource_init("config", |ctx| {
//!     ctx.object().set("debug", true);
//!     Ok(())
//! }));
//!
//! let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));
//! let _installed = resolver.scoped();
//!
//! let config = resolver.import("config").unwrap();
//! assert_eq!(host.init_count("config"), 0);
//! assert_eq!(config.get("debug").unwrap(), Value::Bool(true));
//! assert_eq!(host.init_count("config"), 1);
//! ```

pub use lazi_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lazi_internal::prelude::*;
}
