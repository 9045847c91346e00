//! In-memory host.
//!
//! [`MemoryHost`] is both a [`Locator`] and an [`Initializer`] over a fixed
//! table of resources, each with an origin and an optional init closure. It
//! counts every locate and init call per name, which makes it the host of
//! choice for demos and tests.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use lazi_core::prelude::*;
//! use lazi_host::MemoryHost;
//!
//! let host = Rc::new(
//!     MemoryHost::new()
//!         .with_package("app")
//!         .with_resource_init("app.db", |ctx| {
//!             ctx.object().set("url", "sqlite::memory:");
//!             Ok(())
//!         }),
//! );
//!
//! let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));
//! let _installed = resolver.scoped();
//!
//! let db = resolver.import("app.db").unwrap();
//! assert_eq!(host.init_count("app.db"), 0);
//! assert_eq!(db.get("url").unwrap(), Value::from("sqlite::memory:"));
//! assert_eq!(host.init_count("app.db"), 1);
//! ```

use core::cell::RefCell;
use core::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hashbrown::HashMap;
use lazi_core::collab::{BoxError, InitContext, Initializer, Locator};
use lazi_core::object::Object;
use lazi_core::spec::{Origin, OriginKind};

/// Init closure stored per resource.
pub type InitFn = Rc<dyn Fn(&mut InitContext<'_>) -> Result<(), BoxError>>;

/// URI scheme of in-memory origins.
pub const MEMORY_SCHEME: &str = "mem://";

struct Entry {
    origin: Origin,
    init: Option<InitFn>,
}

/// Locator and initializer over an in-memory resource table.
#[derive(Default)]
pub struct MemoryHost {
    entries: HashMap<String, Entry>,
    locates: RefCell<HashMap<String, usize>>,
    inits: RefCell<HashMap<String, usize>>,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the in-memory location of `name`.
    #[must_use]
    pub fn location(name: &str) -> String {
        format!("{MEMORY_SCHEME}{}", name.replace('.', "/"))
    }

    /// Registers `name` as a source resource with no init closure.
    #[must_use]
    pub fn with_resource(self, name: &str) -> Self {
        self.with_entry(name, Origin::source(Self::location(name)), None)
    }

    /// Registers `name` as a source resource initialized by `init`.
    #[must_use]
    pub fn with_resource_init<F>(self, name: &str, init: F) -> Self
    where
        F: Fn(&mut InitContext<'_>) -> Result<(), BoxError> + 'static,
    {
        self.with_entry(name, Origin::source(Self::location(name)), Some(Rc::new(init)))
    }

    /// Registers `name` as a package: its location doubles as the search
    /// location of its children.
    #[must_use]
    pub fn with_package(self, name: &str) -> Self {
        let location = Self::location(name);
        let origin = Origin::source(format!("{location}/index"))
            .with_search_locations(vec![PathBuf::from(location)]);
        self.with_entry(name, origin, None)
    }

    /// Registers `name` as a built-in resource initialized by `init`.
    #[must_use]
    pub fn with_builtin<F>(self, name: &str, init: F) -> Self
    where
        F: Fn(&mut InitContext<'_>) -> Result<(), BoxError> + 'static,
    {
        self.with_entry(name, Origin::builtin(), Some(Rc::new(init)))
    }

    /// Registers `name` with an explicit origin and optional init closure.
    #[must_use]
    pub fn with_origin(self, name: &str, origin: Origin, init: Option<InitFn>) -> Self {
        self.with_entry(name, origin, init)
    }

    fn with_entry(mut self, name: &str, origin: Origin, init: Option<InitFn>) -> Self {
        self.entries.insert(name.to_owned(), Entry { origin, init });
        self
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns how many times `name` was located.
    #[must_use]
    pub fn locate_count(&self, name: &str) -> usize {
        self.locates.borrow().get(name).copied().unwrap_or(0)
    }

    /// Returns how many times `name` was initialized.
    #[must_use]
    pub fn init_count(&self, name: &str) -> usize {
        self.inits.borrow().get(name).copied().unwrap_or(0)
    }

    /// Returns the number of init calls over all names.
    #[must_use]
    pub fn total_inits(&self) -> usize {
        self.inits.borrow().values().sum()
    }
}

impl Locator for MemoryHost {
    fn locate(
        &self,
        name: &str,
        search_path: Option<&[PathBuf]>,
        _target: Option<&Object>,
    ) -> Option<Origin> {
        *self.locates.borrow_mut().entry(name.to_owned()).or_insert(0) += 1;

        let entry = self.entries.get(name)?;
        // Children of a package only resolve through its search locations.
        if let (Some(search_path), OriginKind::Source) = (search_path, entry.origin.kind) {
            let location = Self::location(name);
            let reachable = search_path
                .iter()
                .any(|dir| Path::new(&location).starts_with(dir));
            if !reachable {
                tracing::trace!(name, "not under the search path");
                return None;
            }
        }
        Some(entry.origin.clone())
    }
}

impl Initializer for MemoryHost {
    fn initialize(&self, ctx: &mut InitContext<'_>) -> Result<(), BoxError> {
        let name = ctx.name().to_owned();
        *self.inits.borrow_mut().entry(name.clone()).or_insert(0) += 1;

        match self.entries.get(&name).and_then(|entry| entry.init.clone()) {
            Some(init) => init(ctx),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("resources", &self.entries.len())
            .field("inits", &self.total_inits())
            .finish_non_exhaustive()
    }
}
