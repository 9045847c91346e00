//! The resolver: names in, records out.
//!
//! [`Resolver`] owns everything that is scope-wide: the collaborators, the
//! configuration, the registry of records, the resolution stack and the
//! hooks. It is a cheap handle; clones share the same state.
//!
//! # Installation
//!
//! Deferral only happens while the resolver is installed. Installation is
//! reference counted: nested [`install`](Resolver::install) calls stack, and
//! the registry is invalidated when the count returns to zero. While not
//! installed, resolution passes straight through to the collaborators and
//! materializes eagerly, like a host without the hook. Those records are
//! still cached per name until the next invalidation.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::path::PathBuf;
//! use std::rc::Rc;
//! use lazi_core::prelude::*;
//!
//! struct Host {
//!     inits: Cell<usize>,
//! }
//!
//! impl Locator for Host {
//!     fn locate(&self, name: &str, _: Option<&[PathBuf]>, _: Option<&Object>) -> Option<Origin> {
//!         (name == "heavy").then(|| Origin::source("mem://heavy"))
//!     }
//! }
//!
//! impl Initializer for Host {
//!     fn initialize(&self, ctx: &mut InitContext<'_>) -> Result<(), BoxError> {
//!         self.inits.set(self.inits.get() + 1);
//!         ctx.object().set("answer", 42);
//!         Ok(())
//!     }
//! }
//!
//! let host = Rc::new(Host { inits: Cell::new(0) });
//! let resolver = Resolver::new(Rc::clone(&host), Rc::clone(&host));
//! let _installed = resolver.scoped();
//!
//! let heavy = resolver.import("heavy").unwrap();
//! assert_eq!(heavy.state(), State::Lazy);
//! assert_eq!(host.inits.get(), 0);
//!
//! assert_eq!(heavy.get("answer").unwrap(), Value::Int(42));
//! assert_eq!(heavy.state(), State::Loaded);
//! assert_eq!(host.inits.get(), 1);
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::collab::{Initializer, Locator};
use crate::config::Config;
use crate::error::LaziError;
use crate::hooks::schedule::{
    OnInstall, OnInvalidated, OnResolved, OnUninstall, Schedule, ScheduleId,
};
use crate::hooks::{HooksAPI, ResolverEvent};
use crate::level::{Level, LevelTable};
use crate::object::Object;
use crate::proxy::Proxy;
use crate::record::Record;
use crate::spec::{Specification, parent_of};

// ─────────────────────────────────────────────────────────────────────────────
// Stack
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the resolution stack.
pub(crate) enum Frame {
    /// A name is being located.
    Resolving(String),
    /// A record's initializer is running.
    Materializing(Record),
}

/// Pops the stack back to where it was when dropped.
pub(crate) struct FrameGuard<'a> {
    stack: &'a RefCell<Vec<Frame>>,
    depth: usize,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        let popped: Vec<Frame> = {
            let mut stack = self.stack.borrow_mut();
            let depth = self.depth.min(stack.len());
            stack.split_off(depth)
        };
        drop(popped);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

/// Scope-wide resolution context.
///
/// Single threaded: the type is neither `Send` nor `Sync`.
#[derive(Clone)]
pub struct Resolver {
    inner: Rc<ResolverInner>,
}

pub(crate) struct ResolverInner {
    locator: Rc<dyn Locator>,
    initializer: Rc<dyn Initializer>,
    config: RefCell<Config>,
    levels: RefCell<LevelTable>,
    /// Configuration staged by `configure`, applied at the next install.
    pending: RefCell<Option<(Config, LevelTable)>>,
    installs: Cell<usize>,
    generation: Cell<u64>,
    /// Registered records, in resolution order.
    registry: RefCell<IndexMap<String, Record>>,
    /// Records kept for identity only; not listed.
    passthrough: RefCell<HashMap<String, Record>>,
    stack: RefCell<Vec<Frame>>,
    hooks: HooksAPI,
}

impl Resolver {
    /// Creates a resolver with the default configuration.
    #[must_use]
    pub fn new(locator: impl Locator + 'static, initializer: impl Initializer + 'static) -> Self {
        Self::build(
            Config::default(),
            LevelTable::default(),
            Rc::new(locator),
            Rc::new(initializer),
        )
    }

    /// Creates a resolver with `config`.
    ///
    /// # Errors
    ///
    /// [`LaziError::InvalidPattern`] if a level rule does not compile.
    pub fn with_config(
        config: Config,
        locator: impl Locator + 'static,
        initializer: impl Initializer + 'static,
    ) -> Result<Self, LaziError> {
        let levels = config.level_table()?;
        Ok(Self::build(
            config,
            levels,
            Rc::new(locator),
            Rc::new(initializer),
        ))
    }

    fn build(
        config: Config,
        levels: LevelTable,
        locator: Rc<dyn Locator>,
        initializer: Rc<dyn Initializer>,
    ) -> Self {
        Self {
            inner: Rc::new(ResolverInner {
                locator,
                initializer,
                config: RefCell::new(config),
                levels: RefCell::new(levels),
                pending: RefCell::new(None),
                installs: Cell::new(0),
                generation: Cell::new(0),
                registry: RefCell::new(IndexMap::new()),
                passthrough: RefCell::new(HashMap::new()),
                stack: RefCell::new(Vec::new()),
                hooks: HooksAPI::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ResolverInner>) -> Self {
        Self { inner }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Installation
    // ─────────────────────────────────────────────────────────────────────

    /// Installs the hook, returning the new install count.
    ///
    /// Staged configuration is applied first. The hook is registered only
    /// on the transition from zero.
    pub fn install(&self) -> usize {
        if let Some((config, levels)) = self.inner.pending.take() {
            tracing::debug!(default_level = %levels.default_level(), rules = levels.len(), "applying staged configuration");
            *self.inner.config.borrow_mut() = config;
            *self.inner.levels.borrow_mut() = levels;
        }

        let count = self.inner.installs.get() + 1;
        self.inner.installs.set(count);
        if count == 1 {
            tracing::debug!(generation = self.generation(), "resolver hook installed");
            self.emit::<OnInstall>(&ResolverEvent::Install);
        } else {
            tracing::trace!(count, "resolver install nested");
        }
        count
    }

    /// Releases one installation. Returns `true` when the hook was removed.
    ///
    /// Removing the hook invalidates the registry. Calling this while not
    /// installed does nothing.
    pub fn uninstall(&self) -> bool {
        let count = self.inner.installs.get();
        if count == 0 {
            tracing::warn!("uninstall called on a resolver that is not installed; ignoring");
            return false;
        }
        self.inner.installs.set(count - 1);
        if count > 1 {
            tracing::trace!(count = count - 1, "resolver install released");
            return false;
        }

        self.invalidate_caches();
        tracing::debug!(generation = self.generation(), "resolver hook removed");
        self.emit::<OnUninstall>(&ResolverEvent::Uninstall);
        true
    }

    /// Installs the hook until the returned guard is dropped.
    pub fn scoped(&self) -> InstallGuard {
        self.install();
        InstallGuard {
            resolver: self.clone(),
        }
    }

    /// Returns `true` while at least one installation is active.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.inner.installs.get() > 0
    }

    /// Returns the number of active installations.
    #[must_use]
    pub fn install_count(&self) -> usize {
        self.inner.installs.get()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────

    /// Returns a copy of the active configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        self.inner.config.borrow().clone()
    }

    /// Stages `config`; it takes effect at the next [`install`](Self::install).
    ///
    /// # Errors
    ///
    /// [`LaziError::InvalidPattern`] if a level rule does not compile. The
    /// previously staged configuration, if any, is kept.
    pub fn configure(&self, config: Config) -> Result<(), LaziError> {
        let levels = config.level_table()?;
        *self.inner.pending.borrow_mut() = Some((config, levels));
        Ok(())
    }

    /// Returns the level that applies to `name`.
    #[must_use]
    pub fn level_for(&self, name: &str) -> Level {
        self.inner.levels.borrow().level_for(name)
    }

    pub(crate) fn auto_dependency_load(&self) -> bool {
        self.inner.config.borrow().auto_dependency_load
    }

    pub(crate) fn initializer(&self) -> Rc<dyn Initializer> {
        Rc::clone(&self.inner.initializer)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves `name` into its record.
    ///
    /// # Errors
    ///
    /// Only eager materialization failures. A name that cannot be found
    /// still resolves; the error surfaces on first access.
    pub fn resolve(&self, name: &str) -> Result<Record, LaziError> {
        self.resolve_with(name, None, None)
    }

    /// Resolves `name` with optional search-path and target overrides.
    ///
    /// - A cached record is returned as is; supplied overrides update its
    ///   specification.
    /// - A name that is already being located further up the stack yields
    ///   an unregistered partial record instead of recursing.
    /// - Otherwise the parent of a nested name is resolved first (its
    ///   search locations become the default search path), the name is
    ///   located, and the new record is registered and driven: hooked
    ///   records are created and lazily triggered, unhooked ones are
    ///   materialized directly.
    ///
    /// # Errors
    ///
    /// Eager materialization failures of the name or of its parents.
    pub fn resolve_with(
        &self,
        name: &str,
        search_path: Option<Vec<PathBuf>>,
        target: Option<Object>,
    ) -> Result<Record, LaziError> {
        if !self.is_installed() {
            return self.resolve_passthrough(name, search_path, target);
        }
        if let Some(record) = self.cached(name) {
            return Ok(Self::apply_overrides(record, search_path, target));
        }
        if self.is_resolving(name) {
            return Ok(self.partial(name));
        }

        let search_path = match search_path {
            Some(search_path) => Some(search_path),
            None => self.parent_search_path(name)?,
        };
        // The parent's initializer may have resolved this name already.
        if let Some(record) = self.cached(name) {
            return Ok(Self::apply_overrides(record, search_path, target));
        }

        let record = self.locate(name, search_path, target, true);
        let registered = self.register(&record);
        tracing::debug!(
            name,
            level = %record.spec().level(),
            hooked = record.is_hooked(),
            found = record.spec().origin().is_some(),
            registered,
            "resolved"
        );
        self.emit::<OnResolved>(&ResolverEvent::Resolved {
            name: name.to_owned(),
            level: record.spec().level(),
            hooked: record.is_hooked(),
            found: record.spec().origin().is_some(),
        });

        if record.is_hooked() {
            record.create()?;
            record.trigger(false)?;
        } else if record.spec().origin().is_some() {
            record.load_direct()?;
        }
        Ok(record)
    }

    /// Resolves `name` and returns its proxy.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn import(&self, name: &str) -> Result<Proxy, LaziError> {
        Ok(self.resolve(name)?.proxy())
    }

    fn resolve_passthrough(
        &self,
        name: &str,
        search_path: Option<Vec<PathBuf>>,
        target: Option<Object>,
    ) -> Result<Record, LaziError> {
        if let Some(record) = self.cached(name) {
            return Ok(Self::apply_overrides(record, search_path, target));
        }
        if self.is_resolving(name) {
            return Ok(self.partial(name));
        }
        tracing::trace!(name, "resolver not installed; resolving eagerly");
        let record = self.locate(name, search_path, target, false);
        self.inner
            .passthrough
            .borrow_mut()
            .insert(name.to_owned(), record.clone());
        if record.spec().origin().is_some() {
            record.load_direct()?;
        }
        Ok(record)
    }

    fn cached(&self, name: &str) -> Option<Record> {
        let record = self
            .inner
            .registry
            .borrow()
            .get(name)
            .cloned()
            .or_else(|| self.inner.passthrough.borrow().get(name).cloned());
        if record.is_some() {
            tracing::trace!(name, "cache hit");
        }
        record
    }

    fn apply_overrides(
        record: Record,
        search_path: Option<Vec<PathBuf>>,
        target: Option<Object>,
    ) -> Record {
        if let Some(search_path) = search_path {
            record.spec().set_search_path(search_path);
        }
        if let Some(target) = target {
            record.spec().set_target(target);
        }
        record
    }

    fn is_resolving(&self, name: &str) -> bool {
        self.inner
            .stack
            .borrow()
            .iter()
            .any(|frame| matches!(frame, Frame::Resolving(resolving) if resolving == name))
    }

    fn partial(&self, name: &str) -> Record {
        tracing::debug!(name, "already resolving; returning partial record");
        Record::new(
            Specification::partial(name),
            Rc::downgrade(&self.inner),
            self.generation(),
            true,
        )
    }

    fn parent_search_path(&self, name: &str) -> Result<Option<Vec<PathBuf>>, LaziError> {
        let Some(parent) = parent_of(name) else {
            return Ok(None);
        };
        let parent = self.resolve(parent)?;
        Ok(parent
            .spec()
            .origin()
            .and_then(|origin| origin.search_locations.clone()))
    }

    /// Asks the locator about `name` and builds the (unregistered) record.
    fn locate(
        &self,
        name: &str,
        search_path: Option<Vec<PathBuf>>,
        target: Option<Object>,
        hookable: bool,
    ) -> Record {
        let origin = {
            let _frame = self.enter(Frame::Resolving(name.to_owned()));
            let locator = Rc::clone(&self.inner.locator);
            locator.locate(name, search_path.as_deref(), target.as_ref())
        };

        let spec = {
            let config = self.inner.config.borrow();
            let levels = self.inner.levels.borrow();
            if hookable {
                Specification::new(name, origin, &config, &levels)
            } else {
                let config = config.clone().with_hook_enabled(false);
                Specification::new(name, origin, &config, &levels)
            }
        };
        let record = Record::new(spec, Rc::downgrade(&self.inner), self.generation(), false);
        Self::apply_overrides(record, search_path, target)
    }

    /// Stores the record in the registry, or in the pass-through cache when
    /// the keep policies exclude it. Returns `true` if registered.
    fn register(&self, record: &Record) -> bool {
        let keep = {
            let config = self.inner.config.borrow();
            record.is_hooked()
                || (config.keep_zero_hook_records
                    && (record.spec().origin().is_some() || config.keep_empty_records))
        };
        let name = record.name().to_owned();
        if keep {
            self.inner.registry.borrow_mut().insert(name, record.clone());
        } else {
            self.inner.passthrough.borrow_mut().insert(name, record.clone());
        }
        keep
    }

    /// Drops `record` from the registry and the pass-through cache, if it is
    /// the record stored under its name.
    pub(crate) fn forget(&self, record: &Record) {
        let name = record.name();
        let mut registry = self.inner.registry.borrow_mut();
        if registry.get(name).is_some_and(|stored| stored.ptr_eq(record)) {
            registry.shift_remove(name);
            tracing::trace!(name, "record dropped from the registry");
        }
        let mut passthrough = self.inner.passthrough.borrow_mut();
        if passthrough.get(name).is_some_and(|stored| stored.ptr_eq(record)) {
            passthrough.remove(name);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the registered record for `name`.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<Record> {
        self.inner.registry.borrow().get(name).cloned()
    }

    /// Returns all registered records in resolution order.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.inner.registry.borrow().values().cloned().collect()
    }

    /// Returns the registered records that have been materialized for use.
    #[must_use]
    pub fn used(&self) -> Vec<Record> {
        self.inner
            .registry
            .borrow()
            .values()
            .filter(|record| record.is_used())
            .cloned()
            .collect()
    }

    /// Returns the number of records kept only for identity.
    #[must_use]
    pub fn passthrough_count(&self) -> usize {
        self.inner.passthrough.borrow().len()
    }

    /// Returns the current generation; bumped by every invalidation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    /// Returns the depth of the resolution stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.inner.stack.borrow().len()
    }

    /// Invalidates every record and starts a new generation.
    ///
    /// Unless `soft_invalidation` is set, each record is torn down: it goes
    /// `DEAD` and releases its object. Proxies already handed out then
    /// report [`LaziError::Invalidated`] (flattened proxies keep their
    /// object). Resolving a name again yields a fresh record.
    pub fn invalidate_caches(&self) {
        let registry = self.inner.registry.take();
        let passthrough = self.inner.passthrough.take();
        let stack = self.inner.stack.take();
        drop(stack);

        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        let soft = self.inner.config.borrow().soft_invalidation;
        if !soft {
            for record in registry.values().chain(passthrough.values()) {
                record.invalidate();
            }
        }

        tracing::debug!(generation, records = registry.len(), soft, "caches invalidated");
        self.emit::<OnInvalidated>(&ResolverEvent::Invalidated {
            generation,
            records: registry.len(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Hooks & stack
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the observer registry.
    #[must_use]
    pub fn hooks(&self) -> &HooksAPI {
        &self.inner.hooks
    }

    pub(crate) fn emit<S: Schedule>(&self, event: &ResolverEvent) {
        self.inner.hooks.invoke(ScheduleId::of::<S>(), event);
    }

    pub(crate) fn enter(&self, frame: Frame) -> FrameGuard<'_> {
        let mut stack = self.inner.stack.borrow_mut();
        let depth = stack.len();
        stack.push(frame);
        FrameGuard {
            stack: &self.inner.stack,
            depth,
        }
    }

    /// Returns the record whose initializer is running closest to the top
    /// of the stack.
    pub(crate) fn nearest_materializing(&self) -> Option<Record> {
        self.inner
            .stack
            .borrow()
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Materializing(record) => Some(record.clone()),
                Frame::Resolving(_) => None,
            })
    }

    /// Returns `true` if both handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Resolver) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("installs", &self.inner.installs.get())
            .field("generation", &self.inner.generation.get())
            .field(
                "records",
                &self.inner.registry.try_borrow().map_or(0, |r| r.len()),
            )
            .field("hooks", &self.inner.hooks)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InstallGuard
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps a resolver installed until dropped.
#[must_use = "the resolver is uninstalled as soon as the guard is dropped"]
pub struct InstallGuard {
    resolver: Resolver,
}

impl InstallGuard {
    /// Returns the guarded resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        self.resolver.uninstall();
    }
}
