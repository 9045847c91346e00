//! Collaborator interfaces.
//!
//! The engine decides *when* a resource is located and initialized; the
//! host decides *how*. A host plugs in through two traits:
//!
//! - [`Locator`] finds the definition behind a name.
//! - [`Initializer`] performs the expensive initialization into an
//!   [`Object`].
//!
//! Both may call back into the resolver re-entrantly, for example to
//! resolve the resources a definition depends on.

use std::path::PathBuf;
use std::rc::Rc;

use crate::error::LaziError;
use crate::object::Object;
use crate::proxy::Proxy;
use crate::resolver::Resolver;
use crate::spec::{Origin, Specification};

/// Error type returned by collaborators.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Locator
// ─────────────────────────────────────────────────────────────────────────────

/// Finds resource definitions by name.
///
/// Called at most once per distinct name per resolver generation.
pub trait Locator {
    /// Returns the origin of `name`, or `None` if there is no definition.
    ///
    /// `search_path` restricts where nested resources are looked up; the
    /// resolver passes the parent package's search locations unless the
    /// caller overrides them. `target` is an existing object the caller
    /// wants the resource materialized into.
    fn locate(
        &self,
        name: &str,
        search_path: Option<&[PathBuf]>,
        target: Option<&Object>,
    ) -> Option<Origin>;
}

impl<T: Locator + ?Sized> Locator for Rc<T> {
    fn locate(
        &self,
        name: &str,
        search_path: Option<&[PathBuf]>,
        target: Option<&Object>,
    ) -> Option<Origin> {
        (**self).locate(name, search_path, target)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initializer
// ─────────────────────────────────────────────────────────────────────────────

/// Performs the real initialization of a resource.
pub trait Initializer {
    /// Optionally supplies the backing object before initialization.
    ///
    /// Returning `None` (the default) makes the engine create an empty
    /// [`Object`].
    fn create(&self, spec: &Specification) -> Option<Object> {
        let _ = spec;
        None
    }

    /// Initializes the resource into `ctx.object()`.
    ///
    /// Called at most once per record, synchronously. Returning an error
    /// marks the resource dead.
    ///
    /// # Errors
    ///
    /// Any error the host's initialization produces.
    fn initialize(&self, ctx: &mut InitContext<'_>) -> Result<(), BoxError>;
}

impl<T: Initializer + ?Sized> Initializer for Rc<T> {
    fn create(&self, spec: &Specification) -> Option<Object> {
        (**self).create(spec)
    }

    fn initialize(&self, ctx: &mut InitContext<'_>) -> Result<(), BoxError> {
        (**self).initialize(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InitContext
// ─────────────────────────────────────────────────────────────────────────────

/// What an [`Initializer`] sees while a resource executes.
pub struct InitContext<'a> {
    resolver: &'a Resolver,
    spec: &'a Specification,
    object: Object,
    replacement: Option<Object>,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(resolver: &'a Resolver, spec: &'a Specification, object: Object) -> Self {
        Self {
            resolver,
            spec,
            object,
            replacement: None,
        }
    }

    /// Returns the resolver, for nested resolution.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        self.resolver
    }

    /// Returns the specification being initialized.
    #[must_use]
    pub fn spec(&self) -> &Specification {
        self.spec
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Returns the backing object being initialized.
    #[must_use]
    pub fn object(&self) -> &Object {
        self.replacement.as_ref().unwrap_or(&self.object)
    }

    /// Resolves `name` and returns its proxy.
    ///
    /// # Errors
    ///
    /// Propagates eager materialization failures of `name`.
    pub fn import(&self, name: &str) -> Result<Proxy, LaziError> {
        self.resolver.import(name)
    }

    /// Replaces the backing object.
    ///
    /// Once initialization succeeds the replacement becomes the resource's
    /// object; attributes already set on the original object and missing
    /// from the replacement are carried over.
    pub fn replace_object(&mut self, object: Object) {
        self.replacement = Some(object);
    }

    pub(crate) fn into_replacement(self) -> Option<Object> {
        self.replacement
    }
}
