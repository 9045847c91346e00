//! Per-name bookkeeping.
//!
//! A [`Record`] pairs a [`Specification`] with its [`Materializer`], the
//! used flag, and the dependency edges discovered while it materialized.
//! Records are shared handles compared by identity; the resolver's registry
//! holds at most one per name.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::{Rc, Weak};

use crate::materializer::{Materializer, State};
use crate::object::Object;
use crate::proxy::{Proxy, ProxyInner};
use crate::resolver::{Resolver, ResolverInner};
use crate::spec::Specification;

/// Shared handle to one resource's record.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

pub(crate) struct RecordInner {
    spec: Specification,
    resolver: Weak<ResolverInner>,
    materializer: Materializer,
    used: Cell<bool>,
    partial: bool,
    generation: u64,
    /// Records created while this one was materializing, in order.
    dependencies: RefCell<Vec<Record>>,
    /// Lookup only; never keeps the parent alive.
    parent: RefCell<Weak<RecordInner>>,
    /// The live proxy, if any.
    proxy: RefCell<Weak<ProxyInner>>,
}

impl Record {
    pub(crate) fn new(
        spec: Specification,
        resolver: Weak<ResolverInner>,
        generation: u64,
        partial: bool,
    ) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                spec,
                resolver,
                materializer: Materializer::new(),
                used: Cell::new(false),
                partial,
                generation,
                dependencies: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                proxy: RefCell::new(Weak::new()),
            }),
        }
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.spec.name()
    }

    /// Returns the specification.
    #[must_use]
    pub fn spec(&self) -> &Specification {
        &self.inner.spec
    }

    /// Returns the materializer.
    #[must_use]
    pub fn materializer(&self) -> &Materializer {
        &self.inner.materializer
    }

    /// Returns the materializer state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.materializer.state()
    }

    /// Returns `true` once the resource has been materialized for use.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.inner.used.get()
    }

    pub(crate) fn set_used(&self) {
        self.inner.used.set(true);
    }

    /// Returns `true` for the stand-in handed out during cyclic resolution.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.inner.partial
    }

    /// Returns `true` if access goes through a deferring proxy.
    #[must_use]
    pub fn is_hooked(&self) -> bool {
        self.inner.spec.should_hook()
    }

    /// Returns the resolver generation the record was created in.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Returns the backing object without triggering materialization.
    #[must_use]
    pub fn object(&self) -> Option<Object> {
        self.inner.materializer.target()
    }

    /// Returns the records discovered while this one materialized.
    #[must_use]
    pub fn dependencies(&self) -> Vec<Record> {
        self.inner.dependencies.borrow().clone()
    }

    /// Returns the record this one was discovered under, if still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Record> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Record { inner })
    }

    pub(crate) fn push_dependency(&self, child: &Record) {
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.dependencies.borrow_mut().push(child.clone());
    }

    pub(crate) fn clear_dependencies(&self) {
        let dependencies = self.inner.dependencies.take();
        drop(dependencies);
    }

    /// Returns the record's proxy, creating it if none is alive.
    ///
    /// While a proxy is alive every call returns the same one.
    #[must_use]
    pub fn proxy(&self) -> Proxy {
        if let Some(proxy) = self.live_proxy() {
            return proxy;
        }
        let proxy = Proxy::new(self.clone());
        *self.inner.proxy.borrow_mut() = proxy.downgrade();
        proxy
    }

    pub(crate) fn live_proxy(&self) -> Option<Proxy> {
        Proxy::upgrade(&self.inner.proxy.borrow())
    }

    pub(crate) fn resolver(&self) -> Option<Resolver> {
        self.inner.resolver.upgrade().map(Resolver::from_inner)
    }

    /// Returns `true` if both handles refer to the same record.
    #[must_use]
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("used", &self.is_used())
            .field("hooked", &self.is_hooked())
            .field("partial", &self.is_partial())
            .field(
                "dependencies",
                &self
                    .inner
                    .dependencies
                    .try_borrow()
                    .map(|deps| deps.iter().map(|dep| dep.name().to_owned()).collect::<Vec<_>>())
                    .unwrap_or_default(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::spec::Origin;

    fn record(name: &str) -> Record {
        let config = Config::default();
        let levels = config.level_table().unwrap();
        let spec = Specification::new(name, Some(Origin::source(name)), &config, &levels);
        Record::new(spec, Weak::new(), 0, false)
    }

    #[test]
    fn identity() {
        let a = record("a");
        let alias = a.clone();
        assert!(a.ptr_eq(&alias));
        assert!(!a.ptr_eq(&record("a")));
    }

    #[test]
    fn dependency_edges_are_ordered_and_parent_is_weak() {
        let child_one = record("p.one");
        let child_two = record("p.two");
        {
            let parent = record("p");
            parent.push_dependency(&child_one);
            parent.push_dependency(&child_two);

            let names: Vec<_> = parent
                .dependencies()
                .iter()
                .map(|r| r.name().to_owned())
                .collect();
            assert_eq!(names, vec!["p.one", "p.two"]);
            assert!(child_one.parent().unwrap().ptr_eq(&parent));
        }
        assert!(child_one.parent().is_none());
    }

    #[test]
    fn proxy_is_cached_while_alive() {
        let a = record("a");
        let first = a.proxy();
        let second = a.proxy();
        assert!(first.ptr_eq(&second));
        assert!(first.record().ptr_eq(&a));
    }

    #[test]
    fn fresh_record_state() {
        let a = record("a");
        assert_eq!(a.state(), State::Init);
        assert!(!a.is_used());
        assert!(a.is_hooked());
        assert!(a.object().is_none());
        assert!(a.resolver().is_none());
    }
}
