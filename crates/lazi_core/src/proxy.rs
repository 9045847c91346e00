//! Transparent stand-ins for deferred resources.
//!
//! A [`Proxy`] is what callers hold instead of the resource itself. Reading
//! the reserved metadata attributes never materializes anything; every other
//! access materializes the resource first (exactly once) and then operates
//! on the real object.
//!
//! | Attribute | Value |
//! |-----------|-------|
//! | `__name__` | full name |
//! | `__package__` | containing package |
//! | `__file__` | origin location (only for located definitions) |
//! | `__path__` | search locations (only for packages) |
//! | `__loader__` | materializer state name |
//! | `__spec__` | `parent\|leaf` display name |
//!
//! Once a resource at a flattening level has loaded, its proxy routes
//! straight to the object.

use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

use crate::error::LaziError;
use crate::materializer::State;
use crate::object::{Object, Value};
use crate::record::Record;

/// Attribute names answered from the specification.
pub const RESERVED_ATTRIBUTES: [&str; 6] = [
    "__name__",
    "__package__",
    "__file__",
    "__path__",
    "__loader__",
    "__spec__",
];

/// Returns `true` if `attr` is answered without materializing.
#[must_use]
pub fn is_reserved(attr: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&attr)
}

/// Handle to a lazily materialized resource.
///
/// Cloning is cheap and keeps the identity: clones are [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

pub(crate) struct ProxyInner {
    record: Record,
    /// Set once the record flattens; bypasses the materializer from then on.
    direct: RefCell<Option<Object>>,
}

impl Proxy {
    pub(crate) fn new(record: Record) -> Self {
        let direct = if record.materializer().is_flattened() {
            record.object()
        } else {
            None
        };
        Self {
            inner: Rc::new(ProxyInner {
                record,
                direct: RefCell::new(direct),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<ProxyInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<ProxyInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn set_direct(&self, object: Object) {
        *self.inner.direct.borrow_mut() = Some(object);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Typed accessors (never materialize)
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.record.name()
    }

    /// Returns the materializer state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.record.state()
    }

    /// Returns `true` once the proxy routes straight to the object.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.inner.direct.borrow().is_some()
    }

    /// Returns the record behind the proxy.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.inner.record
    }

    /// Returns `true` if both handles are the same proxy.
    #[must_use]
    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────

    /// Materializes the resource if needed and returns its object.
    ///
    /// # Errors
    ///
    /// Any error from [`Record::trigger`].
    pub fn object(&self) -> Result<Object, LaziError> {
        self.materialize(None)
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// [`LaziError::NoAttribute`] if the attribute is missing, or the
    /// materialization error, carrying `attr`.
    pub fn get(&self, attr: &str) -> Result<Value, LaziError> {
        if let Some(value) = self.reserved(attr)? {
            return Ok(value);
        }
        self.materialize(Some(attr))?
            .get(attr)
            .ok_or_else(|| self.no_attribute(attr))
    }

    /// Writes an attribute, returning the previous value.
    ///
    /// # Errors
    ///
    /// [`LaziError::ReadOnly`] for reserved attributes, or the
    /// materialization error, carrying `attr`.
    pub fn set(&self, attr: &str, value: impl Into<Value>) -> Result<Option<Value>, LaziError> {
        self.reject_reserved(attr)?;
        Ok(self.materialize(Some(attr))?.set(attr, value))
    }

    /// Deletes an attribute, returning its value.
    ///
    /// # Errors
    ///
    /// [`LaziError::ReadOnly`] for reserved attributes,
    /// [`LaziError::NoAttribute`] if it is missing, or the materialization
    /// error, carrying `attr`.
    pub fn delete(&self, attr: &str) -> Result<Value, LaziError> {
        self.reject_reserved(attr)?;
        self.materialize(Some(attr))?
            .delete(attr)
            .ok_or_else(|| self.no_attribute(attr))
    }

    /// Returns `true` if the attribute exists.
    ///
    /// # Errors
    ///
    /// The materialization error for non-reserved attributes.
    pub fn contains(&self, attr: &str) -> Result<bool, LaziError> {
        match self.reserved(attr) {
            Ok(Some(_)) => return Ok(true),
            Err(LaziError::NoAttribute { .. }) => return Ok(false),
            Err(err) => return Err(err),
            Ok(None) => {}
        }
        Ok(self.materialize(Some(attr))?.contains(attr))
    }

    /// Returns the object's attribute names.
    ///
    /// # Errors
    ///
    /// The materialization error.
    pub fn keys(&self) -> Result<Vec<String>, LaziError> {
        Ok(self.materialize(None)?.keys())
    }

    fn materialize(&self, attr: Option<&str>) -> Result<Object, LaziError> {
        if let Some(object) = self.inner.direct.borrow().clone() {
            return Ok(object);
        }

        let record = &self.inner.record;
        let attach = |err: LaziError| match attr {
            Some(attr) => err.with_attr(attr),
            None => err,
        };
        record.trigger(true).map_err(attach)?;

        record.object().ok_or_else(|| {
            attach(LaziError::Unresolved {
                name: record.name().to_owned(),
                attr: None,
            })
        })
    }

    /// Serves reserved attributes from the specification.
    fn reserved(&self, attr: &str) -> Result<Option<Value>, LaziError> {
        let spec = self.inner.record.spec();
        let value = match attr {
            "__name__" => Value::from(spec.name()),
            "__package__" => Value::from(spec.package()),
            "__file__" => match spec.origin().filter(|origin| origin.has_location()) {
                Some(origin) => Value::from(origin.location.as_str()),
                None => return Err(self.no_attribute(attr)),
            },
            "__path__" => match spec.origin().and_then(|origin| origin.search_locations.as_ref()) {
                Some(locations) => Value::List(
                    locations
                        .iter()
                        .map(|path| Value::from(path.to_string_lossy().into_owned()))
                        .collect(),
                ),
                None => return Err(self.no_attribute(attr)),
            },
            "__loader__" => Value::from(self.state().as_str()),
            "__spec__" => Value::from(spec.display_name()),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn reject_reserved(&self, attr: &str) -> Result<(), LaziError> {
        if is_reserved(attr) {
            return Err(LaziError::ReadOnly {
                name: self.name().to_owned(),
                attr: attr.to_owned(),
            });
        }
        Ok(())
    }

    fn no_attribute(&self, attr: &str) -> LaziError {
        LaziError::NoAttribute {
            name: self.name().to_owned(),
            attr: attr.to_owned(),
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("direct", &self.is_direct())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names() {
        for attr in RESERVED_ATTRIBUTES {
            assert!(is_reserved(attr));
        }
        assert!(!is_reserved("__dict__"));
        assert!(!is_reserved("name"));
    }
}
