//! Backing objects and attribute values.
//!
//! A resource materializes into an [`Object`]: a shared, interior-mutable
//! namespace mapping attribute names to [`Value`]s. Objects are what the
//! [`Initializer`](crate::collab::Initializer) fills in and what a
//! [`Proxy`](crate::proxy::Proxy) forwards to once the resource is loaded.
//!
//! # Example
//!
//! ```
//! use lazi_core::object::{Object, Value};
//!
//! let object = Object::new();
//! object.set("answer", 42);
//! object.set("greeting", "hello");
//!
//! assert_eq!(object.get("answer"), Some(Value::Int(42)));
//! assert!(object.contains("greeting"));
//! assert_eq!(object.delete("answer"), Some(Value::Int(42)));
//! assert_eq!(object.len(), 1);
//! ```

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use downcast_rs::{Downcast, impl_downcast};
use indexmap::IndexMap;

use crate::proxy::Proxy;

// ─────────────────────────────────────────────────────────────────────────────
// Native
// ─────────────────────────────────────────────────────────────────────────────

/// An arbitrary host value stored inside an [`Object`].
///
/// Any `Debug + 'static` type can be stored as a native value and recovered
/// later with [`downcast_ref`](Native::downcast_ref).
///
/// ```
/// use std::rc::Rc;
/// use lazi_core::object::{Native, Value};
///
/// #[derive(Debug)]
/// struct Handler(u8);
///
/// let value = Value::Native(Rc::new(Handler(7)));
/// let Value::Native(native) = value else { unreachable!() };
/// assert_eq!(native.downcast_ref::<Handler>().map(|h| h.0), Some(7));
/// ```
pub trait Native: Downcast + fmt::Debug {}

impl_downcast!(Native);

impl<T: fmt::Debug + 'static> Native for T {}

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A dynamically typed attribute value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// Another resource, held through its proxy.
    ///
    /// Storing a proxy never triggers its materialization.
    Resource(Proxy),
    /// An opaque host value.
    Native(Rc<dyn Native>),
}

impl Value {
    /// Returns the string slice if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the proxy if this is a [`Value::Resource`].
    #[must_use]
    pub fn as_resource(&self) -> Option<&Proxy> {
        match self {
            Value::Resource(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Resource(a), Value::Resource(b)) => a.ptr_eq(b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Proxy> for Value {
    fn from(value: Proxy) -> Self {
        Value::Resource(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Object
// ─────────────────────────────────────────────────────────────────────────────

/// A shared attribute namespace.
///
/// Cloning an `Object` clones the handle, not the contents; identity is
/// pointer identity (see [`ptr_eq`](Self::ptr_eq)). Attribute order is
/// insertion order.
///
/// Borrows of the inner map never outlive a single method call, so an
/// object may be read or written from inside code that is itself reading
/// or writing it through another handle.
#[derive(Clone, Default)]
pub struct Object {
    attrs: Rc<RefCell<IndexMap<String, Value>>>,
}

impl Object {
    /// Creates an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the attribute value, if present.
    #[must_use]
    pub fn get(&self, attr: &str) -> Option<Value> {
        self.attrs.borrow().get(attr).cloned()
    }

    /// Sets an attribute, returning the previous value.
    pub fn set(&self, attr: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attrs.borrow_mut().insert(attr.into(), value.into())
    }

    /// Removes an attribute, returning its value.
    pub fn delete(&self, attr: &str) -> Option<Value> {
        self.attrs.borrow_mut().shift_remove(attr)
    }

    /// Returns `true` if the attribute exists.
    #[must_use]
    pub fn contains(&self, attr: &str) -> bool {
        self.attrs.borrow().contains_key(attr)
    }

    /// Returns the attribute names in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.attrs.borrow().keys().cloned().collect()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.borrow().len()
    }

    /// Returns `true` if the object has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.borrow().is_empty()
    }

    /// Copies every attribute of `other` that this object does not have yet.
    pub fn merge_missing(&self, other: &Object) {
        if self.ptr_eq(other) {
            return;
        }
        let incoming: Vec<(String, Value)> = other
            .attrs
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut attrs = self.attrs.borrow_mut();
        for (key, value) in incoming {
            attrs.entry(key).or_insert(value);
        }
    }

    /// Returns `true` if both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.attrs, &other.attrs)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attrs.try_borrow() {
            Ok(attrs) => f.debug_map().entries(attrs.iter()).finish(),
            Err(_) => f.write_str("Object { <borrowed> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(&'static str);

    #[test]
    fn set_replaces_and_returns_previous() {
        let object = Object::new();
        assert_eq!(object.set("x", 1), None);
        assert_eq!(object.set("x", 2), Some(Value::Int(1)));
        assert_eq!(object.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn keys_keep_insertion_order() {
        let object = Object::new();
        object.set("b", 1);
        object.set("a", 2);
        object.set("c", 3);
        object.delete("a");
        assert_eq!(object.keys(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn clones_share_contents() {
        let object = Object::new();
        let alias = object.clone();
        alias.set("shared", true);

        assert!(object.ptr_eq(&alias));
        assert_eq!(object.get("shared"), Some(Value::Bool(true)));
        assert!(!object.ptr_eq(&Object::new()));
    }

    #[test]
    fn merge_missing_keeps_existing_values() {
        let target = Object::new();
        target.set("kept", "target");
        let source = Object::new();
        source.set("kept", "source");
        source.set("added", 1);

        target.merge_missing(&source);

        assert_eq!(target.get("kept"), Some(Value::from("target")));
        assert_eq!(target.get("added"), Some(Value::Int(1)));
    }

    #[test]
    fn native_values_downcast() {
        let native: Rc<dyn Native> = Rc::new(Marker("m"));
        assert!(native.is::<Marker>());
        assert_eq!(native.downcast_ref::<Marker>(), Some(&Marker("m")));
        assert!(native.downcast_ref::<String>().is_none());
    }

    #[test]
    fn native_equality_is_identity() {
        let native: Rc<dyn Native> = Rc::new(Marker("m"));
        let a = Value::Native(Rc::clone(&native));
        let b = Value::Native(native);
        let c = Value::Native(Rc::new(Marker("m")));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert_eq!(Value::from(3).as_int(), Some(3));
        assert!(Value::Null.is_null());
        assert!(Value::from(1.5).as_str().is_none());
    }
}
