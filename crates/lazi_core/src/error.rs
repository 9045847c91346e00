//! Error types for resolution and materialization.

use crate::collab::BoxError;
use crate::materializer::State;

/// Renders the optional triggering attribute as a message suffix.
fn attr_suffix(attr: &Option<String>) -> String {
    attr.as_deref()
        .map(|attr| format!(" (accessing `{attr}`)"))
        .unwrap_or_default()
}

/// Errors surfaced by the resolver, the materializer and proxies.
///
/// Resolution never fails because a name was not found; the failure is
/// reported when the resource is first really accessed. Variants that stem
/// from an access carry the attribute that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum LaziError {
    /// The locator found no definition for the name.
    #[error("no resource named `{name}`{}", attr_suffix(.attr))]
    NotFound {
        /// The resource name.
        name: String,
        /// The attribute whose access triggered the lookup.
        attr: Option<String>,
    },

    /// The initializer returned an error. The record is now dead.
    #[error("failed to materialize `{name}` from state {state}{}: {source}", attr_suffix(.attr))]
    MaterializationFailure {
        /// The resource name.
        name: String,
        /// The state the trigger started from.
        state: State,
        /// The attribute whose access triggered materialization.
        attr: Option<String>,
        /// The initializer's error.
        #[source]
        source: BoxError,
    },

    /// The resource failed to materialize earlier and will not be retried.
    #[error("resource `{name}` failed to materialize earlier{}", attr_suffix(.attr))]
    Dead {
        /// The resource name.
        name: String,
        /// The attribute being accessed.
        attr: Option<String>,
    },

    /// The resource was invalidated; resolve it again for a fresh handle.
    #[error("resource `{name}` was invalidated{}", attr_suffix(.attr))]
    Invalidated {
        /// The resource name.
        name: String,
        /// The attribute being accessed.
        attr: Option<String>,
    },

    /// The handle came from a cyclic resolution and was never located.
    #[error("resource `{name}` is still being resolved{}", attr_suffix(.attr))]
    Unresolved {
        /// The resource name.
        name: String,
        /// The attribute being accessed.
        attr: Option<String>,
    },

    /// The materialized object has no such attribute.
    #[error("resource `{name}` has no attribute `{attr}`")]
    NoAttribute {
        /// The resource name.
        name: String,
        /// The missing attribute.
        attr: String,
    },

    /// Reserved metadata attributes cannot be written or deleted.
    #[error("attribute `{attr}` of `{name}` is read-only")]
    ReadOnly {
        /// The resource name.
        name: String,
        /// The reserved attribute.
        attr: String,
    },

    /// A level table pattern is not a valid regular expression.
    #[error("invalid level pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LaziError {
    /// Attaches the triggering attribute to access errors that have none yet.
    #[must_use]
    pub fn with_attr(mut self, attribute: &str) -> Self {
        match &mut self {
            LaziError::NotFound { attr, .. }
            | LaziError::MaterializationFailure { attr, .. }
            | LaziError::Dead { attr, .. }
            | LaziError::Invalidated { attr, .. }
            | LaziError::Unresolved { attr, .. } => {
                if attr.is_none() {
                    *attr = Some(attribute.to_owned());
                }
            }
            _ => {}
        }
        self
    }

    /// Returns the resource name the error concerns, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            LaziError::NotFound { name, .. }
            | LaziError::MaterializationFailure { name, .. }
            | LaziError::Dead { name, .. }
            | LaziError::Invalidated { name, .. }
            | LaziError::Unresolved { name, .. }
            | LaziError::NoAttribute { name, .. }
            | LaziError::ReadOnly { name, .. } => Some(name),
            LaziError::InvalidPattern { .. } | LaziError::Config(_) => None,
        }
    }

    /// Returns the attribute the error concerns, if any.
    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        match self {
            LaziError::NotFound { attr, .. }
            | LaziError::MaterializationFailure { attr, .. }
            | LaziError::Dead { attr, .. }
            | LaziError::Invalidated { attr, .. }
            | LaziError::Unresolved { attr, .. } => attr.as_deref(),
            LaziError::NoAttribute { attr, .. } | LaziError::ReadOnly { attr, .. } => Some(attr),
            LaziError::InvalidPattern { .. } | LaziError::Config(_) => None,
        }
    }
}

impl From<serde_json::Error> for LaziError {
    fn from(err: serde_json::Error) -> Self {
        LaziError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_is_attached_once() {
        let err = LaziError::NotFound {
            name: "pkg.missing".into(),
            attr: None,
        }
        .with_attr("first")
        .with_attr("second");

        assert_eq!(err.attr(), Some("first"));
        assert_eq!(
            err.to_string(),
            "no resource named `pkg.missing` (accessing `first`)"
        );
    }

    #[test]
    fn failure_message_includes_state_and_source() {
        let err = LaziError::MaterializationFailure {
            name: "m".into(),
            state: State::Lazy,
            attr: Some("x".into()),
            source: "boom".into(),
        };

        assert_eq!(
            err.to_string(),
            "failed to materialize `m` from state LAZY (accessing `x`): boom"
        );
        assert!(core::error::Error::source(&err).is_some());
    }

    #[test]
    fn name_and_attr_accessors() {
        let err = LaziError::ReadOnly {
            name: "m".into(),
            attr: "__name__".into(),
        };
        assert_eq!(err.name(), Some("m"));
        assert_eq!(err.attr(), Some("__name__"));
        assert_eq!(LaziError::Config("bad".into()).name(), None);
    }
}
