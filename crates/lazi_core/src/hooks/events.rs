//! Unified event enum for resolver hooks.
//!
//! All observers receive `&ResolverEvent` and match on the variants they
//! care about.

use crate::level::Level;
use crate::materializer::State;

/// Event delivered to resolver observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Resolution Events
    // ─────────────────────────────────────────────────────────────────────────
    /// A name was located and its record created.
    Resolved {
        /// The resource name.
        name: String,
        /// The assigned level.
        level: Level,
        /// Whether access goes through a deferring proxy.
        hooked: bool,
        /// Whether the locator found a definition.
        found: bool,
    },

    /// A record moved from one state to another.
    StateChanged {
        /// The resource name.
        name: String,
        /// The `parent|leaf` display name.
        display_name: String,
        /// The previous state.
        from: State,
        /// The new state.
        to: State,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Materialization Events
    // ─────────────────────────────────────────────────────────────────────────
    /// The initializer is about to run.
    PreMaterialize {
        /// The resource name.
        name: String,
        /// The state the trigger started from.
        from: State,
    },

    /// The record reached `LOADED`.
    Materialized {
        /// The resource name.
        name: String,
    },

    /// The initializer failed; the record is `DEAD`.
    MaterializeFailed {
        /// The resource name.
        name: String,
        /// Rendered initializer error.
        error: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Events
    // ─────────────────────────────────────────────────────────────────────────
    /// The registry was invalidated.
    Invalidated {
        /// The generation that was just started.
        generation: u64,
        /// Number of records dropped from the registry.
        records: usize,
    },

    /// The resolver hook was installed.
    Install,

    /// The resolver hook was removed.
    Uninstall,
}

impl ResolverEvent {
    /// Returns the resource name for per-resource events.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            ResolverEvent::Resolved { name, .. }
            | ResolverEvent::StateChanged { name, .. }
            | ResolverEvent::PreMaterialize { name, .. }
            | ResolverEvent::Materialized { name }
            | ResolverEvent::MaterializeFailed { name, .. } => Some(name),
            ResolverEvent::Invalidated { .. }
            | ResolverEvent::Install
            | ResolverEvent::Uninstall => None,
        }
    }

    /// Returns a short, stable label for the event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ResolverEvent::Resolved { .. } => "resolved",
            ResolverEvent::StateChanged { .. } => "state_changed",
            ResolverEvent::PreMaterialize { .. } => "pre_materialize",
            ResolverEvent::Materialized { .. } => "materialized",
            ResolverEvent::MaterializeFailed { .. } => "materialize_failed",
            ResolverEvent::Invalidated { .. } => "invalidated",
            ResolverEvent::Install => "install",
            ResolverEvent::Uninstall => "uninstall",
        }
    }
}
