//! The per-resource materialization state machine.
//!
//! Every [`Record`] owns a [`Materializer`]. States only move forward:
//!
//! ```text
//! INIT ─create─▶ CREATED ─trigger(false)─▶ LAZY
//!                   │                        │
//!                   └──────trigger(true)─────┴─▶ EXECUTING ─ok─▶ LOADED
//!                                                    │
//!                 (any state) ─invalidate─▶ DEAD ◀─err┘
//! ```
//!
//! `DEAD` is terminal. `EXECUTING` is entered by at most one call per
//! record; re-entrant triggers while executing return immediately and the
//! caller observes the in-progress object.

use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use serde::Serialize;

use crate::collab::InitContext;
use crate::error::LaziError;
use crate::hooks::ResolverEvent;
use crate::hooks::schedule::{
    OnMaterializeFailed, OnMaterialized, OnPreMaterialize, OnStateChange,
};
use crate::object::Object;
use crate::record::Record;
use crate::resolver::{Frame, Resolver};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Materializer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum State {
    /// Specification exists; nothing created.
    Init,
    /// Backing object exists.
    Created,
    /// Deferred until first real access.
    Lazy,
    /// Initialization is running.
    Executing,
    /// Initialization succeeded.
    Loaded,
    /// Invalidated or failed. Terminal.
    Dead,
}

impl State {
    /// Returns the upper-case state name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            State::Init => "INIT",
            State::Created => "CREATED",
            State::Lazy => "LAZY",
            State::Executing => "EXECUTING",
            State::Loaded => "LOADED",
            State::Dead => "DEAD",
        }
    }

    /// Returns `true` for `CREATED` and `LAZY`: created but not yet run.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, State::Created | State::Lazy)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Materializer
// ─────────────────────────────────────────────────────────────────────────────

/// State and flags of one record's materialization.
///
/// The transitions themselves are [`Record::create`], [`Record::trigger`]
/// and [`Record::invalidate`].
#[derive(Debug)]
pub struct Materializer {
    state: Cell<State>,
    /// Busy flag for `create`.
    creating: Cell<bool>,
    /// Force latched by eager levels for the next trigger.
    forced: Cell<bool>,
    flattened: Cell<bool>,
    failed: Cell<bool>,
    invalidated: Cell<bool>,
    target: RefCell<Option<Object>>,
}

impl Materializer {
    pub(crate) fn new() -> Self {
        Self {
            state: Cell::new(State::Init),
            creating: Cell::new(false),
            forced: Cell::new(false),
            flattened: Cell::new(false),
            failed: Cell::new(false),
            invalidated: Cell::new(false),
            target: RefCell::new(None),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Returns `true` if the next trigger will execute regardless of level.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.forced.get()
    }

    /// Returns `true` once the proxy has been rerouted to the object.
    #[must_use]
    pub fn is_flattened(&self) -> bool {
        self.flattened.get()
    }

    /// Returns `true` if the initializer failed.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failed.get()
    }

    /// Returns `true` if the record was invalidated.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.get()
    }

    pub(crate) fn target(&self) -> Option<Object> {
        self.target.borrow().clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transitions
// ─────────────────────────────────────────────────────────────────────────────

impl Record {
    /// Moves to `to`, logging and announcing the transition. Never leaves
    /// `DEAD` and never moves backwards.
    fn advance(&self, to: State) -> bool {
        let materializer = self.materializer();
        let from = materializer.state.get();
        if from == State::Dead || (to <= from && to != State::Dead) {
            return false;
        }
        materializer.state.set(to);

        tracing::trace!(name = self.name(), %from, %to, "state transition");
        if let Some(resolver) = self.resolver() {
            resolver.emit::<OnStateChange>(&ResolverEvent::StateChanged {
                name: self.name().to_owned(),
                display_name: self.spec().display_name(),
                from,
                to,
            });
        }
        true
    }

    fn dead_error(&self) -> LaziError {
        let name = self.name().to_owned();
        if self.materializer().invalidated.get() || !self.materializer().failed.get() {
            LaziError::Invalidated { name, attr: None }
        } else {
            LaziError::Dead { name, attr: None }
        }
    }

    /// Creates the backing object. `INIT → CREATED`.
    ///
    /// Adopts the specification's target override if there is one, else the
    /// initializer's [`create`](crate::collab::Initializer::create), else an
    /// empty object. The record becomes a dependency of the record currently
    /// materializing, if any. Eager levels latch a forced load.
    ///
    /// Returns `Ok(None)` when called recursively while already creating.
    /// Outside `INIT` it returns the current object without side effects.
    ///
    /// # Errors
    ///
    /// [`LaziError::Invalidated`] or [`LaziError::Dead`] for dead records.
    pub fn create(&self) -> Result<Option<Object>, LaziError> {
        let materializer = self.materializer();
        match materializer.state.get() {
            State::Dead => return Err(self.dead_error()),
            State::Init => {}
            _ => return Ok(materializer.target()),
        }
        if materializer.creating.replace(true) {
            return Ok(None);
        }

        let resolver = self.resolver();
        let object = match self.spec().target() {
            Some(target) => target,
            None => resolver
                .as_ref()
                .filter(|_| self.spec().origin().is_some())
                .and_then(|resolver| resolver.initializer().create(self.spec()))
                .unwrap_or_default(),
        };
        *materializer.target.borrow_mut() = Some(object.clone());

        if let Some(parent) = resolver.as_ref().and_then(Resolver::nearest_materializing) {
            if !parent.ptr_eq(self) {
                parent.push_dependency(self);
            }
        }

        self.advance(State::Created);
        if self.spec().level().forces_load() {
            materializer.forced.set(true);
        }
        materializer.creating.set(false);
        Ok(Some(object))
    }

    /// Drives the record towards `LOADED`.
    ///
    /// - `DEAD`: error ([`LaziError::Dead`] after a failure, otherwise
    ///   [`LaziError::Invalidated`]).
    /// - `LOADED` or `EXECUTING`: returns `Ok` immediately.
    /// - `INIT`: [`create`](Self::create) first.
    /// - `CREATED`/`LAZY`: without force (explicit or latched) and at a
    ///   level that permits deferral, moves to `LAZY`. Otherwise runs the
    ///   initializer.
    ///
    /// # Errors
    ///
    /// [`LaziError::Unresolved`] for partial records,
    /// [`LaziError::NotFound`] when forced without an origin, and
    /// [`LaziError::MaterializationFailure`] when the initializer fails.
    pub fn trigger(&self, force: bool) -> Result<(), LaziError> {
        let materializer = self.materializer();
        if self.is_partial() {
            return Err(LaziError::Unresolved {
                name: self.name().to_owned(),
                attr: None,
            });
        }

        match materializer.state.get() {
            State::Dead => return Err(self.dead_error()),
            State::Loaded | State::Executing => return Ok(()),
            State::Init => {
                if self.create()?.is_none() {
                    return Ok(());
                }
            }
            State::Created | State::Lazy => {}
        }

        if self.spec().origin().is_none() {
            return if force {
                Err(LaziError::NotFound {
                    name: self.name().to_owned(),
                    attr: None,
                })
            } else {
                Ok(())
            };
        }

        if !(force || materializer.forced.get()) && self.spec().level().permits_deferral() {
            self.advance(State::Lazy);
            return Ok(());
        }

        self.execute()
    }

    /// Runs the initializer. `CREATED`/`LAZY → EXECUTING → LOADED | DEAD`.
    fn execute(&self) -> Result<(), LaziError> {
        let materializer = self.materializer();
        let from = materializer.state.get();
        let Some(resolver) = self.resolver() else {
            return Err(LaziError::Invalidated {
                name: self.name().to_owned(),
                attr: None,
            });
        };

        materializer.forced.set(false);
        self.advance(State::Executing);

        let original = materializer.target().unwrap_or_default();
        let outcome = {
            let _frame = resolver.enter(Frame::Materializing(self.clone()));
            resolver.emit::<OnPreMaterialize>(&ResolverEvent::PreMaterialize {
                name: self.name().to_owned(),
                from,
            });

            let initializer = resolver.initializer();
            let mut ctx = InitContext::new(&resolver, self.spec(), original.clone());
            catch_unwind(AssertUnwindSafe(|| initializer.initialize(&mut ctx)))
                .map(|result| result.map(|()| ctx.into_replacement()))
        };
        // A panicking initializer still leaves the record DEAD.
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                self.fail(&resolver, from, &panic_message(payload.as_ref()));
                resume_unwind(payload);
            }
        };

        match result {
            Ok(replacement) => {
                if materializer.state.get() == State::Dead {
                    return Err(self.dead_error());
                }
                if let Some(replacement) = replacement {
                    replacement.merge_missing(&original);
                    *materializer.target.borrow_mut() = Some(replacement);
                }
                self.advance(State::Loaded);
                self.set_used();
                tracing::debug!(name = self.name(), %from, "materialized");
                resolver.emit::<OnMaterialized>(&ResolverEvent::Materialized {
                    name: self.name().to_owned(),
                });

                if resolver.auto_dependency_load() {
                    self.load_dependencies();
                }
                if !self.spec().should_hook() || self.spec().level().flattens() {
                    self.flatten();
                }
                Ok(())
            }
            Err(source) => {
                self.fail(&resolver, from, &source.to_string());
                Err(LaziError::MaterializationFailure {
                    name: self.name().to_owned(),
                    state: from,
                    attr: None,
                    source,
                })
            }
        }
    }

    /// Marks the record failed and `DEAD` and announces the failure.
    fn fail(&self, resolver: &Resolver, from: State, error: &str) {
        self.materializer().failed.set(true);
        self.advance(State::Dead);
        tracing::error!(name = self.name(), %from, error, "materialization failed");
        resolver.emit::<OnMaterializeFailed>(&ResolverEvent::MaterializeFailed {
            name: self.name().to_owned(),
            error: error.to_owned(),
        });
    }

    /// Materializes an unhooked record immediately, without deferral.
    pub(crate) fn load_direct(&self) -> Result<(), LaziError> {
        if self.create()?.is_none() {
            return Ok(());
        }
        match self.state() {
            State::Created | State::Lazy => self.execute(),
            _ => Ok(()),
        }
    }

    /// Forces dependencies that are still pending and whose level was not
    /// set by an explicit per-name rule. Failures stay with the dependency.
    fn load_dependencies(&self) {
        for dependency in self.dependencies() {
            if !dependency.state().is_pending()
                || dependency.spec().level_source().is_override()
            {
                continue;
            }
            if let Err(err) = dependency.trigger(true) {
                tracing::warn!(
                    parent = self.name(),
                    dependency = dependency.name(),
                    error = %err,
                    "dependency failed to load with its parent"
                );
            }
        }
    }

    /// Reroutes the proxy straight to the loaded object. Happens once.
    fn flatten(&self) {
        let materializer = self.materializer();
        if materializer.flattened.replace(true) {
            return;
        }
        if let (Some(proxy), Some(object)) = (self.live_proxy(), materializer.target()) {
            proxy.set_direct(object);
        }
        tracing::trace!(name = self.name(), "flattened");
    }

    /// Moves to `DEAD` for good and releases the object and dependencies.
    ///
    /// The record is also dropped from its resolver's registry, so resolving
    /// the name again creates a fresh record.
    pub fn invalidate(&self) {
        let materializer = self.materializer();
        materializer.invalidated.set(true);
        materializer.forced.set(false);
        self.advance(State::Dead);
        materializer.target.borrow_mut().take();
        self.clear_dependencies();
        if let Some(resolver) = self.resolver() {
            resolver.forget(self);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("initializer panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("initializer panicked: {message}")
    } else {
        "initializer panicked".to_owned()
    }
}
