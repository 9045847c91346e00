//! Observer registry for resolver events.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use lazi_core::hooks::{HooksAPI, ResolverEvent};
//! use lazi_core::hooks::schedule::{OnInstall, OnUninstall, ScheduleId};
//!
//! let hooks = HooksAPI::new();
//! let seen = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&seen);
//!
//! hooks
//!     .register_observer::<(OnInstall, OnUninstall), _>("counter", move |_: &ResolverEvent| {
//!         counter.set(counter.get() + 1);
//!     })
//!     .unwrap();
//!
//! hooks.invoke(ScheduleId::of::<OnInstall>(), &ResolverEvent::Install);
//! assert_eq!(seen.get(), 1);
//! ```

use core::cell::RefCell;
use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use hashbrown::HashMap;

use super::events::ResolverEvent;
use super::schedule::{IntoScheduleIds, ScheduleId};

// ─────────────────────────────────────────────────────────────────────────────
// HookRegistrationError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during hook registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRegistrationError {
    /// A hook with this name already exists on the schedule.
    DuplicateName {
        /// The schedule where the duplicate was found.
        schedule: ScheduleId,
        /// The duplicate hook name.
        name: String,
    },
}

impl fmt::Display for HookRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookRegistrationError::DuplicateName { schedule, name } => {
                write!(
                    f,
                    "hook '{}' already registered for schedule '{}'",
                    name,
                    schedule.type_name()
                )
            }
        }
    }
}

impl core::error::Error for HookRegistrationError {}

// ─────────────────────────────────────────────────────────────────────────────
// HookEntry
// ─────────────────────────────────────────────────────────────────────────────

type Observer = Rc<dyn Fn(&ResolverEvent)>;

/// Entry in the hook registry.
struct HookEntry {
    /// Human-readable name for debugging and logging.
    name: String,
    observer: Observer,
}

// ─────────────────────────────────────────────────────────────────────────────
// HooksAPI
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of resolver observers, organized by schedule.
///
/// Observers run in registration order. A panicking observer is caught and
/// logged; the remaining observers still run and the resolver carries on.
/// Observers may register further observers while being invoked; those take
/// effect from the next event.
#[derive(Default)]
pub struct HooksAPI {
    hooks: RefCell<HashMap<ScheduleId, Vec<HookEntry>>>,
}

impl HooksAPI {
    /// Creates a new empty hooks registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for one or more schedules.
    ///
    /// With several schedules the observer is stored once per schedule under
    /// `name@<schedule type name>`.
    ///
    /// # Errors
    ///
    /// [`HookRegistrationError::DuplicateName`] if a hook with the same name
    /// already exists on one of the schedules. Schedules processed before
    /// the duplicate keep their registration.
    pub fn register_observer<S, F>(
        &self,
        name: impl Into<String>,
        observer: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        S: IntoScheduleIds,
        F: Fn(&ResolverEvent) + 'static,
    {
        let schedules = S::schedule_ids();
        let name = name.into();
        let observer: Observer = Rc::new(observer);

        for schedule in &schedules {
            let hook_name = if schedules.len() > 1 {
                format!("{}@{}", name, schedule.type_name())
            } else {
                name.clone()
            };
            self.register_boxed(*schedule, hook_name, Rc::clone(&observer))?;
        }
        Ok(self)
    }

    fn register_boxed(
        &self,
        schedule: ScheduleId,
        name: String,
        observer: Observer,
    ) -> Result<(), HookRegistrationError> {
        let mut hooks = self.hooks.borrow_mut();
        let entries = hooks.entry(schedule).or_default();

        if entries.iter().any(|entry| entry.name == name) {
            return Err(HookRegistrationError::DuplicateName { schedule, name });
        }

        entries.push(HookEntry { name, observer });
        Ok(())
    }

    /// Removes the hook named `name` from `schedule`. Returns `true` if it
    /// existed.
    pub fn remove_hook(&self, schedule: ScheduleId, name: &str) -> bool {
        let mut hooks = self.hooks.borrow_mut();
        let Some(entries) = hooks.get_mut(&schedule) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        entries.len() != before
    }

    /// Invokes all observers registered for the schedule.
    pub fn invoke(&self, schedule: ScheduleId, event: &ResolverEvent) {
        let observers: Vec<(String, Observer)> = match self.hooks.borrow().get(&schedule) {
            Some(entries) => entries
                .iter()
                .map(|entry| (entry.name.clone(), Rc::clone(&entry.observer)))
                .collect(),
            None => return,
        };

        for (name, observer) in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                tracing::warn!(
                    hook = %name,
                    schedule = schedule.type_name(),
                    event = event.kind(),
                    "observer panicked; continuing"
                );
            }
        }
    }

    /// Returns the number of hooks registered for the schedule.
    #[must_use]
    pub fn hook_count(&self, schedule: ScheduleId) -> usize {
        self.hooks.borrow().get(&schedule).map_or(0, Vec::len)
    }

    /// Checks if a hook with the given name exists on the schedule.
    #[must_use]
    pub fn contains_hook(&self, schedule: ScheduleId, name: &str) -> bool {
        self.hooks
            .borrow()
            .get(&schedule)
            .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
    }
}

impl fmt::Debug for HooksAPI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.borrow();
        f.debug_map()
            .entries(hooks.iter().map(|(schedule, entries)| {
                (
                    schedule.type_name(),
                    entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>(),
                )
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::schedule::{OnInstall, OnMaterialized, OnUninstall};
    use core::cell::Cell;

    #[test]
    fn register_increments_count() {
        let api = HooksAPI::new();
        let schedule = ScheduleId::of::<OnInstall>();

        api.register_observer::<OnInstall, _>("first", |_: &ResolverEvent| {})
            .expect("registration should succeed");
        api.register_observer::<OnInstall, _>("second", |_: &ResolverEvent| {})
            .expect("registration should succeed");

        assert_eq!(api.hook_count(schedule), 2);
        assert!(api.contains_hook(schedule, "first"));
        assert!(!api.contains_hook(ScheduleId::of::<OnUninstall>(), "first"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let api = HooksAPI::new();
        api.register_observer::<OnInstall, _>("dup", |_: &ResolverEvent| {})
            .unwrap();

        let err = api
            .register_observer::<OnInstall, _>("dup", |_: &ResolverEvent| {})
            .err()
            .expect("duplicate must fail");

        assert_eq!(
            err,
            HookRegistrationError::DuplicateName {
                schedule: ScheduleId::of::<OnInstall>(),
                name: "dup".into(),
            }
        );
        assert!(err.to_string().contains("'dup' already registered"));
    }

    #[test]
    fn multi_schedule_names_are_suffixed() {
        let api = HooksAPI::new();
        api.register_observer::<(OnInstall, OnUninstall), _>("both", |_: &ResolverEvent| {})
            .unwrap();

        let install = ScheduleId::of::<OnInstall>();
        assert!(api.contains_hook(install, &format!("both@{}", install.type_name())));
        assert_eq!(api.hook_count(ScheduleId::of::<OnUninstall>()), 1);
    }

    #[test]
    fn observers_run_in_registration_order() {
        let api = HooksAPI::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            api.register_observer::<OnInstall, _>(label, move |_: &ResolverEvent| {
                order.borrow_mut().push(label);
            })
            .unwrap();
        }

        api.invoke(ScheduleId::of::<OnInstall>(), &ResolverEvent::Install);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn panicking_observer_is_isolated() {
        let api = HooksAPI::new();
        let after = Rc::new(Cell::new(false));
        let flag = Rc::clone(&after);

        api.register_observer::<OnMaterialized, _>("boom", |_: &ResolverEvent| {
            panic!("observer failure");
        })
        .unwrap();
        api.register_observer::<OnMaterialized, _>("after", move |_: &ResolverEvent| {
            flag.set(true);
        })
        .unwrap();

        api.invoke(
            ScheduleId::of::<OnMaterialized>(),
            &ResolverEvent::Materialized { name: "m".into() },
        );
        assert!(after.get());
    }

    #[test]
    fn observers_may_register_while_invoked() {
        let api = Rc::new(HooksAPI::new());
        let inner = Rc::clone(&api);

        api.register_observer::<OnInstall, _>("outer", move |_: &ResolverEvent| {
            let _ = inner.register_observer::<OnInstall, _>("late", |_: &ResolverEvent| {});
        })
        .unwrap();

        api.invoke(ScheduleId::of::<OnInstall>(), &ResolverEvent::Install);
        assert!(api.contains_hook(ScheduleId::of::<OnInstall>(), "late"));
    }

    #[test]
    fn remove_hook() {
        let api = HooksAPI::new();
        let schedule = ScheduleId::of::<OnInstall>();
        api.register_observer::<OnInstall, _>("gone", |_: &ResolverEvent| {})
            .unwrap();

        assert!(api.remove_hook(schedule, "gone"));
        assert!(!api.remove_hook(schedule, "gone"));
        assert_eq!(api.hook_count(schedule), 0);
    }
}
