//! Logs resolver events through `tracing`.
//!
//! [`TraceObserver`] registers one observer on every resolver schedule.
//! State transitions are logged as `FROM -> TO display|name` lines at
//! `debug`; materialization failures at `warn`; lifecycle events at `info`.

use lazi_core::hooks::schedule::AllSchedules;
use lazi_core::hooks::{HookRegistrationError, ResolverEvent};
use lazi_core::resolver::Resolver;

/// Default hook name.
pub const DEFAULT_HOOK_NAME: &str = "lazi_trace";

/// Attaches event logging to a resolver.
#[derive(Debug, Clone)]
pub struct TraceObserver {
    name: String,
    transitions: bool,
}

impl Default for TraceObserver {
    fn default() -> Self {
        Self {
            name: DEFAULT_HOOK_NAME.to_owned(),
            transitions: true,
        }
    }
}

impl TraceObserver {
    /// Creates an observer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hook name, for attaching several observers.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables logging of state transitions.
    #[must_use]
    pub fn with_transitions(mut self, enabled: bool) -> Self {
        self.transitions = enabled;
        self
    }

    /// Registers the observer on all of `resolver`'s schedules.
    ///
    /// # Errors
    ///
    /// [`HookRegistrationError::DuplicateName`] if an observer with the same
    /// name is already attached.
    pub fn attach(&self, resolver: &Resolver) -> Result<(), HookRegistrationError> {
        let transitions = self.transitions;
        resolver
            .hooks()
            .register_observer::<AllSchedules, _>(self.name.clone(), move |event: &ResolverEvent| {
                log_event(event, transitions);
            })?;
        Ok(())
    }
}

/// Renders `event` as a single human-readable line.
#[must_use]
pub fn describe(event: &ResolverEvent) -> String {
    match event {
        ResolverEvent::Resolved {
            name,
            level,
            hooked,
            found,
        } => {
            let found = if *found { "found" } else { "not found" };
            let hooked = if *hooked { "hooked" } else { "direct" };
            format!("resolve {name} [{level}, {hooked}, {found}]")
        }
        ResolverEvent::StateChanged {
            display_name,
            from,
            to,
            ..
        } => format!("{from} -> {to} {display_name}"),
        ResolverEvent::PreMaterialize { name, from } => format!("materialize {name} from {from}"),
        ResolverEvent::Materialized { name } => format!("loaded {name}"),
        ResolverEvent::MaterializeFailed { name, error } => format!("failed {name}: {error}"),
        ResolverEvent::Invalidated {
            generation,
            records,
        } => format!("invalidated {records} records, generation {generation}"),
        ResolverEvent::Install => "+ resolver".to_owned(),
        ResolverEvent::Uninstall => "- resolver".to_owned(),
    }
}

fn log_event(event: &ResolverEvent, transitions: bool) {
    match event {
        ResolverEvent::StateChanged { .. } if !transitions => {}
        ResolverEvent::StateChanged { .. } | ResolverEvent::PreMaterialize { .. } => {
            tracing::debug!(target: "lazi::events", kind = event.kind(), "{}", describe(event));
        }
        ResolverEvent::MaterializeFailed { .. } => {
            tracing::warn!(target: "lazi::events", kind = event.kind(), "{}", describe(event));
        }
        ResolverEvent::Invalidated { .. } | ResolverEvent::Install | ResolverEvent::Uninstall => {
            tracing::info!(target: "lazi::events", kind = event.kind(), "{}", describe(event));
        }
        ResolverEvent::Resolved { .. } | ResolverEvent::Materialized { .. } => {
            tracing::trace!(target: "lazi::events", kind = event.kind(), "{}", describe(event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazi_core::hooks::schedule::{OnResolved, OnStateChange, ScheduleId};
    use lazi_core::level::Level;
    use lazi_core::materializer::State;
    use lazi_core::prelude::{BoxError, InitContext, Initializer, Locator, Object, Origin};
    use std::path::PathBuf;

    struct Nothing;

    impl Locator for Nothing {
        fn locate(&self, _: &str, _: Option<&[PathBuf]>, _: Option<&Object>) -> Option<Origin> {
            None
        }
    }

    impl Initializer for Nothing {
        fn initialize(&self, _: &mut InitContext<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn describes_transitions_with_display_names() {
        let event = ResolverEvent::StateChanged {
            name: "pkg.mod".into(),
            display_name: "pkg|mod".into(),
            from: State::Lazy,
            to: State::Executing,
        };
        assert_eq!(describe(&event), "LAZY -> EXECUTING pkg|mod");
    }

    #[test]
    fn describes_resolution() {
        let event = ResolverEvent::Resolved {
            name: "a".into(),
            level: Level::Swap,
            hooked: true,
            found: false,
        };
        assert_eq!(describe(&event), "resolve a [SWAP, hooked, not found]");
        assert_eq!(describe(&ResolverEvent::Install), "+ resolver");
    }

    #[test]
    fn attaches_to_every_schedule_once() {
        let resolver = Resolver::new(Nothing, Nothing);
        TraceObserver::new().attach(&resolver).unwrap();

        assert_eq!(resolver.hooks().hook_count(ScheduleId::of::<OnResolved>()), 1);
        assert_eq!(resolver.hooks().hook_count(ScheduleId::of::<OnStateChange>()), 1);

        let err = TraceObserver::new().attach(&resolver).unwrap_err();
        assert!(matches!(err, HookRegistrationError::DuplicateName { .. }));

        TraceObserver::new()
            .with_name("second")
            .with_transitions(false)
            .attach(&resolver)
            .unwrap();
        assert_eq!(resolver.hooks().hook_count(ScheduleId::of::<OnResolved>()), 2);
    }

    #[test]
    fn logging_does_not_disturb_resolution() {
        let resolver = Resolver::new(Nothing, Nothing);
        TraceObserver::new().attach(&resolver).unwrap();
        let _installed = resolver.scoped();

        let record = resolver.resolve("ghost").unwrap();
        assert!(record.spec().origin().is_none());
    }
}
