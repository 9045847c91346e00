//! Schedule identifiers and resolver lifecycle markers.
//!
//! A schedule is identified by a marker type wrapped in a [`ScheduleId`].
//! Observers register against one marker or a tuple of markers; the resolver
//! invokes every observer registered for a schedule when the matching
//! [`ResolverEvent`](super::events::ResolverEvent) occurs.

use core::any::TypeId;
use variadics_please::all_tuples;

/// Identifier for a schedule, derived from a marker type.
///
/// # Example
///
/// ```
/// use lazi_core::hooks::schedule::{OnResolved, ScheduleId};
///
/// let schedule = ScheduleId::of::<OnResolved>();
/// assert!(schedule.type_name().ends_with("OnResolved"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ScheduleId {
    /// Creates a `ScheduleId` for the given marker type.
    #[must_use]
    pub fn of<S: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: core::any::type_name::<S>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schedule Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Marker trait for schedule types.
pub trait Schedule: 'static {}

/// Types that can be converted into a list of schedule IDs.
///
/// Implemented for single schedules and tuples of schedules.
pub trait IntoScheduleIds {
    /// Returns the schedule IDs for this type.
    fn schedule_ids() -> Vec<ScheduleId>;
}

impl<S: Schedule> IntoScheduleIds for S {
    fn schedule_ids() -> Vec<ScheduleId> {
        vec![ScheduleId::of::<S>()]
    }
}

macro_rules! impl_into_schedule_ids_for_tuple {
    ($($S:ident),*) => {
        impl<$($S: Schedule),*> IntoScheduleIds for ($($S,)*) {
            fn schedule_ids() -> Vec<ScheduleId> {
                vec![$(ScheduleId::of::<$S>()),*]
            }
        }
    };
}

all_tuples!(impl_into_schedule_ids_for_tuple, 2, 16, S);

// ─────────────────────────────────────────────────────────────────────────────
// Resolution Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Fired after a name has been located and its record created.
///
/// Event data: [`ResolverEvent::Resolved`](super::events::ResolverEvent::Resolved)
pub struct OnResolved;
impl Schedule for OnResolved {}

/// Fired whenever a record changes materializer state.
///
/// Event data: [`ResolverEvent::StateChanged`](super::events::ResolverEvent::StateChanged)
pub struct OnStateChange;
impl Schedule for OnStateChange {}

// ─────────────────────────────────────────────────────────────────────────────
// Materialization Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Fired right before the initializer runs.
///
/// Event data: [`ResolverEvent::PreMaterialize`](super::events::ResolverEvent::PreMaterialize)
pub struct OnPreMaterialize;
impl Schedule for OnPreMaterialize {}

/// Fired after a record reaches `LOADED`.
///
/// Event data: [`ResolverEvent::Materialized`](super::events::ResolverEvent::Materialized)
pub struct OnMaterialized;
impl Schedule for OnMaterialized {}

/// Fired after the initializer failed and the record went `DEAD`.
///
/// Event data: [`ResolverEvent::MaterializeFailed`](super::events::ResolverEvent::MaterializeFailed)
pub struct OnMaterializeFailed;
impl Schedule for OnMaterializeFailed {}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Schedules
// ─────────────────────────────────────────────────────────────────────────────

/// Fired after the registry has been invalidated.
///
/// Event data: [`ResolverEvent::Invalidated`](super::events::ResolverEvent::Invalidated)
pub struct OnInvalidated;
impl Schedule for OnInvalidated {}

/// Fired when the resolver hook is installed (count 0 → 1).
///
/// Event data: [`ResolverEvent::Install`](super::events::ResolverEvent::Install)
pub struct OnInstall;
impl Schedule for OnInstall {}

/// Fired when the resolver hook is removed (count 1 → 0).
///
/// Event data: [`ResolverEvent::Uninstall`](super::events::ResolverEvent::Uninstall)
pub struct OnUninstall;
impl Schedule for OnUninstall {}

/// Every resolver schedule, for observers that want all events.
pub type AllSchedules = (
    OnResolved,
    OnStateChange,
    OnPreMaterialize,
    OnMaterialized,
    OnMaterializeFailed,
    OnInvalidated,
    OnInstall,
    OnUninstall,
);
