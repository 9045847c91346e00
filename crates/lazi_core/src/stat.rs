//! Registry statistics.

use core::fmt;

use serde::Serialize;

use crate::materializer::State;
use crate::resolver::Resolver;

/// Snapshot of the resolver's registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stat {
    /// Registered records.
    pub total: usize,
    /// Registered records that go through a deferring proxy.
    pub hooked: usize,
    /// Records in `INIT`.
    pub init: usize,
    /// Records in `CREATED`.
    pub created: usize,
    /// Records in `LAZY`.
    pub lazy: usize,
    /// Records in `EXECUTING`.
    pub executing: usize,
    /// Records in `LOADED`.
    pub loaded: usize,
    /// Records in `DEAD`.
    pub dead: usize,
    /// Records materialized for use.
    pub used: usize,
    /// Records kept for identity only, outside the registry.
    pub passthrough: usize,
}

impl Stat {
    fn count(&mut self, state: State) {
        let slot = match state {
            State::Init => &mut self.init,
            State::Created => &mut self.created,
            State::Lazy => &mut self.lazy,
            State::Executing => &mut self.executing,
            State::Loaded => &mut self.loaded,
            State::Dead => &mut self.dead,
        };
        *slot += 1;
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records {} (hooked {}, used {}, passthrough {}) init {} created {} lazy {} executing {} loaded {} dead {}",
            self.total,
            self.hooked,
            self.used,
            self.passthrough,
            self.init,
            self.created,
            self.lazy,
            self.executing,
            self.loaded,
            self.dead,
        )
    }
}

impl Resolver {
    /// Counts registered records by state.
    #[must_use]
    pub fn stat(&self) -> Stat {
        let mut stat = Stat {
            passthrough: self.passthrough_count(),
            ..Stat::default()
        };
        for record in self.records() {
            stat.total += 1;
            stat.hooked += usize::from(record.is_hooked());
            stat.used += usize::from(record.is_used());
            stat.count(record.state());
        }
        stat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_by_state() {
        let mut stat = Stat::default();
        stat.count(State::Lazy);
        stat.count(State::Lazy);
        stat.count(State::Dead);
        assert_eq!(stat.lazy, 2);
        assert_eq!(stat.dead, 1);
        assert_eq!(stat.loaded, 0);
    }

    #[test]
    fn serializes_as_flat_object() {
        let stat = Stat {
            total: 3,
            loaded: 1,
            ..Stat::default()
        };
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["loaded"], 1);
    }
}
