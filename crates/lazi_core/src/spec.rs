//! Resource specifications and origins.
//!
//! A [`Specification`] is everything the resolver knows about a name before
//! anything is materialized: where the definition lives ([`Origin`]), which
//! [`Level`] applies, and whether the resource is hooked at all.

use core::cell::RefCell;
use core::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::level::{Level, LevelSource, LevelTable};
use crate::object::Object;

// ─────────────────────────────────────────────────────────────────────────────
// Origin
// ─────────────────────────────────────────────────────────────────────────────

/// What kind of definition a locator found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OriginKind {
    /// A definition with a location, such as a file.
    #[default]
    Source,
    /// A definition built into the host; it has no location.
    BuiltIn,
    /// A container with search locations but no definition of its own.
    Namespace,
}

/// Where a resource definition was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Path or opaque locator string.
    pub location: String,
    /// Kind of definition.
    pub kind: OriginKind,
    /// Locations searched for nested resources. Present for packages.
    pub search_locations: Option<Vec<PathBuf>>,
    /// Cached, pre-processed form of the definition.
    pub cached: Option<PathBuf>,
}

impl Origin {
    /// Creates a [`OriginKind::Source`] origin at `location`.
    #[must_use]
    pub fn source(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind: OriginKind::Source,
            search_locations: None,
            cached: None,
        }
    }

    /// Creates a [`OriginKind::BuiltIn`] origin.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            location: "built-in".to_owned(),
            kind: OriginKind::BuiltIn,
            search_locations: None,
            cached: None,
        }
    }

    /// Creates a [`OriginKind::Namespace`] origin spanning `locations`.
    #[must_use]
    pub fn namespace(locations: Vec<PathBuf>) -> Self {
        Self {
            location: "namespace".to_owned(),
            kind: OriginKind::Namespace,
            search_locations: Some(locations),
            cached: None,
        }
    }

    /// Marks the origin as a package searched at `locations`.
    #[must_use]
    pub fn with_search_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.search_locations = Some(locations);
        self
    }

    /// Sets the cached definition path.
    #[must_use]
    pub fn with_cached(mut self, cached: impl Into<PathBuf>) -> Self {
        self.cached = Some(cached.into());
        self
    }

    /// Returns `true` if the origin names a real location.
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.kind == OriginKind::Source
    }

    /// Returns `true` if nested resources can be found under this origin.
    #[must_use]
    pub fn is_package(&self) -> bool {
        self.search_locations.is_some()
    }

    /// Returns `true` if the location lies under any of `roots`.
    #[must_use]
    pub fn is_under(&self, roots: &[PathBuf]) -> bool {
        self.has_location() && roots.iter().any(|root| Path::new(&self.location).starts_with(root))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Specification
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable description of one resource name within a resolver generation.
///
/// Only the search-path and target overrides may change after creation, when
/// the name is resolved again with new overrides.
pub struct Specification {
    name: String,
    parent: Option<String>,
    origin: Option<Origin>,
    is_system: bool,
    is_builtin: bool,
    level: Level,
    level_source: LevelSource,
    should_hook: bool,
    search_path: RefCell<Option<Vec<PathBuf>>>,
    target: RefCell<Option<Object>>,
}

impl Specification {
    /// Builds a specification, computing the derived flags eagerly.
    ///
    /// `should_hook` is true when hooking is enabled, the name was found (or
    /// empty records are kept), the level is not [`Level::Unhook`], and
    /// either the level is above [`Level::None`] or the resource is neither
    /// an excluded system resource nor an excluded built-in.
    #[must_use]
    pub fn new(name: &str, origin: Option<Origin>, config: &Config, levels: &LevelTable) -> Self {
        let (level, level_source) = levels.lookup(name);
        let is_system = origin
            .as_ref()
            .is_some_and(|origin| origin.is_under(&config.system_roots));
        let is_builtin = origin
            .as_ref()
            .is_some_and(|origin| origin.kind == OriginKind::BuiltIn);

        let should_hook = config.hook_enabled
            && (origin.is_some() || config.keep_empty_records)
            && level != Level::Unhook
            && (level > Level::None
                || (!(is_system && config.exclude_system)
                    && !(is_builtin && config.exclude_builtin)));

        Self {
            name: name.to_owned(),
            parent: parent_of(name).map(str::to_owned),
            origin,
            is_system,
            is_builtin,
            level,
            level_source,
            should_hook,
            search_path: RefCell::new(None),
            target: RefCell::new(None),
        }
    }

    /// Builds the unlocated stand-in handed out for a name that is still
    /// being resolved further up the stack.
    #[must_use]
    pub fn partial(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parent: parent_of(name).map(str::to_owned),
            origin: None,
            is_system: false,
            is_builtin: false,
            level: Level::Lazy,
            level_source: LevelSource::Default,
            should_hook: false,
            search_path: RefCell::new(None),
            target: RefCell::new(None),
        }
    }

    /// Returns the full dotted name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the text before the last `.`, or `None` for top-level names.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Returns the containing package: the name itself for packages,
    /// otherwise the parent (empty for top-level names).
    #[must_use]
    pub fn package(&self) -> &str {
        if self.origin.as_ref().is_some_and(Origin::is_package) {
            &self.name
        } else {
            self.parent.as_deref().unwrap_or("")
        }
    }

    /// Returns the last name component.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Returns `parent|leaf` for nested names and the name otherwise.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}|{}", self.leaf()),
            None => self.name.clone(),
        }
    }

    /// Returns the origin, or `None` if the name was not found.
    #[must_use]
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Returns `true` if the origin lies under a configured system root.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns `true` for built-in origins.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.is_builtin
    }

    /// Returns the assigned level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns where the level came from.
    #[must_use]
    pub fn level_source(&self) -> LevelSource {
        self.level_source
    }

    /// Returns `true` if access goes through a deferring proxy.
    #[must_use]
    pub fn should_hook(&self) -> bool {
        self.should_hook
    }

    /// Returns the search-path override, if any.
    #[must_use]
    pub fn search_path(&self) -> Option<Vec<PathBuf>> {
        self.search_path.borrow().clone()
    }

    /// Returns the target override, if any.
    #[must_use]
    pub fn target(&self) -> Option<Object> {
        self.target.borrow().clone()
    }

    pub(crate) fn set_search_path(&self, search_path: Vec<PathBuf>) {
        *self.search_path.borrow_mut() = Some(search_path);
    }

    pub(crate) fn set_target(&self, target: Object) {
        *self.target.borrow_mut() = Some(target);
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("level", &self.level)
            .field("should_hook", &self.should_hook)
            .finish_non_exhaustive()
    }
}

/// Returns the text before the last `.` of a dotted name.
#[must_use]
pub fn parent_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(parent, _)| parent)
}
