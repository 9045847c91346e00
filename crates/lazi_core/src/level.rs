//! Laziness levels and the per-name level table.
//!
//! Every specification is assigned a [`Level`] that decides how aggressively
//! its materialization is deferred. Levels are ordered: a higher level is
//! always at least as eager as a lower one.
//!
//! | Level | Hooked | Deferred | Flattened after load |
//! |-------|--------|----------|----------------------|
//! | [`None`](Level::None) | policy | yes | no |
//! | [`Lazy`](Level::Lazy) | yes | yes | no |
//! | [`Swap`](Level::Swap) | yes | yes | yes |
//! | [`ForceLoad`](Level::ForceLoad) | yes | no | no |
//! | [`UnwrapProxy`](Level::UnwrapProxy) | yes | no | yes |
//! | [`Unhook`](Level::Unhook) | no | no | n/a |
//!
//! [`LevelTable`] maps name patterns (regular expressions) to levels, in
//! order. A pattern matches if it is found anywhere in the name. The level
//! of a name is the maximum of the first matching rule and the global
//! default.

use core::fmt;
use core::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LaziError;

// ─────────────────────────────────────────────────────────────────────────────
// Level
// ─────────────────────────────────────────────────────────────────────────────

/// How aggressively a resource is deferred.
///
/// Parses from the names `NONE`, `LAZY`, `SWAP`, `FORCE_LOAD` (alias `LOAD`),
/// `UNWRAP_PROXY` (alias `UNMO`), `UNHOOK` (alias `UNLO`), case-insensitively,
/// or from the integers `-1..=4`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "LevelRepr", into = "String")]
pub enum Level {
    /// No explicit laziness; system/builtin exclusion policy decides hooking.
    None,
    /// Hooked and deferred until first access.
    #[default]
    Lazy,
    /// Deferred, then flattened into a direct reference once loaded.
    Swap,
    /// Hooked but loaded eagerly at creation.
    ForceLoad,
    /// Loaded eagerly at creation, then flattened.
    UnwrapProxy,
    /// Not hooked at all; materialized directly.
    Unhook,
}

impl Level {
    /// All levels, in ascending order.
    pub const ALL: [Level; 6] = [
        Level::None,
        Level::Lazy,
        Level::Swap,
        Level::ForceLoad,
        Level::UnwrapProxy,
        Level::Unhook,
    ];

    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::None => "NONE",
            Level::Lazy => "LAZY",
            Level::Swap => "SWAP",
            Level::ForceLoad => "FORCE_LOAD",
            Level::UnwrapProxy => "UNWRAP_PROXY",
            Level::Unhook => "UNHOOK",
        }
    }

    /// Returns the integer code (`-1` for [`Level::None`]).
    #[must_use]
    pub fn code(self) -> i8 {
        match self {
            Level::None => -1,
            Level::Lazy => 0,
            Level::Swap => 1,
            Level::ForceLoad => 2,
            Level::UnwrapProxy => 3,
            Level::Unhook => 4,
        }
    }

    /// Looks a level up by integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Level> {
        Level::ALL.into_iter().find(|level| i64::from(level.code()) == code)
    }

    /// Returns `true` if a non-forced trigger may leave the resource lazy.
    #[must_use]
    pub fn permits_deferral(self) -> bool {
        self <= Level::Swap
    }

    /// Returns `true` if creation latches a forced load.
    #[must_use]
    pub fn forces_load(self) -> bool {
        self >= Level::ForceLoad
    }

    /// Returns `true` if the proxy is flattened once loaded.
    #[must_use]
    pub fn flattens(self) -> bool {
        matches!(self, Level::Swap | Level::UnwrapProxy)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LaziError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Level::from_code(code)
                .ok_or_else(|| LaziError::Config(format!("unknown laziness level code {code}")));
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Level::None),
            "LAZY" => Ok(Level::Lazy),
            "SWAP" => Ok(Level::Swap),
            "FORCE_LOAD" | "LOAD" => Ok(Level::ForceLoad),
            "UNWRAP_PROXY" | "UNMO" => Ok(Level::UnwrapProxy),
            "UNHOOK" | "UNLO" => Ok(Level::Unhook),
            _ => Err(LaziError::Config(format!("unknown laziness level `{trimmed}`"))),
        }
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_owned()
    }
}

/// Wire representation accepted when deserializing a [`Level`].
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<LevelRepr> for Level {
    type Error = LaziError;

    fn try_from(repr: LevelRepr) -> Result<Self, Self::Error> {
        match repr {
            LevelRepr::Code(code) => Level::from_code(code)
                .ok_or_else(|| LaziError::Config(format!("unknown laziness level code {code}"))),
            LevelRepr::Name(name) => name.parse(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LevelRule / LevelTable
// ─────────────────────────────────────────────────────────────────────────────

/// One `(pattern → level)` override, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRule {
    /// Regular expression searched for anywhere in the resource name.
    ///
    /// Patterns are not anchored: `pkg` also matches `mypkg.x`. Anchor with
    /// `^` (and `$`) to match from the start, as in `^pkg\.`.
    pub pattern: String,
    /// Level assigned to matching names.
    pub level: Level,
}

impl LevelRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(pattern: impl Into<String>, level: Level) -> Self {
        Self {
            pattern: pattern.into(),
            level,
        }
    }
}

/// Where a specification's level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LevelSource {
    /// The global default applied; no rule matched or the default was higher.
    Default,
    /// The rule at this index of the table decided the level.
    Override(usize),
}

impl LevelSource {
    /// Returns `true` for [`LevelSource::Override`].
    #[must_use]
    pub fn is_override(self) -> bool {
        matches!(self, LevelSource::Override(_))
    }
}

/// Compiled, ordered `(pattern → level)` table.
#[derive(Debug, Clone)]
pub struct LevelTable {
    rules: Vec<(Regex, Level)>,
    default: Level,
}

impl LevelTable {
    /// Compiles the rules.
    ///
    /// # Errors
    ///
    /// [`LaziError::InvalidPattern`] if a pattern is not a valid regular
    /// expression.
    pub fn compile(rules: &[LevelRule], default: Level) -> Result<Self, LaziError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| (regex, rule.level))
                    .map_err(|source| LaziError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules, default })
    }

    /// Returns the global default level.
    #[must_use]
    pub fn default_level(&self) -> Level {
        self.default
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the level for `name`: the maximum of the first matching rule
    /// and the global default.
    #[must_use]
    pub fn level_for(&self, name: &str) -> Level {
        self.lookup(name).0
    }

    /// Like [`level_for`](Self::level_for), also reporting which source won.
    ///
    /// A matching rule whose level equals the default still counts as an
    /// override.
    #[must_use]
    pub fn lookup(&self, name: &str) -> (Level, LevelSource) {
        let matched = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, (regex, _))| regex.is_match(name));

        match matched {
            Some((index, (_, level))) if *level >= self.default => {
                (*level, LevelSource::Override(index))
            }
            _ => (self.default, LevelSource::Default),
        }
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default: Level::default(),
        }
    }
}
