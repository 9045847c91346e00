//! Resolver configuration.
//!
//! [`Config`] controls which resources are hooked, how lazily they are
//! materialized and how invalidation behaves. It can be built in code with
//! the `with_*` methods, parsed from JSON, or overlaid from `LAZI_*`
//! environment variables.
//!
//! # Example
//!
//! ```
//! use lazi_core::config::Config;
//! use lazi_core::level::Level;
//!
//! let config = Config::default()
//!     .with_default_level(Level::Swap)
//!     .with_level(r"^app\.heavy", Level::ForceLoad)
//!     .with_exclude_system(false);
//!
//! assert_eq!(config.level_table().unwrap().level_for("app.heavy.model"), Level::ForceLoad);
//! assert_eq!(config.level_table().unwrap().level_for("app.light"), Level::Swap);
//! ```
//!
//! # Environment
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `LAZI_HOOK_ENABLED` | `hook_enabled` | boolean |
//! | `LAZI_FORCE_ALL_EAGER` | `force_all_eager` | boolean |
//! | `LAZI_EXCLUDE_SYSTEM` | `exclude_system` | boolean |
//! | `LAZI_EXCLUDE_BUILTIN` | `exclude_builtin` | boolean |
//! | `LAZI_KEEP_EMPTY` | `keep_empty_records` | boolean |
//! | `LAZI_KEEP_0HOOK` | `keep_zero_hook_records` | boolean |
//! | `LAZI_AUTO_DEPS` | `auto_dependency_load` | boolean |
//! | `LAZI_SOFT_INVALIDATION` | `soft_invalidation` | boolean |
//! | `LAZI_DEFAULT_LEVEL` | `default_level` | level name or code |
//! | `LAZI_LEVELS` | `levels` | `pattern:LEVEL,pattern:LEVEL` |
//! | `LAZI_SYSTEM_ROOTS` | `system_roots` | comma separated paths |
//!
//! Booleans are true for `1`, `true`, `yes` or `on` (any case) and false
//! otherwise.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LaziError;
use crate::level::{Level, LevelRule, LevelTable};

/// Prefix shared by every configuration environment variable.
pub const ENV_PREFIX: &str = "LAZI_";

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch; when off nothing is hooked.
    pub hook_enabled: bool,
    /// Raises the default level to at least [`Level::ForceLoad`].
    pub force_all_eager: bool,
    /// Leaves resources located under a system root unhooked at level
    /// [`Level::None`].
    pub exclude_system: bool,
    /// Leaves built-in resources unhooked at level [`Level::None`].
    pub exclude_builtin: bool,
    /// Registers records whose name was not found.
    pub keep_empty_records: bool,
    /// Registers records that are not hooked.
    pub keep_zero_hook_records: bool,
    /// Forces dependencies still pending when their parent loads.
    pub auto_dependency_load: bool,
    /// Clears the registry on invalidation without tearing records down.
    pub soft_invalidation: bool,
    /// Level for names no rule matches.
    pub default_level: Level,
    /// Ordered per-name overrides; the first matching rule applies.
    pub levels: Vec<LevelRule>,
    /// Locations whose resources count as system resources.
    pub system_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hook_enabled: true,
            force_all_eager: false,
            exclude_system: true,
            exclude_builtin: true,
            keep_empty_records: false,
            keep_zero_hook_records: false,
            auto_dependency_load: true,
            soft_invalidation: false,
            default_level: Level::Lazy,
            levels: Vec::new(),
            system_roots: Vec::new(),
        }
    }
}

impl Config {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// [`LaziError::Config`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, LaziError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`LaziError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String, LaziError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the default configuration overlaid with `LAZI_*` variables.
    ///
    /// # Errors
    ///
    /// [`LaziError::Config`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, LaziError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlays this configuration with the process's `LAZI_*` variables.
    ///
    /// # Errors
    ///
    /// [`LaziError::Config`] if a variable cannot be parsed.
    pub fn apply_env(&mut self) -> Result<(), LaziError> {
        self.apply_vars(std::env::vars())
    }

    /// Overlays this configuration with `LAZI_*` entries from `vars`.
    ///
    /// Unknown `LAZI_*` keys and keys without the prefix are ignored.
    ///
    /// # Errors
    ///
    /// [`LaziError::Config`] if a value cannot be parsed.
    pub fn apply_vars<I, K, V>(&mut self, vars: I) -> Result<(), LaziError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(field) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            match field {
                "HOOK_ENABLED" => self.hook_enabled = parse_bool(value),
                "FORCE_ALL_EAGER" => self.force_all_eager = parse_bool(value),
                "EXCLUDE_SYSTEM" => self.exclude_system = parse_bool(value),
                "EXCLUDE_BUILTIN" => self.exclude_builtin = parse_bool(value),
                "KEEP_EMPTY" => self.keep_empty_records = parse_bool(value),
                "KEEP_0HOOK" => self.keep_zero_hook_records = parse_bool(value),
                "AUTO_DEPS" => self.auto_dependency_load = parse_bool(value),
                "SOFT_INVALIDATION" => self.soft_invalidation = parse_bool(value),
                "DEFAULT_LEVEL" => self.default_level = value.parse()?,
                "LEVELS" => self.levels = parse_levels(value)?,
                "SYSTEM_ROOTS" => {
                    self.system_roots = split_list(value).map(PathBuf::from).collect();
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Compiles the level table, applying `force_all_eager`.
    ///
    /// # Errors
    ///
    /// [`LaziError::InvalidPattern`] if a rule does not compile.
    pub fn level_table(&self) -> Result<LevelTable, LaziError> {
        let default = if self.force_all_eager {
            self.default_level.max(Level::ForceLoad)
        } else {
            self.default_level
        };
        LevelTable::compile(&self.levels, default)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Builder methods
    // ─────────────────────────────────────────────────────────────────────

    /// Sets the master hook switch.
    #[must_use]
    pub fn with_hook_enabled(mut self, enabled: bool) -> Self {
        self.hook_enabled = enabled;
        self
    }

    /// Sets whether every resource is loaded eagerly.
    #[must_use]
    pub fn with_force_all_eager(mut self, eager: bool) -> Self {
        self.force_all_eager = eager;
        self
    }

    /// Sets whether system resources are excluded at level `NONE`.
    #[must_use]
    pub fn with_exclude_system(mut self, exclude: bool) -> Self {
        self.exclude_system = exclude;
        self
    }

    /// Sets whether built-in resources are excluded at level `NONE`.
    #[must_use]
    pub fn with_exclude_builtin(mut self, exclude: bool) -> Self {
        self.exclude_builtin = exclude;
        self
    }

    /// Sets whether not-found records are registered.
    #[must_use]
    pub fn with_keep_empty_records(mut self, keep: bool) -> Self {
        self.keep_empty_records = keep;
        self
    }

    /// Sets whether unhooked records are registered.
    #[must_use]
    pub fn with_keep_zero_hook_records(mut self, keep: bool) -> Self {
        self.keep_zero_hook_records = keep;
        self
    }

    /// Sets whether pending dependencies load with their parent.
    #[must_use]
    pub fn with_auto_dependency_load(mut self, auto: bool) -> Self {
        self.auto_dependency_load = auto;
        self
    }

    /// Sets whether invalidation skips per-record teardown.
    #[must_use]
    pub fn with_soft_invalidation(mut self, soft: bool) -> Self {
        self.soft_invalidation = soft;
        self
    }

    /// Sets the default level.
    #[must_use]
    pub fn with_default_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Appends a per-name level rule.
    #[must_use]
    pub fn with_level(mut self, pattern: impl Into<String>, level: Level) -> Self {
        self.levels.push(LevelRule::new(pattern, level));
        self
    }

    /// Appends a system root.
    #[must_use]
    pub fn with_system_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.system_roots.push(root.into());
        self
    }
}

/// Parses an environment boolean.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Parses `pattern:LEVEL,pattern:LEVEL`. The level follows the last `:` of
/// each item so patterns may contain colons.
fn parse_levels(value: &str) -> Result<Vec<LevelRule>, LaziError> {
    split_list(value)
        .map(|item| {
            let (pattern, level) = item.rsplit_once(':').ok_or_else(|| {
                LaziError::Config(format!("level rule `{item}` is not `pattern:LEVEL`"))
            })?;
            Ok(LevelRule::new(pattern, level.parse()?))
        })
        .collect()
}
