//! Filesystem host.
//!
//! [`FsLocator`] maps dotted names onto a directory tree. For a relative
//! path `a/b` under a search location `dir`:
//!
//! - `dir/a/b/<index>.<ext>` is a package searched at `dir/a/b`
//! - `dir/a/b.<ext>` is a plain module
//! - a bare `dir/a/b` directory contributes to a namespace package
//!
//! The first location with a package or module wins. Namespace directories
//! are only used when no location has either.
//!
//! Top-level names are searched under the locator's roots. When the
//! resolver passes a search path (a parent package's search locations) only
//! the last name component is looked up there.
//!
//! [`SourceInitializer`] reads the located file into the `source` attribute.

use core::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lazi_core::collab::{BoxError, InitContext, Initializer, Locator};
use lazi_core::object::Object;
use lazi_core::spec::{Origin, OriginKind};

use crate::error::HostError;

/// Default file extension of definitions.
pub const DEFAULT_EXTENSION: &str = "lazi";

/// Default package index file stem.
pub const DEFAULT_INDEX: &str = "index";

/// Locates definitions on the filesystem.
#[derive(Clone)]
pub struct FsLocator {
    roots: Vec<PathBuf>,
    extension: String,
    index: String,
}

impl FsLocator {
    /// Creates a locator searching `roots` for top-level names.
    #[must_use]
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            extension: DEFAULT_EXTENSION.to_owned(),
            index: DEFAULT_INDEX.to_owned(),
        }
    }

    /// Sets the definition file extension (without the dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the package index file stem.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Returns the root directories.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn find(&self, relative: &Path, locations: &[PathBuf]) -> Option<Origin> {
        let mut namespace = Vec::new();
        for location in locations {
            let dir = location.join(relative);
            let index = dir.join(&self.index).with_extension(&self.extension);
            if index.is_file() {
                return Some(
                    Origin::source(index.to_string_lossy().into_owned())
                        .with_search_locations(vec![dir]),
                );
            }

            let module = dir.with_extension(&self.extension);
            if module.is_file() {
                return Some(Origin::source(module.to_string_lossy().into_owned()));
            }

            if dir.is_dir() {
                namespace.push(dir);
            }
        }
        (!namespace.is_empty()).then(|| Origin::namespace(namespace))
    }
}

impl Locator for FsLocator {
    fn locate(
        &self,
        name: &str,
        search_path: Option<&[PathBuf]>,
        _target: Option<&Object>,
    ) -> Option<Origin> {
        let (relative, locations): (PathBuf, &[PathBuf]) = match search_path {
            Some(search_path) => (
                PathBuf::from(name.rsplit('.').next().unwrap_or(name)),
                search_path,
            ),
            None => (name.split('.').collect(), self.roots.as_slice()),
        };

        let origin = self.find(&relative, locations);
        tracing::trace!(
            name,
            found = origin.as_ref().map(|origin| origin.location.as_str()),
            "filesystem lookup"
        );
        origin
    }
}

impl fmt::Debug for FsLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsLocator")
            .field("roots", &self.roots)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SourceInitializer
// ─────────────────────────────────────────────────────────────────────────────

/// Initializes file-backed resources with their contents.
///
/// Sets `source` to the file text. Namespace packages get no `source`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceInitializer;

impl Initializer for SourceInitializer {
    fn initialize(&self, ctx: &mut InitContext<'_>) -> Result<(), BoxError> {
        let Some(origin) = ctx.spec().origin() else {
            return Err(HostError::NoOrigin {
                name: ctx.name().to_owned(),
            }
            .into());
        };
        if origin.kind != OriginKind::Source {
            return Ok(());
        }

        let path = PathBuf::from(&origin.location);
        let source = fs::read_to_string(&path).map_err(|source| HostError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(name = ctx.name(), path = %path.display(), bytes = source.len(), "read definition");
        ctx.object().set("source", source);
        Ok(())
    }
}
