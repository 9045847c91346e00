//! Host errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the reference initializers.
#[derive(Debug, Error)]
pub enum HostError {
    /// The definition file could not be read.
    #[error("failed to read '{}'", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: io::Error,
    },
    /// The resource has no origin to initialize from.
    #[error("resource '{name}' has no origin")]
    NoOrigin {
        /// The resource name.
        name: String,
    },
}
