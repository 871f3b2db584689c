//! Pipeline-level errors
//!
//! Anything in here aborts the run. Per-file compile failures are reported
//! through [`crate::compiler::CompileError`] and never reach this type.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    /// A configured source root does not exist
    #[error("source root {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    /// A configured source root exists but is not a directory
    #[error("source root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// A directory below a source root could not be listed
    #[error("failed to walk {}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A discovered source file could not be read
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bundle could not be written to its output
    #[error("failed to write bundle to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type BundleResult<T> = Result<T, BundleError>;
