//! Error types for bag operations.
//!
//! Only failures that make further processing meaningless are raised as
//! [`BagError`]. Problems found while reading individual manifest, fetch or
//! bag-info lines are recorded in the bag's [`Report`](crate::report::Report)
//! instead.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for bag operations.
pub type BagResult<T> = Result<T, BagError>;

/// Fatal errors raised by bag operations.
#[derive(Debug, Error)]
pub enum BagError {
    /// Underlying filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path is not usable for the requested operation.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Algorithm name is not one of the supported digests.
    #[error("unsupported algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    /// The bag must keep at least one payload algorithm.
    #[error("cannot remove the last algorithm ({name}) from a bag")]
    LastAlgorithm { name: String },

    /// Writing needs at least one payload algorithm.
    #[error("bag has no payload algorithm")]
    NoAlgorithm,

    /// Version string is not `<int>.<int>`.
    #[error("invalid BagIt version '{value}'")]
    InvalidVersion { value: String },

    /// Version parsed but is not one this library reads or writes.
    #[error("unsupported BagIt version {value}")]
    UnsupportedVersion { value: String },

    /// Tag-file encoding other than UTF-8.
    #[error("unsupported tag file character encoding '{value}'")]
    UnsupportedEncoding { value: String },

    /// A required structural file is missing or unreadable.
    #[error("bag structure error in {}: {message}", path.display())]
    Structure { path: PathBuf, message: String },

    /// The bag directory for `create` already holds files.
    #[error("directory {} already exists and is not empty", path.display())]
    AlreadyExists { path: PathBuf },

    /// Zero or several candidate directories where exactly one was expected.
    #[error("expected exactly one directory in {}, found {found}", path.display())]
    AmbiguousRoot { path: PathBuf, found: usize },

    /// Bag-info tag name is not writable.
    #[error("invalid bag-info tag '{name}': {reason}")]
    InvalidTag { name: String, reason: String },

    /// Tag is computed by `update()` and cannot be set directly.
    #[error("bag-info tag '{name}' is generated and cannot be set manually")]
    GeneratedTag { name: String },

    /// Fetch declaration rejected on insert.
    #[error("invalid fetch entry: {message}")]
    InvalidFetch { message: String },

    /// Options file could not be parsed.
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    /// Archive could not be read or written.
    #[error("archive error: {message}")]
    Archive { message: String },

    /// Remote retrieval of a fetch entry failed.
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },
}

impl BagError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn structure(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error wraps a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Suggested exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. } if self.is_not_found() => 3,
            Self::InvalidVersion { .. }
            | Self::UnsupportedVersion { .. }
            | Self::UnsupportedEncoding { .. }
            | Self::Structure { .. }
            | Self::AmbiguousRoot { .. } => 4,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_exit_code_3() {
        let err = BagError::io(
            "/nowhere",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn structural_errors_map_to_exit_code_4() {
        let err = BagError::structure("/bag/bagit.txt", "missing");
        assert!(!err.is_not_found());
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("bagit.txt"));
    }
}
