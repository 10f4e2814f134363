//! Unified error type for bookcast.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for request handlers to derive an HTTP status code via [`Error::http_status`]
//! and for the scanner to decide whether a failure is file-level (skip and
//! continue) or affects a whole directory.

use std::fmt;
use std::path::{Path, PathBuf};

/// Unified error type covering all failure modes in bookcast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "book", "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A rescan is already running; the new request was coalesced into it.
    #[error("Rescan already in progress")]
    RescanInProgress,

    /// The file is not in one of the supported containers.
    #[error("Unsupported format: {}", path.display())]
    UnsupportedFormat {
        /// File that was rejected.
        path: PathBuf,
    },

    /// The container could not be parsed at all.
    #[error("Corrupt file {}: {message}", path.display())]
    CorruptFile {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A file could not be scanned for some other reason (permissions, I/O).
    #[error("Scan error {}: {message}", path.display())]
    Scan {
        /// File or directory being scanned.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// The override document does not conform to the expected shape.
    #[error("Schema error in {}: {message}", path.display())]
    Schema {
        /// The override file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// Override chapter marks are not strictly increasing or out of range.
    #[error("Invalid chapter: {0}")]
    InvalidChapter(String),

    /// A directory contained no usable audio files.
    #[error("No audio files in {}", .0.display())]
    EmptyDirectory(PathBuf),

    /// The requested byte range lies outside the resource.
    #[error("Range not satisfiable for resource of {size} bytes")]
    RangeNotSatisfiable {
        /// Full size of the resource.
        size: u64,
    },

    /// The external encoder failed or exited non-zero.
    #[error("Transcode error [{tool}]: {message}")]
    Transcode {
        /// Name of the encoder.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::RescanInProgress => 409,
            Error::UnsupportedFormat { .. } => 415,
            Error::CorruptFile { .. } => 422,
            Error::Scan { .. } => 422,
            Error::Schema { .. } => 422,
            Error::InvalidChapter(_) => 422,
            Error::EmptyDirectory(_) => 404,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::Transcode { .. } => 502,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether this error concerns a single media file and the scan should
    /// skip that file and carry on.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat { .. } | Error::CorruptFile { .. } | Error::Scan { .. }
        )
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::CorruptFile`].
    pub fn corrupt(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Error::CorruptFile {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Scan`].
    pub fn scan(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Error::Scan {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Schema`].
    pub fn schema(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Error::Schema {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transcode {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
