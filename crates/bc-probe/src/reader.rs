//! The [`TagReader`] trait defining the interface for tag extraction.

use std::path::Path;

use crate::types::TrackTags;

/// Reads container-level metadata from an audio file.
///
/// Implementations must be safe to share across threads (`Send + Sync`);
/// the library scanner reads files of one directory in parallel.
pub trait TagReader: Send + Sync {
    /// Human-readable name identifying this reader implementation.
    fn name(&self) -> &'static str;

    /// Check whether this reader handles the given path.
    ///
    /// A return value of `true` does not guarantee that [`TagReader::read`]
    /// will succeed.
    fn supports(&self, path: &Path) -> bool;

    /// Read tags from the file at `path`.
    ///
    /// Fails with [`bc_core::Error::UnsupportedFormat`] for containers outside
    /// the supported set and [`bc_core::Error::CorruptFile`] when the container
    /// cannot be parsed.
    fn read(&self, path: &Path) -> bc_core::Result<TrackTags>;
}
