//! # bc-library
//!
//! Turns directories of audio files into [`bc_core::Book`] records.
//!
//! - [`listing`] classifies the entries of one directory and fingerprints them.
//! - [`overrides`] loads the optional YAML sidecar.
//! - [`manifest`] writes a sidecar from tags and imports editor labels.
//! - [`assemble`] merges tags and overrides into one book.
//! - [`index`] holds every book behind an atomically swapped snapshot and
//!   rescans the configured roots.

pub mod assemble;
pub mod index;
pub mod listing;
pub mod manifest;
pub mod overrides;

pub use assemble::{validate_chapters, Assembly, BookAssembler, ScanIssue};
pub use index::{LibraryIndex, LibrarySnapshot, RescanReport};
pub use listing::{list_directory, DirListing};
pub use manifest::{manifest_yaml, parse_audacity_labels};
pub use overrides::{load_override, BookOverride};
