//! bc-core: shared types, IDs, errors and configuration.
//!
//! This crate is the foundational dependency for all other bc-* crates,
//! providing the audiobook data model, content-derived identifiers, a unified
//! error type, timecode helpers and application configuration.

pub mod book;
pub mod config;
pub mod error;
pub mod ids;
pub mod timecode;

// Re-export the most commonly used items at the crate root.
pub use book::*;
pub use error::{Error, Result};
pub use ids::*;
