//! # bc-probe
//!
//! Container-level tag reading for audiobook files.
//!
//! Reads duration, track number, titles and codec details from MP3, MP4/M4A/M4B,
//! Ogg Vorbis and Opus files without decoding any audio. Fields a container
//! does not expose are left as `None`, never guessed.
//!
//! ## Quick start
//!
//! ```no_run
//! use bc_probe::{SymphoniaTagReader, TagReader};
//! use std::path::Path;
//!
//! let reader = SymphoniaTagReader::new();
//! let tags = reader.read(Path::new("01 - Opening.m4b")).unwrap();
//! println!("{:?} {:?}s", tags.title, tags.duration);
//! ```

pub mod reader;
pub mod symphonia_reader;
pub mod types;

pub use reader::TagReader;
pub use symphonia_reader::SymphoniaTagReader;
pub use types::TrackTags;
