//! # bc-av
//!
//! On-the-fly audio conversion through an external encoder.
//!
//! This crate provides:
//!
//! - **Encoder discovery** ([`Encoder::discover`]) -- use the configured
//!   binary or find `ffmpeg` on `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for short-lived invocations such as version checks.
//! - **Target formats** ([`TargetFormat`]) -- the fixed set of conversions
//!   offered to clients.
//! - **Streaming transcodes** ([`Transcoder`]) -- a scoped child process whose
//!   stdout becomes a byte stream; dropping the stream kills the encoder.

pub mod command;
pub mod format;
pub mod tools;
pub mod transcode;

pub use command::{ToolCommand, ToolOutput};
pub use format::TargetFormat;
pub use tools::{Encoder, EncoderInfo};
pub use transcode::{ByteStream, Transcoder};
