//! Output formats offered through transcoding.

use std::fmt;
use std::str::FromStr;

use bc_core::{AudioFile, Container, Error};
use serde::{Deserialize, Serialize};

/// A transcoding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Mp3,
    Opus,
    /// Ogg Vorbis; requested as `ogg` or `vorbis`.
    Vorbis,
}

impl TargetFormat {
    /// MIME type of the transcoded stream.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus | Self::Vorbis => "audio/ogg",
        }
    }

    /// Encoder (`-c:a`) name.
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Opus => "libopus",
            Self::Vorbis => "libvorbis",
        }
    }

    /// Muxer (`-f`) name.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus | Self::Vorbis => "ogg",
        }
    }

    /// Whether `file` is already in this format, so no conversion is needed.
    pub fn matches(&self, file: &AudioFile) -> bool {
        let codec = file.codec.as_deref();
        match self {
            Self::Mp3 => file.container == Container::Mp3,
            Self::Opus => {
                file.container == Container::Opus
                    || (file.container == Container::Ogg && codec == Some("opus"))
            }
            Self::Vorbis => {
                matches!(file.container, Container::Ogg | Container::Opus)
                    && codec == Some("vorbis")
            }
        }
    }
}

impl FromStr for TargetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "opus" => Ok(Self::Opus),
            "ogg" | "vorbis" => Ok(Self::Vorbis),
            other => Err(Error::Validation(format!(
                "unsupported format '{other}' (expected mp3, opus or ogg)"
            ))),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Vorbis => "ogg",
        };
        f.write_str(s)
    }
}
