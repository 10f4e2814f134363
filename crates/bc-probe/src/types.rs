//! Tag reader output.

use bc_core::Container;
use serde::{Deserialize, Serialize};

/// Best-effort metadata read from one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackTags {
    pub container: Container,
    /// Short codec name, e.g. `mp3`, `aac`, `vorbis`, `opus`.
    pub codec: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Average bitrate in bits per second.
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub comment: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
}

impl TrackTags {
    /// Empty tags for a container; every optional field is `None`.
    pub fn new(container: Container) -> Self {
        Self {
            container,
            codec: None,
            duration: None,
            bitrate: None,
            sample_rate: None,
            channels: None,
            title: None,
            artist: None,
            album: None,
            comment: None,
            genre: None,
            track_number: None,
        }
    }
}

/// Parse a track tag such as `3`, `03` or `3/12`.
pub fn parse_track_number(raw: &str) -> Option<u32> {
    let head = raw.split('/').next()?.trim();
    head.parse::<u32>().ok()
}
