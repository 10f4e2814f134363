//! The audiobook data model.
//!
//! A [`Book`] is assembled once per scan of its directory and never mutated
//! afterwards; a rescan builds a fresh record and swaps it in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ids::{BookId, FileId};

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Supported audio container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp3,
    Mp4,
    Ogg,
    Opus,
}

impl Container {
    /// Guess the container from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "m4a" | "m4b" | "mp4" => Some(Self::Mp4),
            "ogg" | "oga" => Some(Self::Ogg),
            "opus" => Some(Self::Opus),
            _ => None,
        }
    }

    /// Guess the container from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type served for this container.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Mp4 => "audio/mp4",
            Self::Ogg | Self::Opus => "audio/ogg",
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mp3 => "mp3",
            Self::Mp4 => "mp4",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// AudioFile
// ---------------------------------------------------------------------------

/// One audio file of a book, as scanned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFile {
    pub id: FileId,
    pub path: PathBuf,
    /// File name within the book directory.
    pub file_name: String,
    /// Duration in seconds. Zero when the container does not expose it.
    pub duration: f64,
    pub track: Option<u32>,
    /// Display title: the tag title, else the file stem.
    pub title: String,
    pub container: Container,
    pub codec: Option<String>,
    /// Average bitrate in bits per second.
    pub bitrate: Option<u32>,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl AudioFile {
    /// MIME type of the file as stored on disk.
    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }
}

// ---------------------------------------------------------------------------
// Chapters and covers
// ---------------------------------------------------------------------------

/// A chapter boundary, as an offset from the start of the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMark {
    /// Start offset in seconds.
    pub start: f64,
    pub title: String,
}

impl ChapterMark {
    pub fn new(start: f64, title: impl Into<String>) -> Self {
        Self {
            start,
            title: title.into(),
        }
    }
}

/// Where a book's cover image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CoverRef {
    /// An image file inside the book directory.
    File(PathBuf),
    /// An absolute http(s) URL.
    Url(String),
}

impl CoverRef {
    /// MIME type of a local cover, by extension.
    pub fn mime_type(&self) -> Option<&'static str> {
        let CoverRef::File(path) = self else {
            return None;
        };
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => Some("image/jpeg"),
            Some("png") => Some("image/png"),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// An assembled audiobook.
///
/// Invariants upheld by the assembler: `files` is non-empty and in playback
/// order, and every chapter start is strictly increasing and lies in
/// `[0, total_duration())`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub directory: PathBuf,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub cover: Option<CoverRef>,
    pub language: String,
    pub categories: Vec<String>,
    pub explicit: bool,
    pub files: Vec<AudioFile>,
    pub chapters: Vec<ChapterMark>,
    /// Max of file mtimes and the override file mtime.
    pub modified: DateTime<Utc>,
}

impl Book {
    /// Sum of all file durations, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.files.iter().map(|f| f.duration).sum()
    }

    /// Look up a file by id.
    pub fn file(&self, id: &FileId) -> Option<&AudioFile> {
        self.files.iter().find(|f| &f.id == id)
    }

    /// Start offset of each file within the book, in playback order.
    pub fn file_offsets(&self) -> Vec<f64> {
        let mut offset = 0.0;
        self.files
            .iter()
            .map(|f| {
                let start = offset;
                offset += f.duration;
                start
            })
            .collect()
    }
}
