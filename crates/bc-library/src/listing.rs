//! Non-recursive classification of a book directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bc_core::config::LibraryConfig;
use bc_core::{Container, Error, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Base names (without extension) recognised as a cover image.
const COVER_STEMS: &[&str] = &["cover", "folder", "cover_art", "cover-art"];

/// Extensions recognised for cover images.
const COVER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A regular file found in a book directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// The interesting entries of one directory.
#[derive(Debug, Clone, Default)]
pub struct DirListing {
    pub directory: PathBuf,
    /// Audio files in file name order.
    pub audio: Vec<ListedFile>,
    pub cover: Option<ListedFile>,
    pub override_file: Option<ListedFile>,
    pub ignore_file: Option<ListedFile>,
}

impl DirListing {
    /// Digest over name, size and mtime of every classified file.
    ///
    /// Two listings of the same directory have equal fingerprints iff none
    /// of the audio files, the cover, the override or the ignore file changed.
    pub fn fingerprint(&self) -> String {
        self.fingerprint_with(&[])
    }

    /// [`DirListing::fingerprint`] extended with the current state of
    /// `extra`, files outside the listing that the book depends on (an
    /// override cover in a subdirectory). A missing file hashes as absent.
    pub fn fingerprint_with(&self, extra: &[PathBuf]) -> String {
        let mut hasher = Sha256::new();
        let entries = self
            .audio
            .iter()
            .chain(self.cover.iter())
            .chain(self.override_file.iter())
            .chain(self.ignore_file.iter());
        for file in entries {
            hash_stamp(&mut hasher, &file.file_name, file.size, file.modified);
        }
        for path in extra {
            let name = path.to_string_lossy();
            match std::fs::metadata(path) {
                Ok(meta) => hash_stamp(&mut hasher, &name, meta.len(), modified(&meta)),
                Err(_) => {
                    hasher.update(name.as_bytes());
                    hasher.update(b"\0absent");
                }
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Whether the directory holds no audio and therefore no book.
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }
}

fn hash_stamp(hasher: &mut Sha256, name: &str, size: u64, modified: DateTime<Utc>) {
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(size.to_le_bytes());
    hasher.update(modified.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
}

fn modified(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// List and classify the entries of `dir` without descending into
/// subdirectories. Hidden files are ignored, except the ignore file.
///
/// Override names are matched exactly, in priority order; the first one
/// present wins. Audio files named in the ignore file are left out; an
/// empty ignore file leaves out all of them.
pub fn list_directory(dir: &Path, config: &LibraryConfig) -> Result<DirListing> {
    let override_names = &config.override_file_names;
    let read_dir = std::fs::read_dir(dir).map_err(|e| Error::scan(dir, e))?;

    let mut listing = DirListing {
        directory: dir.to_path_buf(),
        ..Default::default()
    };
    let mut override_rank = usize::MAX;

    for entry in read_dir {
        let entry = entry.map_err(|e| Error::scan(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let is_ignore_file = file_name == config.ignore_file_name;
        if file_name.starts_with('.') && !is_ignore_file {
            continue;
        }

        let path = entry.path();
        // Follow symlinks so linked audio files are picked up.
        let Ok(meta) = std::fs::metadata(&path) else {
            tracing::debug!(path = %path.display(), "Skipping unreadable entry");
            continue;
        };
        if !meta.is_file() {
            continue;
        }

        let listed = ListedFile {
            size: meta.len(),
            modified: modified(&meta),
            path,
            file_name,
        };

        if is_ignore_file {
            listing.ignore_file = Some(listed);
        } else if let Some(rank) = override_names.iter().position(|n| *n == listed.file_name) {
            if rank < override_rank {
                override_rank = rank;
                listing.override_file = Some(listed);
            }
        } else if Container::from_path(&listed.path).is_some() {
            listing.audio.push(listed);
        } else if is_cover_name(&listed.file_name) {
            // Prefer the earliest stem in COVER_STEMS when several exist.
            let better = listing
                .cover
                .as_ref()
                .map_or(true, |c| cover_rank(&listed.file_name) < cover_rank(&c.file_name));
            if better {
                listing.cover = Some(listed);
            }
        }
    }

    if let Some(path) = listing.ignore_file.as_ref().map(|f| f.path.clone()) {
        let content = std::fs::read_to_string(&path).map_err(|e| Error::scan(&path, e))?;
        if content.trim().is_empty() {
            tracing::debug!(dir = %dir.display(), "Directory excluded by ignore file");
            listing.audio.clear();
        } else {
            let ignored = parse_ignore_list(&content);
            listing.audio.retain(|f| !ignored.contains(f.file_name.as_str()));
        }
    }

    listing.audio.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(listing)
}

/// File names listed in an ignore file, one per line. Blank lines and
/// `#` comments are skipped.
fn parse_ignore_list(content: &str) -> HashSet<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
}

fn split_name(name: &str) -> Option<(String, String)> {
    let (stem, ext) = name.rsplit_once('.')?;
    Some((stem.to_ascii_lowercase(), ext.to_ascii_lowercase()))
}

fn is_cover_name(name: &str) -> bool {
    split_name(name).is_some_and(|(stem, ext)| {
        COVER_STEMS.contains(&stem.as_str()) && COVER_EXTENSIONS.contains(&ext.as_str())
    })
}

fn cover_rank(name: &str) -> usize {
    split_name(name)
        .and_then(|(stem, _)| COVER_STEMS.iter().position(|s| *s == stem))
        .unwrap_or(usize::MAX)
}

/// Whether `name` has an image extension accepted for covers.
pub fn has_image_extension(name: &str) -> bool {
    split_name(name).is_some_and(|(_, ext)| COVER_EXTENSIONS.contains(&ext.as_str()))
}
