//! Book assembly: merge per-file tags and the override sidecar into a
//! single immutable [`Book`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bc_core::config::LibraryConfig;
use bc_core::{AudioFile, Book, BookId, ChapterMark, CoverRef, Error, FileId, Result};
use bc_probe::{TagReader, TrackTags};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::listing::{list_directory, DirListing, ListedFile};
use crate::overrides::{load_override, BookFields};

/// A non-fatal problem met while assembling a book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

impl ScanIssue {
    fn new(path: impl Into<PathBuf>, err: &Error) -> Self {
        Self {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Outcome of assembling one directory.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub book: Book,
    /// Skipped files, rejected overrides and dropped chapters.
    pub issues: Vec<ScanIssue>,
    /// Files outside the directory listing that the book was built from.
    pub dependencies: Vec<PathBuf>,
}

/// Builds books from directories using a [`TagReader`].
#[derive(Clone)]
pub struct BookAssembler {
    reader: Arc<dyn TagReader>,
    config: LibraryConfig,
}

impl BookAssembler {
    pub fn new(reader: Arc<dyn TagReader>, config: LibraryConfig) -> Self {
        Self { reader, config }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// List `dir` and assemble it.
    pub fn assemble(&self, dir: &Path) -> Result<Assembly> {
        let listing = list_directory(dir, &self.config)?;
        self.assemble_listing(&listing)
    }

    /// Assemble `dir` from its tags alone, as if it had no override.
    pub fn derive(&self, dir: &Path) -> Result<Assembly> {
        let mut listing = list_directory(dir, &self.config)?;
        listing.override_file = None;
        self.assemble_listing(&listing)
    }

    /// Assemble an already listed directory.
    ///
    /// Fails with [`Error::EmptyDirectory`] when no file could be read.
    /// Unreadable files, a malformed override and invalid chapter marks are
    /// reported in [`Assembly::issues`] and otherwise ignored.
    pub fn assemble_listing(&self, listing: &DirListing) -> Result<Assembly> {
        let dir = listing.directory.as_path();
        if listing.is_empty() {
            return Err(Error::EmptyDirectory(dir.to_path_buf()));
        }

        let mut issues = Vec::new();
        let book_id = BookId::for_directory(dir);

        let overrides = match &listing.override_file {
            Some(file) => match load_override(&file.path) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "Ignoring override");
                    issues.push(ScanIssue::new(&file.path, &e));
                    None
                }
            },
            None => None,
        };

        // Order of `listing.audio` is preserved by the indexed collect.
        let read: Vec<(&ListedFile, Result<TrackTags>)> = listing
            .audio
            .par_iter()
            .map(|file| (file, self.reader.read(&file.path)))
            .collect();

        let mut files = Vec::with_capacity(read.len());
        let mut tags = Vec::with_capacity(read.len());
        for (file, result) in read {
            match result {
                Ok(t) => {
                    files.push(audio_file(&book_id, file, &t));
                    tags.push(t);
                }
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "Skipping file");
                    issues.push(ScanIssue::new(&file.path, &e));
                }
            }
        }

        if files.is_empty() {
            return Err(Error::EmptyDirectory(dir.to_path_buf()));
        }

        let dependencies: Vec<PathBuf> = overrides
            .as_ref()
            .and_then(|o| o.cover_path(dir))
            .into_iter()
            .collect();

        let derived = self.derive_fields(dir, listing, &tags);
        let fields = match &overrides {
            Some(doc) => doc.apply(derived, dir),
            None => derived,
        };

        order_files(&mut files, overrides.as_ref().and_then(|o| o.order.as_deref()));

        let total: f64 = files.iter().map(|f| f.duration).sum();
        let chapters = match overrides.as_ref().and_then(|o| o.chapters.as_ref()) {
            Some(marks) => match validate_chapters(marks, total) {
                Ok(()) => marks.clone(),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Dropping chapters");
                    let path = listing
                        .override_file
                        .as_ref()
                        .map_or_else(|| dir.to_path_buf(), |f| f.path.clone());
                    issues.push(ScanIssue::new(path, &e));
                    Vec::new()
                }
            },
            None => synthesize_chapters(&files),
        };

        let modified = files
            .iter()
            .map(|f| f.modified)
            .chain(listing.override_file.iter().map(|f| f.modified))
            .max()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        tracing::debug!(
            book_id = %book_id,
            title = %fields.title,
            files = files.len(),
            chapters = chapters.len(),
            "Assembled book"
        );

        Ok(Assembly {
            book: Book {
                id: book_id,
                directory: dir.to_path_buf(),
                title: fields.title,
                author: fields.author,
                description: fields.description,
                cover: fields.cover,
                language: fields.language,
                categories: fields.categories,
                explicit: fields.explicit,
                files,
                chapters,
                modified,
            },
            issues,
            dependencies,
        })
    }

    /// Book-level fields from tags alone.
    fn derive_fields(&self, dir: &Path, listing: &DirListing, tags: &[TrackTags]) -> BookFields {
        let albums = distinct(tags.iter().filter_map(|t| t.album.as_deref()));
        if albums.len() > 1 {
            tracing::warn!(dir = %dir.display(), albums = ?albums, "Files disagree on album; using the first");
        }

        let title = albums.into_iter().next().unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string())
        });

        let artists = distinct(tags.iter().filter_map(|t| t.artist.as_deref()));
        let author = if artists.is_empty() {
            self.config.default_author.clone()
        } else {
            artists.join(", ")
        };

        BookFields {
            title,
            author,
            description: tags.iter().find_map(|t| t.comment.clone()),
            cover: listing.cover.as_ref().map(|c| CoverRef::File(c.path.clone())),
            language: self.config.default_language.clone(),
            categories: distinct(tags.iter().filter_map(|t| t.genre.as_deref())),
            explicit: false,
        }
    }
}

fn audio_file(book_id: &BookId, file: &ListedFile, tags: &TrackTags) -> AudioFile {
    let stem = Path::new(&file.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.file_name.clone());

    AudioFile {
        id: FileId::for_file(book_id, &file.file_name),
        path: file.path.clone(),
        file_name: file.file_name.clone(),
        duration: tags.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
        track: tags.track_number,
        title: tags.title.clone().unwrap_or(stem),
        container: tags.container,
        codec: tags.codec.clone(),
        bitrate: tags.bitrate,
        size: file.size,
        modified: file.modified,
    }
}

/// Distinct non-empty values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .map(str::trim)
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}

/// Put `files` (already in file name order) into playback order.
///
/// Track numbers decide when every file has one and no two collide;
/// otherwise file name order stands. Names listed in `hints` then move to
/// the front in the listed order.
fn order_files(files: &mut [AudioFile], hints: Option<&[String]>) {
    let tracks: Vec<u32> = files.iter().filter_map(|f| f.track).collect();
    let unique: HashSet<u32> = tracks.iter().copied().collect();
    if tracks.len() == files.len() && unique.len() == tracks.len() {
        files.sort_by_key(|f| f.track);
    }

    if let Some(hints) = hints {
        let rank = |f: &AudioFile| {
            hints
                .iter()
                .position(|h| *h == f.file_name)
                .unwrap_or(usize::MAX)
        };
        files.sort_by_key(|f| rank(f));
    }
}

/// Check that chapter starts are strictly increasing and within
/// `[0, total)`.
pub fn validate_chapters(chapters: &[ChapterMark], total: f64) -> Result<()> {
    let mut previous: Option<f64> = None;
    for (i, chapter) in chapters.iter().enumerate() {
        if !(chapter.start >= 0.0 && chapter.start < total) {
            return Err(Error::InvalidChapter(format!(
                "chapter {i} ('{}') starts at {}s, outside [0, {total})",
                chapter.title, chapter.start
            )));
        }
        if previous.is_some_and(|p| chapter.start <= p) {
            return Err(Error::InvalidChapter(format!(
                "chapter {i} ('{}') does not start after the previous one",
                chapter.title
            )));
        }
        previous = Some(chapter.start);
    }
    Ok(())
}

/// One chapter per file at its cumulative start offset.
///
/// A zero-length file shares its start with the next file; the later file
/// keeps the slot so starts stay strictly increasing.
fn synthesize_chapters(files: &[AudioFile]) -> Vec<ChapterMark> {
    let total: f64 = files.iter().map(|f| f.duration).sum();
    let mut chapters: Vec<ChapterMark> = Vec::with_capacity(files.len());
    let mut offset = 0.0;
    for file in files {
        let start = offset;
        offset += file.duration;
        if start >= total {
            break;
        }
        if chapters.last().is_some_and(|c| c.start >= start) {
            chapters.pop();
        }
        chapters.push(ChapterMark::new(start, file.title.clone()));
    }
    chapters
}
