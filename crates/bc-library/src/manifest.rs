//! Writing an override sidecar for a book, and importing chapter marks
//! exported from an audio editor.
//!
//! The generated document uses the same keys [`crate::overrides`] reads, so
//! a freshly written sidecar reproduces the tag-derived book until someone
//! edits it.

use std::path::Path;

use bc_core::timecode::format_hms_millis;
use bc_core::{Book, ChapterMark, CoverRef, Error, Result};
use serde::Serialize;

#[derive(Serialize)]
struct ManifestDoc<'a> {
    title: &'a str,
    author: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<String>,
    language: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<&'a str>,
    explicit: bool,
    order: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chapters: Vec<ManifestChapter<'a>>,
}

#[derive(Serialize)]
struct ManifestChapter<'a> {
    start: String,
    title: &'a str,
}

/// Render `book` as an override document.
///
/// Files are listed under `order` in their current playback order and
/// chapter starts are written as `HH:MM:SS.mmm`. A local cover is written
/// relative to the book directory.
pub fn manifest_yaml(book: &Book) -> Result<String> {
    let cover = book.cover.as_ref().and_then(|cover| match cover {
        CoverRef::Url(url) => Some(url.clone()),
        CoverRef::File(path) => path
            .strip_prefix(&book.directory)
            .ok()
            .map(|p| p.to_string_lossy().into_owned()),
    });

    let doc = ManifestDoc {
        title: &book.title,
        author: &book.author,
        description: book.description.as_deref(),
        cover,
        language: &book.language,
        categories: book.categories.iter().map(String::as_str).collect(),
        explicit: book.explicit,
        order: book.files.iter().map(|f| f.file_name.as_str()).collect(),
        chapters: book
            .chapters
            .iter()
            .map(|c| ManifestChapter {
                start: format_hms_millis(c.start),
                title: &c.title,
            })
            .collect(),
    };

    serde_yaml::to_string(&doc)
        .map_err(|e| Error::Internal(format!("Failed to serialize manifest: {e}")))
}

/// Parse an Audacity label export (`start<TAB>end<TAB>title` per line,
/// times in seconds) into chapter marks shifted by `offset` seconds.
///
/// End times are ignored. Spectral selection lines (starting with `\`) and
/// blank lines are skipped. `path` is only used for error context.
pub fn parse_audacity_labels(
    path: &Path,
    content: &str,
    offset: f64,
) -> Result<Vec<ChapterMark>> {
    let mut marks = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('\\') {
            continue;
        }

        let mut fields = line.splitn(3, '\t');
        let start = fields.next().unwrap_or_default().trim();
        let _end = fields.next();
        let title = fields.next().unwrap_or_default().trim();

        let start: f64 = start
            .parse()
            .ok()
            .filter(|s: &f64| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| {
                Error::schema(path, format!("line {}: bad start '{start}'", n + 1))
            })?;
        if title.is_empty() {
            return Err(Error::schema(path, format!("line {}: missing label", n + 1)));
        }
        marks.push(ChapterMark::new(start + offset, title));
    }
    Ok(marks)
}
