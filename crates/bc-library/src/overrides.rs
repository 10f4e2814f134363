//! Loader for the per-directory YAML override sidecar.
//!
//! The sidecar is sparse: every key is optional and anything absent falls
//! back to what the tags say. Unknown keys are ignored. A document of the
//! wrong shape is a [`Error::Schema`], which the assembler reports and then
//! treats as "no overrides".
//!
//! ```yaml
//! title: The Long Way
//! author: A. Writer
//! cover: art/front.jpg
//! chapters:
//!   - title: Prologue          # start defaults to 0 on the first chapter
//!   - start: "00:12:30.5"
//!     title: Part One
//!   - start: 5400
//!     name: Part Two
//! ```

use std::path::{Path, PathBuf};

use bc_core::timecode::parse_timecode;
use bc_core::{ChapterMark, CoverRef, Error, Result};
use serde::Deserialize;

use crate::listing::has_image_extension;

/// Parsed contents of an override sidecar.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookOverride {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Several authors, joined with `, `. Ignored when `author` is set.
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    /// Path relative to the book directory, or an absolute http(s) URL.
    pub cover: Option<String>,
    pub language: Option<String>,
    pub categories: Option<Vec<String>>,
    pub explicit: Option<bool>,
    /// File names listed first, in this order; unlisted files follow.
    pub order: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_chapters")]
    pub chapters: Option<Vec<ChapterMark>>,
}

#[derive(Deserialize)]
struct RawChapter {
    start: Option<RawStart>,
    #[serde(alias = "name")]
    title: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStart {
    Seconds(f64),
    Timecode(String),
}

fn deserialize_chapters<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<ChapterMark>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    let Some(raw) = Option::<Vec<RawChapter>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    raw.into_iter()
        .enumerate()
        .map(|(i, chapter)| {
            let start = match chapter.start {
                None if i == 0 => 0.0,
                None => return Err(D::Error::custom(format!("chapters[{i}] is missing start"))),
                Some(RawStart::Seconds(s)) if s.is_finite() && s >= 0.0 => s,
                Some(RawStart::Seconds(s)) => {
                    return Err(D::Error::custom(format!("chapters[{i}].start {s} is negative")))
                }
                Some(RawStart::Timecode(tc)) => parse_timecode(&tc).ok_or_else(|| {
                    D::Error::custom(format!("chapters[{i}].start '{tc}' is not a timecode"))
                })?,
            };
            let title = chapter.title.trim();
            if title.is_empty() {
                return Err(D::Error::custom(format!("chapters[{i}].title is empty")));
            }
            Ok(ChapterMark::new(start, title))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Some)
}

/// Load and validate the override document at `path`.
///
/// Returns `Ok(None)` when the file does not exist. An empty or `null`
/// document yields an empty override.
pub fn load_override(path: &Path) -> Result<Option<BookOverride>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::scan(path, e)),
    };
    parse_override(path, &content).map(Some)
}

/// Parse an override document. `path` is only used for error context.
pub fn parse_override(path: &Path, content: &str) -> Result<BookOverride> {
    if content.trim().is_empty() {
        return Ok(BookOverride::default());
    }
    let parsed: Option<BookOverride> =
        serde_yaml::from_str(content).map_err(|e| Error::schema(path, e))?;
    Ok(parsed.unwrap_or_default())
}

/// Book-level fields subject to overriding.
#[derive(Debug, Clone, PartialEq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub cover: Option<CoverRef>,
    pub language: String,
    pub categories: Vec<String>,
    pub explicit: bool,
}

impl BookOverride {
    /// Where a local `cover` reference points, whether or not the file
    /// exists yet. `None` for URLs and references that escape `dir`.
    pub fn cover_path(&self, dir: &Path) -> Option<PathBuf> {
        let raw = self.cover.as_deref()?.trim();
        if raw.is_empty() || url::Url::parse(raw).is_ok() {
            return None;
        }
        let relative = Path::new(raw);
        if relative.is_absolute() || relative.components().any(|c| c.as_os_str() == "..") {
            return None;
        }
        Some(dir.join(relative))
    }

    /// Patch `base` field by field: a present override value wins, an
    /// absent one keeps the derived value.
    ///
    /// Cover references that are neither an existing image inside `dir` nor
    /// an http(s) URL are dropped with a warning and the derived cover kept.
    pub fn apply(&self, base: BookFields, dir: &Path) -> BookFields {
        let author = match (&self.author, &self.authors) {
            (Some(a), _) => Some(a.clone()),
            (None, Some(list)) if !list.is_empty() => Some(list.join(", ")),
            _ => None,
        };

        let cover = match self.cover.as_deref().map(|c| resolve_cover(c, dir)) {
            Some(Some(cover)) => Some(cover),
            Some(None) => {
                tracing::warn!(
                    dir = %dir.display(),
                    cover = ?self.cover,
                    "Ignoring unusable cover override"
                );
                base.cover
            }
            None => base.cover,
        };

        BookFields {
            title: non_empty(&self.title).unwrap_or(base.title),
            author: author.filter(|a| !a.trim().is_empty()).unwrap_or(base.author),
            description: non_empty(&self.description).or(base.description),
            cover,
            language: non_empty(&self.language).unwrap_or(base.language),
            categories: self.categories.clone().unwrap_or(base.categories),
            explicit: self.explicit.unwrap_or(base.explicit),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Interpret a cover reference from an override.
pub fn resolve_cover(raw: &str, dir: &Path) -> Option<CoverRef> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(url) = url::Url::parse(raw) {
        return matches!(url.scheme(), "http" | "https")
            .then(|| CoverRef::Url(url.to_string()));
    }

    let relative = Path::new(raw);
    if relative.is_absolute() || relative.components().any(|c| c.as_os_str() == "..") {
        return None;
    }
    let path = dir.join(relative);
    (path.is_file() && has_image_extension(raw)).then_some(CoverRef::File(path))
}
