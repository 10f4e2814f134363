//! RSS 2.0 + iTunes + Podlove Simple Chapters rendering.

use bc_core::timecode::{format_hms, format_hms_millis};
use bc_core::{AudioFile, Book, CoverRef, Error, Result};
use chrono::{DateTime, Duration, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::chapters::chapters_for_file;

/// `Content-Type` of a rendered feed.
pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

const NS_ITUNES: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const NS_PODLOVE: &str = "http://podlove.org/simple-chapters";
const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
const PODLOVE_VERSION: &str = "1.2";

const RFC822: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Everything the feed needs beyond the book itself.
#[derive(Debug, Clone)]
pub struct FeedContext {
    /// Externally visible base URL without a trailing slash.
    pub base_url: String,
    pub ttl_minutes: u32,
    pub generator: String,
}

impl FeedContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl_minutes: 1440,
            generator: concat!("bookcast ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_ttl(mut self, minutes: u32) -> Self {
        self.ttl_minutes = minutes;
        self
    }

    pub fn book_url(&self, book: &Book) -> String {
        format!("{}/books/{}", self.base_url, book.id)
    }

    pub fn feed_url(&self, book: &Book) -> String {
        format!("{}/books/{}/feed.xml", self.base_url, book.id)
    }

    pub fn file_url(&self, book: &Book, file: &AudioFile) -> String {
        format!("{}/books/{}/files/{}", self.base_url, book.id, file.id)
    }

    /// Absolute URL of the cover, if the book has a usable one.
    pub fn cover_url(&self, book: &Book) -> Option<String> {
        match &book.cover {
            Some(CoverRef::File(_)) => Some(format!("{}/books/{}/cover", self.base_url, book.id)),
            Some(CoverRef::Url(url)) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.clone())
            }
            Some(CoverRef::Url(url)) => {
                tracing::debug!(book_id = %book.id, url = %url, "Omitting unusable cover URL");
                None
            }
            None => None,
        }
    }
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("feed rendering failed: {e}"))
}

/// Thin wrapper over the quick-xml writer for the element shapes a feed uses.
struct FeedWriter {
    inner: Writer<Vec<u8>>,
}

impl FeedWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner.write_event(event).map_err(xml_err)
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        elem.extend_attributes(attrs.iter().copied());
        self.event(Event::Start(elem))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        elem.extend_attributes(attrs.iter().copied());
        self.event(Event::Empty(elem))
    }

    fn text(&mut self, name: &str, text: &str) -> Result<()> {
        self.text_with(name, &[], text)
    }

    fn text_with(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(xml_err)
    }
}

/// Render `book` as a podcast feed.
///
/// Items are ordered last track first. Dates derive from `book.modified`
/// only, so the output is identical for identical input: track `i` of `n`
/// is dated `n - 1 - i` minutes before the book's modification time, which
/// keeps clients' date sort consistent with playback order.
pub fn render_feed(book: &Book, ctx: &FeedContext) -> Result<String> {
    let mut w = FeedWriter::new();
    let last_modified = book.modified.format(RFC822).to_string();

    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.start(
        "rss",
        &[
            ("version", "2.0"),
            ("xmlns:itunes", NS_ITUNES),
            ("xmlns:psc", NS_PODLOVE),
            ("xmlns:atom", NS_ATOM),
        ],
    )?;
    w.start("channel", &[])?;

    let feed_url = ctx.feed_url(book);
    let book_url = ctx.book_url(book);
    let description = book.description.as_deref().unwrap_or(&book.title);

    w.text("title", &book.title)?;
    w.text("link", &book_url)?;
    w.empty(
        "atom:link",
        &[
            ("href", feed_url.as_str()),
            ("rel", "self"),
            ("type", "application/rss+xml"),
        ],
    )?;
    w.text("description", description)?;
    w.text("language", &book.language)?;
    w.text("generator", &ctx.generator)?;
    w.text("ttl", &ctx.ttl_minutes.to_string())?;
    w.text("pubDate", &last_modified)?;
    w.text("lastBuildDate", &last_modified)?;

    for category in &book.categories {
        w.text("category", category)?;
    }

    w.text("itunes:author", &book.author)?;
    w.text("itunes:summary", description)?;
    w.text("itunes:type", "serial")?;
    w.text(
        "itunes:explicit",
        if book.explicit { "true" } else { "false" },
    )?;
    for category in &book.categories {
        w.empty("itunes:category", &[("text", category.as_str())])?;
    }

    if let Some(cover) = ctx.cover_url(book) {
        w.start("image", &[])?;
        w.text("url", &cover)?;
        w.text("title", &book.title)?;
        w.text("link", &book_url)?;
        w.end("image")?;
        w.empty("itunes:image", &[("href", cover.as_str())])?;
    }

    let offsets = book.file_offsets();
    let count = book.files.len();
    for (index, file) in book.files.iter().enumerate().rev() {
        let published = book.modified - Duration::minutes((count - 1 - index) as i64);
        write_item(&mut w, book, ctx, file, index, offsets[index], published)?;
    }

    w.end("channel")?;
    w.end("rss")?;
    w.finish()
}

fn write_item(
    w: &mut FeedWriter,
    book: &Book,
    ctx: &FeedContext,
    file: &AudioFile,
    index: usize,
    offset: f64,
    published: DateTime<Utc>,
) -> Result<()> {
    let guid = format!("{}:{}", book.id, file.id);

    w.start("item", &[])?;
    w.text("title", &file.title)?;
    w.text_with("guid", &[("isPermaLink", "false")], &guid)?;
    w.text("pubDate", &published.format(RFC822).to_string())?;
    w.empty(
        "enclosure",
        &[
            ("url", ctx.file_url(book, file).as_str()),
            ("length", file.size.to_string().as_str()),
            ("type", file.mime_type()),
        ],
    )?;
    w.text("itunes:title", &file.title)?;
    w.text("itunes:duration", &format_hms(file.duration))?;
    w.text("itunes:episode", &(index + 1).to_string())?;
    w.text("itunes:episodeType", "full")?;

    if !book.chapters.is_empty() {
        let chapters = chapters_for_file(&book.chapters, offset, file.duration);
        if !chapters.is_empty() {
            w.start("psc:chapters", &[("version", PODLOVE_VERSION)])?;
            for chapter in &chapters {
                w.empty(
                    "psc:chapter",
                    &[
                        ("start", format_hms_millis(chapter.start).as_str()),
                        ("title", chapter.title.as_str()),
                    ],
                )?;
            }
            w.end("psc:chapters")?;
        }
    }

    w.end("item")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_core::{BookId, ChapterMark, Container, FileId};
    use chrono::TimeZone;
    use std::path::{Path, PathBuf};

    fn file(book: &BookId, name: &str, title: &str, duration: f64) -> AudioFile {
        AudioFile {
            id: FileId::for_file(book, name),
            path: PathBuf::from("/books/dune").join(name),
            file_name: name.into(),
            duration,
            track: None,
            title: title.into(),
            container: Container::Mp3,
            codec: Some("mp3".into()),
            bitrate: None,
            size: 1000,
            modified: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn book() -> Book {
        let id = BookId::for_directory(Path::new("/books/dune"));
        Book {
            files: vec![
                file(&id, "01.mp3", "Opening", 3725.0),
                file(&id, "02.mp3", "Desert & Spice", 60.0),
            ],
            id,
            directory: "/books/dune".into(),
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            description: Some("A <classic>".into()),
            cover: Some(CoverRef::File("/books/dune/cover.jpg".into())),
            language: "en".into(),
            categories: vec!["Science Fiction".into()],
            explicit: false,
            chapters: vec![
                ChapterMark::new(0.0, "Opening"),
                ChapterMark::new(3725.0, "Desert & Spice"),
            ],
            modified: Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).unwrap(),
        }
    }

    fn ctx() -> FeedContext {
        FeedContext::new("http://books.local:8080/")
    }

    #[test]
    fn rendering_is_idempotent() {
        let b = book();
        let first = render_feed(&b, &ctx()).unwrap();
        let second = render_feed(&b, &ctx()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn channel_elements() {
        let xml = render_feed(&book(), &ctx()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:itunes=\"http://www.itunes.com/dtds/podcast-1.0.dtd\""));
        assert!(xml.contains("xmlns:psc=\"http://podlove.org/simple-chapters\""));
        assert!(xml.contains("<title>Dune</title>"));
        assert!(xml.contains("<itunes:author>Frank Herbert</itunes:author>"));
        assert!(xml.contains("<description>A &lt;classic&gt;</description>"));
        assert!(xml.contains("<language>en</language>"));
        assert!(xml.contains("<lastBuildDate>Sat, 02 Mar 2024 08:30:00 +0000</lastBuildDate>"));
        assert!(xml.contains("<itunes:explicit>false</itunes:explicit>"));
        assert!(xml.contains("<itunes:category text=\"Science Fiction\"/>"));
        let book_id = BookId::for_directory(Path::new("/books/dune"));
        assert!(xml.contains(&format!(
            "<itunes:image href=\"http://books.local:8080/books/{book_id}/cover\"/>"
        )));
    }

    #[test]
    fn items_last_track_first() {
        let xml = render_feed(&book(), &ctx()).unwrap();
        let second = xml.find("<title>Desert &amp; Spice</title>").unwrap();
        let first = xml.find("<title>Opening</title>").unwrap();
        assert!(second < first);
        assert!(xml.contains("<pubDate>Sat, 02 Mar 2024 08:29:00 +0000</pubDate>"));
    }

    #[test]
    fn item_details() {
        let b = book();
        let xml = render_feed(&b, &ctx()).unwrap();
        let f = &b.files[0];
        assert!(xml.contains(&format!(
            "<guid isPermaLink=\"false\">{}:{}</guid>",
            b.id, f.id
        )));
        assert!(xml.contains(&format!(
            "<enclosure url=\"http://books.local:8080/books/{}/files/{}\" length=\"1000\" type=\"audio/mpeg\"/>",
            b.id, f.id
        )));
        assert!(xml.contains("<itunes:duration>01:02:05</itunes:duration>"));
        assert!(xml.contains("<itunes:episode>1</itunes:episode>"));
    }

    #[test]
    fn chapters_rendered_per_item() {
        let xml = render_feed(&book(), &ctx()).unwrap();
        assert!(xml.contains("<psc:chapters version=\"1.2\">"));
        assert!(xml.contains("<psc:chapter start=\"00:00:00.000\" title=\"Opening\"/>"));
        assert!(xml.contains("<psc:chapter start=\"00:00:00.000\" title=\"Desert &amp; Spice\"/>"));
    }

    #[test]
    fn no_chapters_block_without_chapters() {
        let mut b = book();
        b.chapters.clear();
        let xml = render_feed(&b, &ctx()).unwrap();
        assert!(!xml.contains("psc:chapters"));
    }

    #[test]
    fn guids_survive_unrelated_changes() {
        let b = book();
        let mut edited = book();
        edited.description = Some("Rewritten".into());
        edited.title = "Dune (Unabridged)".into();
        let id = b.id.clone();
        edited.files.insert(0, file(&id, "00.mp3", "Foreword", 10.0));

        let guids = |xml: &str| -> Vec<String> {
            xml.match_indices("<guid isPermaLink=\"false\">")
                .map(|(i, m)| {
                    let rest = &xml[i + m.len()..];
                    rest[..rest.find('<').unwrap()].to_string()
                })
                .collect()
        };
        let before = guids(&render_feed(&b, &ctx()).unwrap());
        let after = guids(&render_feed(&edited, &ctx()).unwrap());
        for guid in &before {
            assert!(after.contains(guid), "{guid} missing after edit");
        }
        assert_eq!(after.len(), before.len() + 1);
    }

    #[test]
    fn cover_variants() {
        let mut b = book();
        b.cover = Some(CoverRef::Url("https://img.example.org/dune.jpg".into()));
        let xml = render_feed(&b, &ctx()).unwrap();
        assert!(xml.contains("<url>https://img.example.org/dune.jpg</url>"));

        b.cover = Some(CoverRef::Url("javascript:alert(1)".into()));
        let xml = render_feed(&b, &ctx()).unwrap();
        assert!(!xml.contains("<image>"));
        assert!(!xml.contains("itunes:image"));

        b.cover = None;
        let xml = render_feed(&b, &ctx()).unwrap();
        assert!(!xml.contains("<image>"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        assert_eq!(ctx().base_url, "http://books.local:8080");
    }
}
