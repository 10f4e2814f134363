//! # bc-feed
//!
//! Renders a [`bc_core::Book`] as an RSS 2.0 podcast feed with iTunes and
//! Podlove Simple Chapters extensions.
//!
//! Rendering is a pure function of the book and a [`FeedContext`]: the same
//! inputs always produce byte-identical XML. Items are listed last track
//! first, and each item's GUID is `{book_id}:{file_id}`, so GUIDs survive
//! reordering, added files and metadata edits.

pub mod chapters;
pub mod rss;

pub use chapters::chapters_for_file;
pub use rss::{render_feed, FeedContext, RSS_CONTENT_TYPE};
