//! Content-derived identifiers.
//!
//! Identifiers are hex digests rather than random values so that the same
//! directory or file always maps to the same id across restarts and rescans.
//! Feed GUIDs and URLs depend on that stability.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Number of hex characters kept from the SHA-256 digest.
const ID_LEN: usize = 16;

fn digest_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(ID_LEN);
    hex
}

/// Generate a newtype ID wrapper over a hex digest string.
macro_rules! digest_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                /// Borrow the id as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }

                /// Wrap a raw string taken from a request path.
                #[must_use]
                pub fn from_raw(raw: impl Into<String>) -> Self {
                    Self(raw.into())
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

digest_id! {
    /// Identifier of a book, derived from its source directory path.
    BookId,
    /// Identifier of an audio file, derived from its book and file name.
    FileId,
}

impl BookId {
    /// Derive the id of the book rooted at `dir`.
    pub fn for_directory(dir: &Path) -> Self {
        Self(digest_hex(&[dir.to_string_lossy().as_bytes()]))
    }
}

impl FileId {
    /// Derive the id of `file_name` within `book`.
    ///
    /// Independent of the file's position in the book, so reordering or
    /// adding files never changes an existing id.
    pub fn for_file(book: &BookId, file_name: &str) -> Self {
        Self(digest_hex(&[book.as_str().as_bytes(), file_name.as_bytes()]))
    }
}
