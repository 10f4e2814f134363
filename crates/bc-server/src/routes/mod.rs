//! Route handlers for the HTTP surface.

pub mod books;
pub mod health;
pub mod library;
pub mod media;

use bc_core::{Book, BookId, Error};
use std::sync::Arc;

use crate::context::AppContext;

/// Look up a book in the current snapshot.
pub(crate) fn find_book(ctx: &AppContext, id: &str) -> Result<Arc<Book>, Error> {
    ctx.library
        .book(&BookId::from_raw(id))
        .ok_or_else(|| Error::not_found("book", id))
}
