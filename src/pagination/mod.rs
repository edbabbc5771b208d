//! Pagination over the tracker's two paging protocols.
//!
//! Endpoints page either by opaque cursor (`cursor` / `limit`) or by numeric
//! offset (`skip` / `top`). [`PaginationConfig`] says which, the two
//! paginators fetch single pages, and [`ResultStreamer`] turns either into one
//! lazy, capped sequence.

mod cursor;
mod offset;
mod page;
mod strategy;
mod stream;

pub use cursor::{CursorPaginator, INVALID_CURSOR_CODE};
pub use offset::OffsetPaginator;
pub use page::{Cursor, FetchOutcome, Page, PageState};
pub use strategy::{EndpointPaging, PaginationConfig, PaginationStrategy, FALLBACK_PAGING};
pub use stream::{ListRequest, Listing, ResultStreamer, Termination};
