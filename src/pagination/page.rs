//! Page and cursor types shared by both paging protocols.

use serde::{Deserialize, Serialize};

/// Opaque server-issued position in a cursor-paged result set.
///
/// A cursor is only meaningful for the query that produced it. When the
/// issuing query's signature is known it travels with the token, so the
/// paginator can reject a mismatched cursor before calling the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    /// Whether a page exists after this position.
    pub has_next: bool,
    /// Whether a page exists before this position.
    pub has_prev: bool,
}

impl Cursor {
    /// A cursor issued under the query with the given signature.
    pub fn issued(token: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            signature: Some(signature.into()),
            has_next: true,
            has_prev: false,
        }
    }

    /// A cursor received from outside the process (e.g. `--cursor`).
    ///
    /// Its signature is unknown, so only the server can reject it.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            signature: None,
            has_next: true,
            has_prev: false,
        }
    }

    /// The token exactly as the server issued it.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Signature of the query this cursor was issued under, if known.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Whether this cursor may be used with a query of the given signature.
    pub fn matches(&self, signature: &str) -> bool {
        self.signature.as_deref().map_or(true, |s| s == signature)
    }
}

/// Where the next page of a listing starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// Continue a cursor-paged listing.
    Cursor(Cursor),
    /// Continue an offset-paged listing at `skip`.
    Offset { skip: u32 },
}

impl PageState {
    /// The CLI flag that resumes a listing from this point.
    pub fn resume_hint(&self) -> String {
        match self {
            PageState::Cursor(cursor) => format!("--cursor {}", cursor.token()),
            PageState::Offset { skip } => format!("--skip {skip}"),
        }
    }
}

/// A page of results from the tracker.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page, in server order.
    pub items: Vec<T>,
    /// Resume point for the following page; `None` when this page is the last.
    pub next: Option<PageState>,
    /// Cursor of the preceding page (cursor protocol only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Cursor>,
    /// Total number of items across all pages (if the server reports it).
    pub total: Option<u64>,
}

impl<T> Page<T> {
    /// Create a new page.
    #[must_use]
    pub fn new(items: Vec<T>, next: Option<PageState>, total: Option<u64>) -> Self {
        Self {
            items,
            next,
            prev: None,
            total,
        }
    }

    /// Attach the previous-page cursor.
    #[must_use]
    pub fn with_prev(mut self, prev: Option<Cursor>) -> Self {
        self.prev = prev;
        self
    }

    /// Whether another page follows.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Map the items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
            prev: self.prev,
            total: self.total,
        }
    }

    /// Returns true if this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns an iterator over the items in this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Result of fetching one page.
///
/// Invalid cursors get their own arm because the right reaction (restart
/// from an empty cursor) differs from any other failure.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The page was fetched.
    Page(Page<T>),
    /// The cursor is stale or belongs to a different query.
    CursorInvalid,
    /// The request failed, or was rejected before it was sent.
    Failed(crate::TrackerError),
}
