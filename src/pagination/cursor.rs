//! Cursor-protocol page fetcher.
//!
//! Wire format: `GET <endpoint>?<params>&cursor=<token>&limit=<n>` answered
//! by `{"items": [...], "next_cursor": "...", "prev_cursor": "...", "total": n}`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::TrackerError;
use crate::fields::{query_signature, QueryParams};
use crate::transport::{ApiResponse, Method, Transport};

use super::page::{Cursor, FetchOutcome, Page, PageState};

/// Error code the tracker uses for stale or foreign cursors.
pub const INVALID_CURSOR_CODE: &str = "invalid_cursor";

#[derive(Debug, Deserialize)]
struct CursorEnvelope {
    #[serde(alias = "data")]
    items: Vec<Value>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    prev_cursor: Option<String>,
    #[serde(default)]
    total: Option<u64>,
}

/// Fetches pages of a cursor-paged endpoint, one HTTP call per page.
pub struct CursorPaginator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: String,
    params: QueryParams,
    signature: String,
}

impl<'a, T: Transport + ?Sized> CursorPaginator<'a, T> {
    /// Create a paginator for one query (endpoint + filters + field set).
    pub fn new(transport: &'a T, endpoint: impl Into<String>, params: QueryParams) -> Self {
        let endpoint = endpoint.into();
        let signature = query_signature(&endpoint, &params);
        Self {
            transport,
            endpoint,
            params,
            signature,
        }
    }

    /// Signature of the query this paginator serves.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Fetch the page at `cursor`, or the first page when `cursor` is `None`.
    ///
    /// A cursor issued for a different query is rejected without a call.
    #[tracing::instrument(skip(self, cursor), fields(endpoint = %self.endpoint))]
    pub async fn open(&self, cursor: Option<&Cursor>, limit: u32) -> FetchOutcome<Value> {
        if limit == 0 {
            return FetchOutcome::Failed(TrackerError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }

        if let Some(cursor) = cursor {
            if !cursor.matches(&self.signature) {
                tracing::warn!(
                    "Cursor was issued for a different query (signature {:?}, expected {})",
                    cursor.signature(),
                    self.signature
                );
                return FetchOutcome::CursorInvalid;
            }
        }

        let mut query = self.params.clone();
        if let Some(cursor) = cursor {
            query.push(("cursor".to_string(), cursor.token().to_string()));
        }
        query.push(("limit".to_string(), limit.to_string()));

        let response = match self
            .transport
            .call(Method::GET, &self.endpoint, &query, None)
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Failed(e),
        };

        if is_invalid_cursor(&response) {
            tracing::debug!("Server rejected cursor");
            return FetchOutcome::CursorInvalid;
        }

        let body = match response.error_for_status(&self.endpoint) {
            Ok(body) => body,
            Err(e) => return FetchOutcome::Failed(e),
        };

        let envelope: CursorEnvelope = match serde_json::from_value(body) {
            Ok(envelope) => envelope,
            Err(e) => return FetchOutcome::Failed(e.into()),
        };

        let next = envelope
            .next_cursor
            .filter(|token| !token.is_empty())
            .map(|token| {
                let mut next = Cursor::issued(token, self.signature.clone());
                next.has_prev = true;
                PageState::Cursor(next)
            });
        let prev = envelope
            .prev_cursor
            .filter(|token| !token.is_empty())
            .map(|token| Cursor::issued(token, self.signature.clone()));

        tracing::debug!(
            items = envelope.items.len(),
            has_next = next.is_some(),
            "Fetched cursor page"
        );

        FetchOutcome::Page(Page::new(envelope.items, next, envelope.total).with_prev(prev))
    }

    /// Fetch the page after `cursor`; `None` when the cursor marks the last page.
    pub async fn advance(&self, cursor: &Cursor, limit: u32) -> Option<FetchOutcome<Value>> {
        if !cursor.has_next {
            return None;
        }
        Some(self.open(Some(cursor), limit).await)
    }
}

fn is_invalid_cursor(response: &ApiResponse) -> bool {
    matches!(response.status, 400 | 410 | 422)
        && response.error_code() == Some(INVALID_CURSOR_CODE)
}
