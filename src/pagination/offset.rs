//! Offset-protocol page fetcher.
//!
//! Wire format: `GET <endpoint>?<params>&skip=<n>&top=<n>` answered by
//! `{"items": [...], "total": n}` or a bare JSON array.

use serde::Deserialize;
use serde_json::Value;

use crate::error::TrackerError;
use crate::fields::QueryParams;
use crate::transport::{Method, Transport};

use super::page::{FetchOutcome, Page, PageState};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OffsetEnvelope {
    Wrapped {
        #[serde(alias = "data", alias = "value")]
        items: Vec<Value>,
        #[serde(default, alias = "count")]
        total: Option<u64>,
    },
    Bare(Vec<Value>),
}

impl OffsetEnvelope {
    fn into_parts(self) -> (Vec<Value>, Option<u64>) {
        match self {
            OffsetEnvelope::Wrapped { items, total } => (items, total),
            OffsetEnvelope::Bare(items) => (items, None),
        }
    }
}

/// Fetches pages of a skip/top-paged endpoint.
pub struct OffsetPaginator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: String,
    params: QueryParams,
    max_results: Option<u64>,
}

impl<'a, T: Transport + ?Sized> OffsetPaginator<'a, T> {
    /// Create a paginator; `max_results` is the ceiling no page may start beyond.
    pub fn new(
        transport: &'a T,
        endpoint: impl Into<String>,
        params: QueryParams,
        max_results: Option<u64>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            params,
            max_results,
        }
    }

    /// Fetch `top` items starting at `skip`.
    ///
    /// The returned page's `next` is `Offset { skip: skip + top }` unless this
    /// page is terminal: fewer than `top` items came back, the ceiling is
    /// reached, or the reported total is covered.
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn fetch(&self, skip: u32, top: u32) -> FetchOutcome<Value> {
        if top == 0 {
            return FetchOutcome::Failed(TrackerError::InvalidArgument(
                "top must be greater than zero".to_string(),
            ));
        }

        let mut query = self.params.clone();
        query.push(("skip".to_string(), skip.to_string()));
        query.push(("top".to_string(), top.to_string()));

        let response = match self
            .transport
            .call(Method::GET, &self.endpoint, &query, None)
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Failed(e),
        };

        let body = match response.error_for_status(&self.endpoint) {
            Ok(body) => body,
            Err(e) => return FetchOutcome::Failed(e),
        };

        let (items, total) = match serde_json::from_value::<OffsetEnvelope>(body) {
            Ok(envelope) => envelope.into_parts(),
            Err(e) => return FetchOutcome::Failed(e.into()),
        };

        let next_skip = u64::from(skip) + u64::from(top);
        let short_page = items.len() < top as usize;
        let at_ceiling = self.max_results.is_some_and(|max| next_skip >= max);
        let covered = total.is_some_and(|total| next_skip >= total);

        let next = if short_page || at_ceiling || covered {
            None
        } else {
            match u32::try_from(next_skip) {
                Ok(skip) => Some(PageState::Offset { skip }),
                Err(_) => {
                    tracing::warn!(next_skip, "Offset exceeds u32 range, stopping");
                    None
                }
            }
        };

        tracing::debug!(
            skip,
            top,
            items = items.len(),
            has_next = next.is_some(),
            "Fetched offset page"
        );

        FetchOutcome::Page(Page::new(items, next, total))
    }
}
