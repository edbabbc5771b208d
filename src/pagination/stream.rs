//! One lazy, capped sequence over either paging protocol.
//!
//! [`ResultStreamer`] hides whether an endpoint pages by cursor or by offset.
//! It can be drained automatically ([`ResultStreamer::into_stream`],
//! [`ResultStreamer::drain`]) or driven a page at a time by a pager
//! ([`ResultStreamer::next_page`]).
//!
//! When a fetch fails after some pages were delivered, everything already
//! fetched is delivered first and the error comes last.

use std::collections::{HashSet, VecDeque};

use futures::stream::{self, Stream};
use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::fields::QueryParams;
use crate::transport::Transport;

use super::cursor::CursorPaginator;
use super::offset::OffsetPaginator;
use super::page::{FetchOutcome, Page, PageState};
use super::strategy::{PaginationConfig, PaginationStrategy};

/// What to list and how much of it.
#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Endpoint path relative to the API base (e.g. `issues`).
    pub endpoint: String,
    /// Filters and field selection, usually from [`crate::optimize_query`].
    pub params: QueryParams,
    /// Items per request; the endpoint's default when `None`.
    pub page_size: Option<u32>,
    /// Upper bound on items yielded across all pages.
    pub max_results: Option<u64>,
    /// Resume point from an earlier page; the first page when `None`.
    pub start: Option<PageState>,
}

impl ListRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
            page_size: None,
            max_results: None,
            start: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn starting_at(mut self, start: PageState) -> Self {
        self.start = Some(start);
        self
    }
}

/// How a drained listing ended.
#[derive(Debug)]
pub enum Termination {
    /// The server had no more pages.
    Exhausted,
    /// `max_results` was reached; more results may exist.
    Capped { max_results: u64 },
    /// A fetch failed; the items before it were kept.
    Failed(TrackerError),
}

/// Everything an automatic listing produced.
#[derive(Debug)]
pub struct Listing {
    pub items: Vec<Value>,
    pub pages: u32,
    pub termination: Termination,
}

impl Listing {
    /// Whether the listing reached the end of the result set.
    pub fn is_complete(&self) -> bool {
        matches!(self.termination, Termination::Exhausted)
    }

    /// Trailing note for displays when the listing stopped early.
    pub fn note(&self) -> Option<String> {
        match &self.termination {
            Termination::Exhausted => None,
            Termination::Capped { max_results } => Some(format!(
                "Showing the first {max_results} results; raise --max-results to see more"
            )),
            Termination::Failed(e) => Some(format!(
                "Listing incomplete: stopped after {} results: {e}",
                self.items.len()
            )),
        }
    }

    /// The items, or the error that cut the listing short.
    pub fn into_result(self) -> Result<Vec<Value>> {
        match self.termination {
            Termination::Failed(e) => Err(e),
            _ => Ok(self.items),
        }
    }
}

enum Paginator<'a, T: Transport + ?Sized> {
    Cursor(CursorPaginator<'a, T>),
    Offset(OffsetPaginator<'a, T>),
}

#[derive(Debug, Clone)]
enum Position {
    Start,
    At(PageState),
    Done,
}

/// Lazy, capped listing over a cursor or offset endpoint.
pub struct ResultStreamer<'a, T: Transport + ?Sized> {
    paginator: Paginator<'a, T>,
    endpoint: String,
    page_size: u32,
    max_results: Option<u64>,
    position: Position,
    yielded: u64,
    pages: u32,
    capped: bool,
    seen_cursors: HashSet<String>,
}

impl<'a, T: Transport + ?Sized> ResultStreamer<'a, T> {
    /// Pick the paging protocol for `request.endpoint` and prepare the first fetch.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidArgument`] for a zero page size or a
    /// resume point from the other paging protocol.
    pub fn new(transport: &'a T, config: &PaginationConfig, request: ListRequest) -> Result<Self> {
        let paging = config.select(&request.endpoint);
        let page_size = request.page_size.unwrap_or(paging.default_page_size);
        if page_size == 0 {
            return Err(TrackerError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }

        let position = match (&request.start, paging.strategy) {
            (None, _) => Position::Start,
            (Some(state @ PageState::Cursor(_)), PaginationStrategy::Cursor)
            | (Some(state @ PageState::Offset { .. }), PaginationStrategy::Offset) => {
                Position::At(state.clone())
            }
            (Some(state), strategy) => {
                return Err(TrackerError::InvalidArgument(format!(
                    "'{}' uses {:?} paging; cannot resume with {}",
                    request.endpoint,
                    strategy,
                    state.resume_hint()
                )));
            }
        };

        let paginator = match paging.strategy {
            PaginationStrategy::Cursor => Paginator::Cursor(CursorPaginator::new(
                transport,
                request.endpoint.clone(),
                request.params,
            )),
            PaginationStrategy::Offset => {
                // The ceiling is in skip space, so a resumed listing shifts it.
                let start_skip = match &request.start {
                    Some(PageState::Offset { skip }) => u64::from(*skip),
                    _ => 0,
                };
                Paginator::Offset(OffsetPaginator::new(
                    transport,
                    request.endpoint.clone(),
                    request.params,
                    request.max_results.map(|max| start_skip + max),
                ))
            }
        };

        tracing::debug!(
            endpoint = %request.endpoint,
            strategy = ?paging.strategy,
            page_size,
            max_results = ?request.max_results,
            "Prepared listing"
        );

        Ok(Self {
            paginator,
            endpoint: request.endpoint,
            page_size,
            max_results: request.max_results,
            position,
            yielded: 0,
            pages: 0,
            capped: false,
            seen_cursors: HashSet::new(),
        })
    }

    /// Paging protocol in use.
    pub fn strategy(&self) -> PaginationStrategy {
        match self.paginator {
            Paginator::Cursor(_) => PaginationStrategy::Cursor,
            Paginator::Offset(_) => PaginationStrategy::Offset,
        }
    }

    /// Items per request.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Items yielded so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Pages fetched so far.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Whether no further page will be fetched.
    pub fn is_finished(&self) -> bool {
        matches!(self.position, Position::Done)
    }

    /// Throw away the current position and start again from the first page.
    ///
    /// This is the reaction to [`TrackerError::InvalidCursor`].
    pub fn restart(&mut self) {
        tracing::info!(endpoint = %self.endpoint, "Restarting listing from the first page");
        self.position = Position::Start;
        self.yielded = 0;
        self.pages = 0;
        self.capped = false;
        self.seen_cursors.clear();
    }

    fn remaining(&self) -> Option<u64> {
        self.max_results
            .map(|max| max.saturating_sub(self.yielded))
    }

    /// Fetch the next page (interactive mode).
    ///
    /// Returns `Ok(None)` once the listing is exhausted or capped. The page's
    /// `next` is where the listing would continue, even if the cap stops this
    /// streamer there; pagers can offer it as a resume point.
    ///
    /// # Errors
    ///
    /// The fetch error, or [`TrackerError::InvalidCursor`]. The streamer is
    /// finished afterwards unless [`restart`](Self::restart) is called.
    pub async fn next_page(&mut self) -> Result<Option<Page<Value>>> {
        let remaining = self.remaining();
        if remaining == Some(0) {
            if !matches!(self.position, Position::Done) {
                self.capped = true;
                self.position = Position::Done;
            }
            return Ok(None);
        }

        let limit = match remaining {
            Some(remaining) => self
                .page_size
                .min(u32::try_from(remaining).unwrap_or(u32::MAX)),
            None => self.page_size,
        };

        let offset_skip = match (&self.paginator, &self.position) {
            (Paginator::Offset(_), Position::Start) => Some(0),
            (Paginator::Offset(_), Position::At(PageState::Offset { skip })) => Some(*skip),
            _ => None,
        };

        let outcome = match (&self.paginator, &self.position) {
            (_, Position::Done) => None,
            (Paginator::Cursor(p), Position::Start) => Some(p.open(None, limit).await),
            (Paginator::Cursor(p), Position::At(PageState::Cursor(cursor))) => {
                p.advance(cursor, limit).await
            }
            (Paginator::Offset(p), Position::Start) => Some(p.fetch(0, limit).await),
            (Paginator::Offset(p), Position::At(PageState::Offset { skip })) => {
                Some(p.fetch(*skip, limit).await)
            }
            (_, Position::At(state)) => Some(FetchOutcome::Failed(TrackerError::InvalidArgument(
                format!(
                    "cannot resume '{}' with {}",
                    self.endpoint,
                    state.resume_hint()
                ),
            ))),
        };

        let Some(outcome) = outcome else {
            self.position = Position::Done;
            return Ok(None);
        };

        match outcome {
            FetchOutcome::Page(mut page) => {
                if let Some(remaining) = remaining {
                    if page.items.len() as u64 > remaining {
                        tracing::debug!(
                            returned = page.items.len(),
                            remaining,
                            "Truncating page to max_results"
                        );
                        page.items.truncate(remaining as usize);
                        self.capped = true;
                    }
                }

                self.yielded += page.items.len() as u64;
                self.pages += 1;

                page.next = page.next.take().filter(|state| self.first_visit(state));
                let reached_cap = self.remaining() == Some(0);
                if reached_cap && page.next.is_none() {
                    // The offset fetcher stops at the ceiling; a full page there
                    // still leaves a resume point unless the total is covered.
                    page.next = offset_skip.and_then(|skip| resume_after(skip, limit, &page));
                }
                if reached_cap && page.next.is_some() {
                    self.capped = true;
                }

                self.position = match &page.next {
                    Some(state) if !reached_cap => Position::At(state.clone()),
                    _ => Position::Done,
                };

                Ok(Some(page))
            }
            FetchOutcome::CursorInvalid => {
                self.position = Position::Done;
                Err(TrackerError::InvalidCursor {
                    endpoint: self.endpoint.clone(),
                })
            }
            FetchOutcome::Failed(e) => {
                self.position = Position::Done;
                Err(e)
            }
        }
    }

    /// Loop guard: a cursor may be followed only once per listing.
    fn first_visit(&mut self, state: &PageState) -> bool {
        match state {
            PageState::Cursor(cursor) => {
                let fresh = self.seen_cursors.insert(cursor.token().to_string());
                if !fresh {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        cursor = cursor.token(),
                        "Server repeated a cursor, stopping"
                    );
                }
                fresh
            }
            PageState::Offset { .. } => true,
        }
    }

    fn termination(&self) -> Termination {
        match self.max_results {
            Some(max_results) if self.capped => Termination::Capped { max_results },
            _ => Termination::Exhausted,
        }
    }

    /// Fetch every page up to the cap (auto mode), keeping partial results on failure.
    pub async fn drain(mut self) -> Listing {
        let mut items = Vec::new();
        let termination = loop {
            match self.next_page().await {
                Ok(Some(page)) => items.extend(page.items),
                Ok(None) => break self.termination(),
                Err(e) => {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        fetched = items.len(),
                        "Listing stopped early: {}",
                        e
                    );
                    break Termination::Failed(e);
                }
            }
        };

        Listing {
            items,
            pages: self.pages,
            termination,
        }
    }

    /// Lazy item sequence (auto mode).
    ///
    /// Pages are fetched only as items are consumed. A failed fetch shows up
    /// as a final `Err` after every item fetched before it.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> + 'a {
        stream::unfold(
            (self, VecDeque::new()),
            |(mut streamer, mut buffer)| async move {
                loop {
                    if let Some(item) = buffer.pop_front() {
                        return Some((Ok(item), (streamer, buffer)));
                    }
                    match streamer.next_page().await {
                        Ok(Some(page)) => buffer.extend(page.items),
                        Ok(None) => return None,
                        Err(e) => return Some((Err(e), (streamer, buffer))),
                    }
                }
            },
        )
    }
}

/// Where an offset listing stopped at the ceiling would continue.
fn resume_after(skip: u32, top: u32, page: &Page<Value>) -> Option<PageState> {
    let next_skip = u64::from(skip) + u64::from(top);
    let full = page.items.len() as u64 >= u64::from(top);
    let covered = page.total.is_some_and(|total| next_skip >= total);
    if !full || covered {
        return None;
    }
    u32::try_from(next_skip)
        .ok()
        .map(|skip| PageState::Offset { skip })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::page::Cursor;
    use crate::pagination::strategy::EndpointPaging;
    use crate::transport::fake::ScriptedTransport;
    use crate::transport::{ApiResponse, Method};
    use futures::StreamExt;
    use serde_json::json;

    /// Cursor endpoint over `total` items; tokens are decimal offsets.
    fn cursor_server(total: usize) -> ScriptedTransport {
        ScriptedTransport::new(move |call| {
            let start: usize = call.param("cursor").map_or(0, |c| c.parse().unwrap());
            let limit: usize = call.param("limit").unwrap().parse().unwrap();
            let end = total.min(start + limit);
            let items: Vec<Value> = (start..end).map(|i| json!({"id": i})).collect();
            let next = (end < total).then(|| end.to_string());
            Ok(ApiResponse::ok(json!({"items": items, "next_cursor": next})))
        })
    }

    /// Offset endpoint over `total` items.
    fn offset_server(total: usize) -> ScriptedTransport {
        ScriptedTransport::new(move |call| {
            let skip: usize = call.param("skip").unwrap().parse().unwrap();
            let top: usize = call.param("top").unwrap().parse().unwrap();
            let items: Vec<Value> = (skip..total.min(skip + top))
                .map(|i| json!({"id": i}))
                .collect();
            Ok(ApiResponse::ok(json!({ "items": items })))
        })
    }

    fn ids(items: &[Value]) -> Vec<u64> {
        items.iter().map(|v| v["id"].as_u64().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_offset_fifty_then_ten_stops_without_third_fetch() {
        let transport = offset_server(60);
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("projects")
            .with_page_size(50)
            .with_max_results(1000);

        let listing = ResultStreamer::new(&transport, &config, request)
            .unwrap()
            .drain()
            .await;

        assert_eq!(listing.items.len(), 60);
        assert_eq!(listing.pages, 2);
        assert!(listing.is_complete());
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(ids(&listing.items), (0..60).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_never_yields_more_than_max_results() {
        let config = PaginationConfig::new([
            ("issues".to_string(), EndpointPaging::cursor(10)),
            ("projects".to_string(), EndpointPaging::offset(10)),
        ]);

        for endpoint in ["issues", "projects"] {
            for page_size in [1u32, 7, 50, 100] {
                for max in [0u64, 1, 7, 49, 50, 51, 230, 500] {
                    let transport = if endpoint == "issues" {
                        cursor_server(230)
                    } else {
                        offset_server(230)
                    };
                    let request = ListRequest::new(endpoint)
                        .with_page_size(page_size)
                        .with_max_results(max);
                    let listing = ResultStreamer::new(&transport, &config, request)
                        .unwrap()
                        .drain()
                        .await;

                    let expected = max.min(230) as usize;
                    assert_eq!(
                        listing.items.len(),
                        expected,
                        "{endpoint} page_size={page_size} max={max}"
                    );
                    assert_eq!(ids(&listing.items), (0..expected as u64).collect::<Vec<_>>());
                }
            }
        }
    }

    #[tokio::test]
    async fn test_oversized_page_is_truncated() {
        // Server ignores `limit` and always answers with 100 items.
        let transport = ScriptedTransport::new(|_| {
            let items: Vec<Value> = (0..100).map(|i| json!({"id": i})).collect();
            Ok(ApiResponse::ok(json!({"items": items, "next_cursor": "more"})))
        });
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("issues").with_max_results(30);

        let listing = ResultStreamer::new(&transport, &config, request)
            .unwrap()
            .drain()
            .await;

        assert_eq!(listing.items.len(), 30);
        assert_eq!(transport.calls().len(), 1);
        assert!(matches!(
            listing.termination,
            Termination::Capped { max_results: 30 }
        ));
        assert!(listing.note().unwrap().contains("30"));
    }

    #[tokio::test]
    async fn test_capped_at_exact_page_boundary() {
        let transport = cursor_server(500);
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("issues")
            .with_page_size(100)
            .with_max_results(200);

        let listing = ResultStreamer::new(&transport, &config, request)
            .unwrap()
            .drain()
            .await;

        assert_eq!(listing.items.len(), 200);
        assert_eq!(transport.calls().len(), 2);
        assert!(matches!(listing.termination, Termination::Capped { .. }));
    }

    #[tokio::test]
    async fn test_partial_results_then_error() {
        let transport = ScriptedTransport::new(|call| match call.param("cursor") {
            None => Ok(ApiResponse::ok(
                json!({"items": [{"id": 0}, {"id": 1}], "next_cursor": "p2"}),
            )),
            Some(_) => Ok(ApiResponse::with_status(
                502,
                json!({"message": "upstream unavailable"}),
            )),
        });
        let config = PaginationConfig::builtin();

        let streamer =
            ResultStreamer::new(&transport, &config, ListRequest::new("issues")).unwrap();
        let results: Vec<Result<Value>> = streamer.into_stream().collect().await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap()["id"], 0);
        assert_eq!(results[1].as_ref().unwrap()["id"], 1);
        assert!(matches!(
            results[2],
            Err(TrackerError::ApiError {
                status_code: Some(502),
                ..
            })
        ));

        let listing = ResultStreamer::new(&transport, &config, ListRequest::new("issues"))
            .unwrap()
            .drain()
            .await;
        assert_eq!(listing.items.len(), 2);
        assert!(!listing.is_complete());
        assert!(listing.note().unwrap().contains("after 2 results"));
        assert!(listing.into_result().is_err());
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let transport = cursor_server(30);
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("issues").with_page_size(10);

        let streamer = ResultStreamer::new(&transport, &config, request).unwrap();
        let first_five: Vec<Result<Value>> = streamer.into_stream().take(5).collect().await;

        assert_eq!(first_five.len(), 5);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops_listing() {
        let transport = ScriptedTransport::new(|_| {
            Ok(ApiResponse::ok(
                json!({"items": [{"id": 1}], "next_cursor": "same"}),
            ))
        });
        let config = PaginationConfig::builtin();

        let listing = ResultStreamer::new(&transport, &config, ListRequest::new("issues"))
            .unwrap()
            .drain()
            .await;

        assert_eq!(transport.calls().len(), 2);
        assert_eq!(listing.items.len(), 2);
        assert!(listing.is_complete());
    }

    #[tokio::test]
    async fn test_interactive_pages_and_resume() {
        let transport = cursor_server(25);
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("issues").with_page_size(10);

        let mut streamer = ResultStreamer::new(&transport, &config, request.clone()).unwrap();
        let first = streamer.next_page().await.unwrap().unwrap();
        assert_eq!(first.len(), 10);
        let resume = first.next.clone().unwrap();
        assert!(matches!(&resume, PageState::Cursor(c) if c.token() == "10"));

        // A second process resumes with the printed token.
        let token = match &resume {
            PageState::Cursor(c) => c.token().to_string(),
            _ => unreachable!(),
        };
        let mut resumed = ResultStreamer::new(
            &transport,
            &config,
            request.starting_at(PageState::Cursor(Cursor::from_token(token))),
        )
        .unwrap();
        let second = resumed.next_page().await.unwrap().unwrap();
        assert_eq!(ids(&second.items), (10..20).collect::<Vec<_>>());
        let third = resumed.next_page().await.unwrap().unwrap();
        assert_eq!(third.len(), 5);
        assert!(third.next.is_none());
        assert!(resumed.next_page().await.unwrap().is_none());
        assert!(resumed.is_finished());
    }

    #[tokio::test]
    async fn test_offset_resume_shifts_ceiling() {
        let transport = offset_server(1000);
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("users")
            .with_page_size(50)
            .with_max_results(100)
            .starting_at(PageState::Offset { skip: 200 });

        let listing = ResultStreamer::new(&transport, &config, request)
            .unwrap()
            .drain()
            .await;

        assert_eq!(ids(&listing.items), (200..300).collect::<Vec<_>>());
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_offset_cap_keeps_resume_point() {
        let transport = offset_server(1000);
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("projects")
            .with_page_size(50)
            .with_max_results(75);

        let mut streamer = ResultStreamer::new(&transport, &config, request.clone()).unwrap();
        streamer.next_page().await.unwrap().unwrap();
        let last = streamer.next_page().await.unwrap().unwrap();
        assert_eq!(last.len(), 25);
        assert_eq!(last.next, Some(PageState::Offset { skip: 75 }));
        assert!(streamer.next_page().await.unwrap().is_none());

        let listing = ResultStreamer::new(&transport, &config, request)
            .unwrap()
            .drain()
            .await;
        assert!(matches!(
            listing.termination,
            Termination::Capped { max_results: 75 }
        ));

        // Nothing left past the cap: a short final page is not a resume point.
        let small = offset_server(75);
        let listing = ResultStreamer::new(
            &small,
            &config,
            ListRequest::new("projects").with_page_size(50).with_max_results(80),
        )
        .unwrap()
        .drain()
        .await;
        assert!(listing.is_complete());
    }

    #[tokio::test]
    async fn test_invalid_cursor_then_restart() {
        let transport = ScriptedTransport::new(|call| match call.param("cursor") {
            Some("stale") => Ok(ApiResponse::with_status(
                400,
                json!({"code": "invalid_cursor", "message": "cursor expired"}),
            )),
            _ => Ok(ApiResponse::ok(json!({"items": [{"id": 7}]}))),
        });
        let config = PaginationConfig::builtin();
        let request = ListRequest::new("issues")
            .starting_at(PageState::Cursor(Cursor::from_token("stale")));

        let mut streamer = ResultStreamer::new(&transport, &config, request).unwrap();
        let err = streamer.next_page().await.unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidCursor { ref endpoint } if endpoint == "issues"
        ));
        assert!(streamer.is_finished());

        streamer.restart();
        let page = streamer.next_page().await.unwrap().unwrap();
        assert_eq!(page.items[0]["id"], 7);
        assert_eq!(transport.calls()[1].param("cursor"), None);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_uses_offset_fallback() {
        let transport = offset_server(3);
        let config = PaginationConfig::builtin();

        let streamer =
            ResultStreamer::new(&transport, &config, ListRequest::new("projects/P1/milestones"))
                .unwrap();
        assert_eq!(streamer.strategy(), PaginationStrategy::Offset);
        assert_eq!(streamer.page_size(), 25);

        let listing = streamer.drain().await;
        assert_eq!(listing.items.len(), 3);
        let call = &transport.calls()[0];
        assert_eq!(call.method, Method::GET);
        assert_eq!(call.param("top"), Some("25"));
    }

    #[test]
    fn test_constructor_rejects_bad_requests() {
        let transport = offset_server(0);
        let config = PaginationConfig::builtin();

        let zero = ListRequest::new("issues").with_page_size(0);
        assert!(matches!(
            ResultStreamer::new(&transport, &config, zero),
            Err(TrackerError::InvalidArgument(_))
        ));

        let wrong_protocol =
            ListRequest::new("projects").starting_at(PageState::Cursor(Cursor::from_token("x")));
        assert!(matches!(
            ResultStreamer::new(&transport, &config, wrong_protocol),
            Err(TrackerError::InvalidArgument(_))
        ));
    }
}
