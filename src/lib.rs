//! Issue tracker API client library.
//!
//! A Rust library for listing and bulk-mutating resources of a hosted issue
//! tracker. Two engines sit on top of a narrow [`Transport`] seam:
//!
//! - the **pagination engine** retrieves arbitrarily large result sets from
//!   endpoints that page either by opaque cursor or by numeric offset;
//! - the **batch engine** applies create/update operations from CSV, JSON or
//!   YAML files with dry-run, partial-failure handling and rollback.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use trackapi::{
//!     optimize_query, BatchEngine, BatchInput, BatchOptions, ListRequest, MutationTarget,
//!     OperationKind, PaginationConfig, ResourceKind, ResultStreamer, TrackerClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> trackapi::Result<()> {
//!     // Create client from environment variables
//!     let client = TrackerClient::from_env()?;
//!     let config = PaginationConfig::builtin();
//!
//!     // Stream open issues, fetching only the fields we display
//!     let params = optimize_query(
//!         &[("status".to_string(), "open".to_string())],
//!         &["title".to_string()],
//!         &[],
//!         Some(ResourceKind::Issue),
//!     );
//!     let request = ListRequest::new("issues").with_params(params).with_max_results(500);
//!     let mut issues = Box::pin(ResultStreamer::new(&client, &config, request)?.into_stream());
//!     while let Some(issue) = issues.next().await {
//!         println!("{}", issue?["title"]);
//!     }
//!
//!     // Preview a bulk create
//!     let input = BatchInput::load("new-issues.csv".as_ref(), OperationKind::Create)?;
//!     let engine = BatchEngine::new(
//!         &client,
//!         MutationTarget::default(),
//!         BatchOptions::default().dry_run(true),
//!     );
//!     if let Ok(run) = engine.run(&input).await {
//!         println!("{} records would be created", run.summary().would_apply);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `TRACKER_API_TOKEN` (required) - API token sent as a bearer token
//! - `TRACKER_API_URL` (optional) - Base URL (defaults to `https://tracker.example.com/api/v1`)
//! - `TRACKER_TIMEOUT_SECS` (optional) - Per-request timeout (defaults to 30)
//! - `TRACKER_MAX_RETRIES` (optional) - Retries for idempotent calls (defaults to 2)

mod client;
mod config;
mod error;
mod fields;
mod transport;

pub mod batch;
pub mod cli;
pub mod output;
pub mod pagination;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::TrackerClient;
pub use config::{
    ClientConfig, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, ENV_MAX_RETRIES,
    ENV_TIMEOUT, ENV_TOKEN, ENV_URL,
};
pub use error::{Result, TrackerError};
pub use transport::{ApiResponse, Method, Transport};

// Re-export field selection
pub use fields::{
    is_paging_param, optimize_query, query_signature, selected_fields, QueryParams, ResourceKind,
};

// Re-export pagination
pub use pagination::{
    Cursor, FetchOutcome, ListRequest, Listing, Page, PageState, PaginationConfig,
    PaginationStrategy, ResultStreamer, Termination,
};

// Re-export batch operations
pub use batch::{
    BatchAborted, BatchEngine, BatchInput, BatchOptions, BatchRecord, BatchRun, BatchSummary,
    MutationTarget, OperationKind, OperationOutcome, RecordStatus,
};
