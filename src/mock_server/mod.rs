//! Mock tracker API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the tracker
//! API for integration and end-to-end testing. Unlike wiremock which mocks at
//! the HTTP level per-test, this server maintains state across requests: cursor
//! tokens are bound to the query that issued them, created issues can be listed
//! and deleted again, and failures can be injected mid-listing or per title.
//!
//! # Example
//!
//! ```ignore
//! use trackapi::mock_server::MockServer;
//! use trackapi::{ListRequest, PaginationConfig, ResultStreamer, TrackerClient};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = TrackerClient::new("test-token", server.url()).unwrap();
//!     let config = PaginationConfig::default();
//!
//!     // Server comes with 250 issues across two projects
//!     let listing = ResultStreamer::new(&client, &config, ListRequest::new("issues"))
//!         .unwrap()
//!         .drain()
//!         .await;
//!     assert_eq!(listing.items.len(), 250);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures};
pub use server::MockServer;
pub use state::{CreateError, MockIssue, MockProject, MockState, MockUser};
