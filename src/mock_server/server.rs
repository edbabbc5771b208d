//! Mock tracker API server.
//!
//! Provides an axum-based HTTP server that simulates the tracker API.

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers;
use super::state::MockState;

/// A mock tracker API server for testing.
///
/// The server runs in the background and can be used to test the tracker
/// client, the streamer and the batch engine against a stateful API.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with the default scenario.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Self::default_state()).await
    }

    /// Start a mock server with empty state.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Get the base URL of the mock server.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    fn default_state() -> MockState {
        Self::state_from_scenario(Fixtures::default_scenario())
    }

    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let mut state = MockState::new();
        state.projects = scenario.projects;
        state.users = scenario.users;
        for issue in scenario.issues {
            state.insert_issue(issue);
        }
        state
    }

    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            // Issues (cursor paged)
            .route("/issues", get(handlers::list_issues))
            .route(
                "/issues/:id",
                patch(handlers::update_issue).delete(handlers::delete_issue),
            )
            .route("/projects/:project/issues", post(handlers::create_issue))
            // Directories (offset paged)
            .route("/projects", get(handlers::list_projects))
            .route("/users", get(handlers::list_users))
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::batch::{BatchEngine, BatchInput, BatchOptions, MutationTarget, OperationKind};
    use crate::{ListRequest, PaginationConfig, ResultStreamer, Termination, TrackerClient};

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    async fn oneshot(state: MockState, request: Request<Body>) -> (StatusCode, Value) {
        let router = MockServer::create_router(state.shared());
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_router_pages_issues() {
        let state = MockState::new().with_issue(Fixtures::issue(1, "CORE", "a"));
        let state = Fixtures::issues(2, 4, "CORE")
            .into_iter()
            .fold(state, MockState::with_issue);

        let (status, body) = oneshot(state, get("/issues?limit=2&fields=title")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["items"][0], json!({"id": "ISS-1", "title": "a"}));
        assert_eq!(body["total"], 5);
        assert!(body["next_cursor"].is_string());
        assert!(body["prev_cursor"].is_null());
    }

    #[tokio::test]
    async fn test_router_rejects_foreign_cursor() {
        let (status, body) = oneshot(MockState::new(), get("/issues?cursor=2.0000")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_cursor");

        let (status, _) = oneshot(MockState::new(), get("/issues?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_router_create_errors() {
        let state = || MockState::new().with_project(Fixtures::project("CORE", "Core", "platform"));
        let post = |uri: &str, body: Value| {
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };

        let created = post("/projects/CORE/issues", json!({"title": "x"}));
        let (status, body) = oneshot(state(), created).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "ISS-1");

        let unknown = post("/projects/NOPE/issues", json!({"title": "x"}));
        let (status, _) = oneshot(state(), unknown).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = oneshot(state(), post("/projects/CORE/issues", json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "validation_failed");
    }

    #[tokio::test]
    async fn test_router_users_are_a_bare_array() {
        let state = (1..=5).map(Fixtures::user).fold(MockState::new(), MockState::with_user);

        let (status, body) = oneshot(state, get("/users?skip=3&top=10")).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["id"], "u4");
    }

    #[tokio::test]
    async fn test_router_list_failure_injection() {
        let state = MockState::new().with_list_failure_after(0);
        let (status, _) = oneshot(state, get("/projects")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_streams_issues_by_cursor() {
        let server = MockServer::start().await;
        let client = TrackerClient::new("test-token", server.url()).unwrap();
        let config = PaginationConfig::default();

        let request = ListRequest::new("issues")
            .with_page_size(40)
            .with_max_results(1000);
        let listing = ResultStreamer::new(&client, &config, request)
            .unwrap()
            .drain()
            .await;

        assert!(listing.is_complete());
        assert_eq!(listing.items.len(), 250);
        assert_eq!(listing.pages, 7);
        assert_eq!(listing.items[249]["id"], "ISS-250");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_streams_projects_by_offset() {
        let state = MockState::new();
        let state = Fixtures::numbered_projects(23)
            .into_iter()
            .fold(state, MockState::with_project);
        let server = MockServer::with_state(state).await;
        let client = TrackerClient::new("test-token", server.url()).unwrap();
        let config = PaginationConfig::default();

        let request = ListRequest::new("projects")
            .with_page_size(10)
            .with_max_results(15);
        let listing = ResultStreamer::new(&client, &config, request)
            .unwrap()
            .drain()
            .await;

        assert_eq!(listing.items.len(), 15);
        assert!(matches!(listing.termination, Termination::Capped { max_results: 15 }));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_batch_create_against_server() {
        let state = MockState::new().with_project(Fixtures::project("CORE", "Core", "platform"));
        let server = MockServer::with_state(state).await;
        let client = TrackerClient::new("test-token", server.url()).unwrap();

        let input = BatchInput::from_json_str(
            r#"[{"project": "CORE", "title": "One"}, {"project": "CORE", "summary": "Two"}]"#,
            OperationKind::Create,
        )
        .unwrap();
        let engine = BatchEngine::new(&client, MutationTarget::default(), BatchOptions::default());
        let run = engine.run(&input).await.unwrap();

        assert!(run.summary().is_clean());
        assert_eq!(run.ledger.len(), 2);
        assert_eq!(server.state().read().await.issues[1].title, "Two");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_required_token() {
        let server = MockServer::with_state(MockState::new().with_required_token("secret")).await;
        let client = TrackerClient::new("wrong", server.url()).unwrap();
        let config = PaginationConfig::default();

        let listing = ResultStreamer::new(&client, &config, ListRequest::new("issues"))
            .unwrap()
            .drain()
            .await;

        assert!(matches!(
            listing.termination,
            Termination::Failed(crate::TrackerError::PermissionDenied {
                status_code: 401,
                ..
            })
        ));

        server.shutdown().await;
    }
}
