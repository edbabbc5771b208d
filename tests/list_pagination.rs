//! Listing tests against a mocked tracker API.
//!
//! Uses wiremock to check what the streamer actually puts on the wire.

use futures::StreamExt;
use serde_json::json;
use trackapi::{
    optimize_query, ClientConfig, ListRequest, PageState, PaginationConfig, ResourceKind,
    ResultStreamer, Termination, TrackerClient, TrackerError,
};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issues(range: std::ops::Range<u32>) -> Vec<serde_json::Value> {
    range
        .map(|n| json!({"id": format!("ISS-{n}"), "title": format!("Issue {n}")}))
        .collect()
}

fn no_retry_client(server: &MockServer) -> TrackerClient {
    TrackerClient::with_config(ClientConfig::new("test-token", server.uri()).with_max_retries(0))
        .unwrap()
}

#[tokio::test]
async fn test_cursor_listing_follows_next_cursor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param_is_missing("cursor"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": issues(1..3),
            "next_cursor": "c2",
            "total": 5
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": issues(3..5),
            "next_cursor": "c3",
            "prev_cursor": "c1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("cursor", "c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": issues(5..6),
            "next_cursor": null
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrackerClient::new("test-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();
    let request = ListRequest::new("issues").with_page_size(2);

    let listing = ResultStreamer::new(&client, &config, request)
        .unwrap()
        .drain()
        .await;

    assert!(listing.is_complete());
    assert_eq!(listing.pages, 3);
    let ids: Vec<_> = listing.items.iter().map(|i| i["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["ISS-1", "ISS-2", "ISS-3", "ISS-4", "ISS-5"]);
}

#[tokio::test]
async fn test_offset_listing_stops_at_max_results() {
    let mock_server = MockServer::start().await;

    let projects: Vec<_> = (0..100).map(|n| json!({"id": format!("prj-{n}")})).collect();

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("skip", "0"))
        .and(query_param("top", "100"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"items": projects, "total": 1000})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("skip", "100"))
        .and(query_param("top", "20"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": &projects[..20], "total": 1000})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrackerClient::new("test-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();
    let request = ListRequest::new("projects").with_max_results(120);

    let listing = ResultStreamer::new(&client, &config, request)
        .unwrap()
        .drain()
        .await;

    assert_eq!(listing.items.len(), 120);
    assert!(matches!(
        listing.termination,
        Termination::Capped { max_results: 120 }
    ));
    assert!(listing.note().unwrap().contains("--max-results"));
}

#[tokio::test]
async fn test_offset_listing_accepts_bare_array() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "u1", "name": "Kim"},
            {"id": "u2", "name": "Ana"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrackerClient::new("test-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();

    let items = ResultStreamer::new(&client, &config, ListRequest::new("users"))
        .unwrap()
        .drain()
        .await
        .into_result()
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["name"], "Ana");
}

#[tokio::test]
async fn test_field_selection_goes_on_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("fields", "id,title"))
        .and(query_param("status", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": issues(1..2),
            "next_cursor": null
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = optimize_query(
        &[("status".to_string(), "open".to_string())],
        &["title".to_string()],
        &[],
        Some(ResourceKind::Issue),
    );

    let client = TrackerClient::new("test-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();
    let request = ListRequest::new("issues").with_params(params);

    let listing = ResultStreamer::new(&client, &config, request)
        .unwrap()
        .drain()
        .await;

    assert!(listing.is_complete());
    assert_eq!(listing.items.len(), 1);
}

#[tokio::test]
async fn test_server_error_keeps_partial_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": issues(1..11),
            "next_cursor": "c2"
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("cursor", "c2"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "database unavailable"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = no_retry_client(&mock_server);
    let config = PaginationConfig::builtin();
    let request = ListRequest::new("issues").with_page_size(10);

    let listing = ResultStreamer::new(&client, &config, request)
        .unwrap()
        .drain()
        .await;

    assert!(!listing.is_complete());
    assert_eq!(listing.items.len(), 10);
    assert!(matches!(
        listing.termination,
        Termination::Failed(TrackerError::ApiError { .. })
    ));
    let note = listing.note().unwrap();
    assert!(note.contains("stopped after 10 results"));
    assert!(note.contains("database unavailable"));
}

#[tokio::test]
async fn test_rejected_cursor_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("cursor", "stale"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "invalid_cursor",
            "message": "cursor expired"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrackerClient::new("test-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();
    let request = ListRequest::new("issues")
        .starting_at(PageState::Cursor(trackapi::Cursor::from_token("stale")));

    let listing = ResultStreamer::new(&client, &config, request)
        .unwrap()
        .drain()
        .await;

    assert!(listing.items.is_empty());
    assert!(matches!(
        listing.termination,
        Termination::Failed(TrackerError::InvalidCursor { .. })
    ));
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": issues(1..4),
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Never requested: the consumer stops inside the first page.
    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = TrackerClient::new("test-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();
    let request = ListRequest::new("issues").with_page_size(3);

    let stream = ResultStreamer::new(&client, &config, request)
        .unwrap()
        .into_stream();
    let first_two: Vec<_> = stream.take(2).collect().await;

    assert_eq!(first_two.len(), 2);
    assert_eq!(first_two[1].as_ref().unwrap()["id"], "ISS-2");
}

#[tokio::test]
async fn test_unauthorized_maps_to_permission_denied() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad token"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TrackerClient::new("wrong-token", &mock_server.uri()).unwrap();
    let config = PaginationConfig::builtin();

    let result = ResultStreamer::new(&client, &config, ListRequest::new("projects"))
        .unwrap()
        .drain()
        .await
        .into_result();

    assert!(matches!(
        result,
        Err(TrackerError::PermissionDenied {
            status_code: 401,
            ..
        })
    ));
}
