//! Wire-level tests for file-defined endpoints: selection semantics, error
//! envelopes and the exact diagnostic messages.

use assert_json_diff::assert_json_eq;
use mockfile::MockServer;
use serde_json::{json, Value};

fn server() -> MockServer {
    MockServer::builder()
        .mock_file("testfiles/mock.yaml")
        .start()
        .unwrap()
}

#[tokio::test]
async fn unregistered_endpoints_return_404_with_the_error_envelope() {
    // Arrange
    let mock_server = server();

    // Act
    let response = reqwest::get(format!("{}/missing", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 404);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/json"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Endpoint '/missing:GET' not found");
}

#[tokio::test]
async fn known_path_with_unknown_method_returns_404() {
    // Arrange
    let mock_server = server();

    // Act - /endpoint1 only defines GET
    let response = reqwest::Client::new()
        .delete(format!("{}/endpoint1", mock_server.uri()))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Endpoint '/endpoint1:DELETE' not found");
}

#[tokio::test]
async fn no_match_reports_the_attempted_queries() {
    // Arrange
    let mock_server = server();

    // Act - the only candidate requires name = 'John'
    let response = reqwest::get(format!("{}/endpoint1", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "No response matches for endpoint '/endpoint1': Queries: URL[name = 'John']"
    );
}

#[tokio::test]
async fn url_query_selects_the_configured_response() {
    // Arrange
    let mock_server = server();

    // Act
    let response = reqwest::get(format!("{}/endpoint1?name=John", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["testKey1"], "testValue1");
    assert_eq!(body["testKey2"], "testValue2");
}

#[tokio::test]
async fn body_queries_select_among_post_candidates() {
    // Arrange
    let mock_server = server();
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/orders", mock_server.uri()))
        .body(r#"{"kind":"b"}"#)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 202);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["created"], "b");
}

#[tokio::test]
async fn unmatched_body_queries_fall_back_to_the_unconditional_candidate() {
    // Arrange
    let mock_server = server();
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/orders", mock_server.uri()))
        .body(r#"{"kind":"zzz"}"#)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "unknown kind");
}

#[tokio::test]
async fn body_queries_are_never_evaluated_for_get_requests() {
    // Arrange
    let mock_server = server();
    let client = reqwest::Client::new();

    // Act - the body would satisfy the candidate's body query, but GET
    // requests skip body queries entirely.
    let response = client
        .get(format!("{}/bodyguard", mock_server.uri()))
        .body(r#"{"kind":"a"}"#)
        .send()
        .await
        .unwrap();

    // Assert - no candidate left, and no query was attempted either.
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "No response matches for endpoint '/bodyguard': Queries: "
    );
}

#[tokio::test]
async fn the_last_unconditional_candidate_is_the_fallback() {
    // Arrange - /fallbacks is [unconditional, guarded, unconditional]
    let mock_server = server();

    // Act
    let response = reqwest::get(format!("{}/fallbacks", mock_server.uri()))
        .await
        .unwrap();

    // Assert - the later unconditional entry overwrites the earlier one.
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "fallback": "last" }));
}

#[tokio::test]
async fn a_matching_predicate_beats_any_fallback() {
    // Arrange
    let mock_server = server();

    // Act
    let response = reqwest::get(format!("{}/fallbacks?name=Jane", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "matched": "jane" }));
}

#[tokio::test]
async fn configured_bodies_round_trip_structurally() {
    // Arrange
    let mock_server = server();

    // Act
    let response = reqwest::get(format!("{}/roundtrip", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_json_eq!(
        body,
        json!({
            "items": [1, 2, 3],
            "nested": { "a": null, "b": true, "c": 1.5 },
            "s": "x"
        })
    );
}

#[tokio::test]
async fn identical_requests_yield_identical_responses() {
    // Arrange
    let mock_server = server();
    let url = format!("{}/endpoint1?name=John", mock_server.uri());

    // Act
    let first = reqwest::get(&url).await.unwrap();
    let first_status = first.status();
    let first_body: Value = first.json().await.unwrap();
    let second = reqwest::get(&url).await.unwrap();

    // Assert
    assert_eq!(first_status, second.status());
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn malformed_query_expressions_surface_as_500() {
    // Arrange
    let mock_server = server();

    // Act
    let response = reqwest::get(format!("{}/broken", mock_server.uri()))
        .await
        .unwrap();

    // Assert - a configuration defect, not a routing miss.
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Could not parse URL query for endpoint '/broken'"
    );
}

#[tokio::test]
async fn json_mock_files_are_supported() {
    // Arrange
    let mock_server = MockServer::builder()
        .mock_file("testfiles/mock.json")
        .start()
        .unwrap();

    // Act
    let response = reqwest::get(format!("{}/endpoint1?name=John", mock_server.uri()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["testKey1"], "testValue1");
}

#[tokio::test]
async fn runs_on_the_provided_listener() {
    // Arrange
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let expected_address = listener.local_addr().unwrap();

    // Act
    let mock_server = MockServer::builder()
        .mock_file("testfiles/mock.yaml")
        .listener(listener)
        .start()
        .unwrap();

    // Assert
    assert_eq!(&expected_address, mock_server.address());
    let response = reqwest::get(format!("{}/fallbacks", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn two_servers_coexist_without_interference() {
    // Arrange
    let file_server = MockServer::builder()
        .mock_file("testfiles/mock.yaml")
        .start()
        .unwrap();
    let empty_server = MockServer::builder().start().unwrap();
    assert_ne!(file_server.address(), empty_server.address());

    // Act + Assert - the endpoint exists on one instance only.
    let served = reqwest::get(format!("{}/fallbacks", file_server.uri()))
        .await
        .unwrap();
    assert_eq!(served.status(), 200);

    let missing = reqwest::get(format!("{}/fallbacks", empty_server.uri()))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}
