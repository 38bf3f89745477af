//! Integration tests for the identity client against a local mock server.

use std::time::Duration;

use identity_client::{IdentityClient, IdentityError, PageRequest};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_body() -> serde_json::Value {
    json!({
        "Count": 120,
        "Results": [
            {
                "Details": {"Email": "ada@example.com", "Id": "u-1"},
                "Organizations": [
                    {"Organization": "org-a", "Permissions": ["read", "write"]},
                    {"Organization": "org-b", "Permissions": []}
                ]
            }
        ]
    })
}

#[tokio::test]
async fn test_list_users_sends_query_and_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/v3/users/"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "50"))
        .and(header("authorization", "bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = IdentityClient::new(Duration::from_secs(5)).unwrap();
    let request = PageRequest::new(server.uri(), "secret-token", 2, 50);

    let page = client.list_users(&request).await.unwrap();

    assert_eq!(page.count, 120);
    assert_eq!(page.results.len(), 1);
    let user = &page.results[0];
    assert_eq!(user.details.email, "ada@example.com");
    assert_eq!(user.details.id, "u-1");
    assert_eq!(user.organizations.len(), 2);
    assert_eq!(user.organizations[0].permissions, vec!["read", "write"]);
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/v3/users/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = IdentityClient::new(Duration::from_secs(5)).unwrap();
    let request = PageRequest::new(server.uri(), "t", 1, 50);

    let err = client.list_users(&request).await.unwrap_err();

    match &err {
        IdentityError::Api { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/v3/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = IdentityClient::new(Duration::from_secs(5)).unwrap();
    let request = PageRequest::new(server.uri(), "t", 1, 50);

    let err = client.list_users(&request).await.unwrap_err();
    assert!(matches!(err, IdentityError::Parse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/v3/users/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = IdentityClient::new(Duration::from_millis(50)).unwrap();
    let request = PageRequest::new(server.uri(), "t", 1, 50);

    let err = client.list_users(&request).await.unwrap_err();
    assert!(matches!(err, IdentityError::Network(_)), "got {:?}", err);
}
