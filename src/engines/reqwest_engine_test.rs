// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::engines::traits::NetworkSession;
use std::collections::BTreeMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings(ip_check_url: String) -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        ip_check_url,
        ..HttpSettings::default()
    }
}

fn test_profile() -> IdentityProfile {
    let mut headers = BTreeMap::new();
    // wiremock's header matcher splits values on commas
    headers.insert("Accept-Language".to_string(), "de".to_string());
    IdentityProfile {
        name: "Test Browser".to_string(),
        user_agent: "TestAgent/1.0".to_string(),
        headers,
    }
}

#[tokio::test]
async fn test_fetch_sends_profile_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("user-agent", "TestAgent/1.0"))
        .and(header("accept-language", "de"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("server", "nginx")
                .set_body_string("<html><body>Test content</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::direct(&test_settings(server.uri())).unwrap();
    let page = client
        .fetch(&format!("{}/page", server.uri()), &test_profile())
        .await
        .unwrap();

    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("Test content"));
    assert_eq!(page.content_type.as_deref(), Some("text/html"));
    assert_eq!(page.server.as_deref(), Some("nginx"));
}

#[tokio::test]
async fn test_fetch_non_success_status_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let client = FetchClient::direct(&test_settings(server.uri())).unwrap();
    let page = client
        .fetch(&format!("{}/missing", server.uri()), &test_profile())
        .await
        .unwrap();

    assert_eq!(page.status_code, 404);
    assert_eq!(page.body, "not here");
}

#[tokio::test]
async fn test_fetch_connection_refused_is_an_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = FetchClient::direct(&HttpSettings::default()).unwrap();
    let result = client
        .fetch(&format!("http://{}/", addr), &test_profile())
        .await;

    assert!(matches!(result, Err(EngineError::RequestFailed(_))));
}

#[tokio::test]
async fn test_exit_address_trims_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7\n"))
        .mount(&server)
        .await;

    let client = FetchClient::direct(&test_settings(server.uri())).unwrap();
    assert_eq!(client.exit_address().await.unwrap(), "203.0.113.7");
}

#[tokio::test]
async fn test_exit_address_through_session_fetcher() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(" 198.51.100.4 "))
        .expect(1)
        .mount(&server)
        .await;

    let session = NetworkSession {
        proxy: ProxyEndpoint::new("127.0.0.1", 9050),
        fetcher: std::sync::Arc::new(FetchClient::direct(&test_settings(server.uri())).unwrap()),
    };
    assert_eq!(session.fetcher.exit_address().await.unwrap(), "198.51.100.4");
}
