//! The credential boundary behind its HTTP routes.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{MockReply, MockUpstream, CRITICAL_VERDICT, LOW_VERDICT, TEST_CREDENTIAL};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use veria_gate::handlers;

const INTERNAL_HOST: &str = "screening-internal.veria.local";

fn router(upstream: &MockUpstream, timeout_secs: u64) -> Router {
    handlers::routes().with_state(Arc::new(upstream.boundary(timeout_secs)))
}

fn screen_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/screen")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn relays_verdict_unchanged() {
    for verdict in [LOW_VERDICT, CRITICAL_VERDICT] {
        let upstream = MockUpstream::start(MockReply::ok(verdict)).await;
        let (status, _, body) = send(router(&upstream, 5), screen_request(r#"{"address":"0xABC"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let relayed: Value = serde_json::from_str(&body).unwrap();
        let original: Value = serde_json::from_str(verdict).unwrap();
        assert_eq!(relayed, original);
        assert_eq!(upstream.calls(), 1);
    }
}

#[tokio::test]
async fn forwards_address_with_server_credential_only() {
    let upstream = MockUpstream::start(MockReply::ok(LOW_VERDICT)).await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/screen")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer caller-supplied-key")
        .body(Body::from(r#"{"address":"0xAbC123"}"#))
        .unwrap();
    let (status, _, _) = send(router(&upstream, 5), request).await;
    assert_eq!(status, StatusCode::OK);

    let forwarded = upstream.last_request().unwrap();
    assert_eq!(forwarded.authorization.unwrap(), format!("Bearer {TEST_CREDENTIAL}"));
    let body: Value = serde_json::from_slice(&forwarded.body).unwrap();
    assert_eq!(body, serde_json::json!({ "input": "0xAbC123" }));
}

#[tokio::test]
async fn missing_address_is_rejected_without_upstream_call() {
    let upstream = MockUpstream::start(MockReply::ok(LOW_VERDICT)).await;
    for body in ["{}", r#"{"address":null}"#, r#"{"address":7}"#, "garbage", ""] {
        let (status, _, response) = send(router(&upstream, 5), screen_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        let envelope: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(envelope["error"], "ValidationError");
        assert!(envelope["message"].is_string());
    }
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn upstream_failures_never_leak_credential_or_internals() {
    let bodies = [
        TEST_CREDENTIAL.to_string(),
        format!(r#"{{"error":"invalid key {TEST_CREDENTIAL}"}}"#),
        format!(r#"{{"message":"upstream {INTERNAL_HOST}:8443 refused","key":"{TEST_CREDENTIAL}"}}"#),
        format!(r#"{{"score":"{TEST_CREDENTIAL}","risk":"low","details":{{}}}}"#),
        format!(r#"{{"score":12,"risk":"{TEST_CREDENTIAL}","details":{{"sanctions_hit":false,"pep_hit":false,"watchlist_hit":false}}}}"#),
        format!("<html><body>502 from {INTERNAL_HOST}: Authorization: Bearer {TEST_CREDENTIAL}</body></html>"),
    ];
    let statuses = [200, 400, 401, 403, 404, 429, 500, 502, 503];

    let upstream = MockUpstream::start(MockReply::ok(LOW_VERDICT)).await;
    for status in statuses {
        for body in &bodies {
            upstream.set_reply(
                MockReply::status(status, body).with_header("x-debug-key", TEST_CREDENTIAL),
            );
            let (code, headers, response) =
                send(router(&upstream, 5), screen_request(r#"{"address":"0xABC"}"#)).await;

            assert!(!code.is_success(), "status {status} body {body} relayed as success");
            assert!(!response.contains(TEST_CREDENTIAL), "credential leaked: {response}");
            assert!(!response.contains(INTERNAL_HOST), "internal host leaked: {response}");
            for value in headers.values() {
                assert!(!value.to_str().unwrap_or_default().contains(TEST_CREDENTIAL));
            }

            let envelope: Value = serde_json::from_str(&response).unwrap();
            assert!(envelope["error"].is_string());
            assert!(envelope["message"].is_string());
        }
    }
}

#[tokio::test]
async fn error_kinds_and_statuses() {
    let cases = [
        (MockReply::status(401, "{}"), StatusCode::BAD_GATEWAY, "AuthError"),
        (MockReply::status(429, "{}").with_header("retry-after", "9"), StatusCode::TOO_MANY_REQUESTS, "RateLimited"),
        (MockReply::status(500, "{}"), StatusCode::BAD_GATEWAY, "ProtocolError"),
        (MockReply::ok(r#"{"score":1}"#), StatusCode::BAD_GATEWAY, "ProtocolError"),
    ];
    for (reply, expected_status, expected_kind) in cases {
        let upstream = MockUpstream::start(reply).await;
        let (status, headers, body) =
            send(router(&upstream, 5), screen_request(r#"{"address":"0xABC"}"#)).await;
        assert_eq!(status, expected_status);
        let envelope: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["error"], expected_kind);
        if expected_kind == "RateLimited" {
            assert_eq!(headers[header::RETRY_AFTER], "9");
        }
    }
}

#[tokio::test]
async fn upstream_timeout_is_gateway_timeout() {
    let upstream = MockUpstream::start(MockReply::ok(LOW_VERDICT).with_delay(Duration::from_secs(5))).await;
    let (status, _, body) = send(router(&upstream, 1), screen_request(r#"{"address":"0xABC"}"#)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    let envelope: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(envelope["error"], "NetworkError");
    assert_eq!(envelope["message"], "screening service timed out");
    assert!(!body.contains(TEST_CREDENTIAL));
}

#[tokio::test]
async fn health_and_version() {
    let upstream = MockUpstream::start(MockReply::ok(LOW_VERDICT)).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(router(&upstream, 5), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "healthy");

    let request = Request::builder().uri("/version").body(Body::empty()).unwrap();
    let (status, _, body) = send(router(&upstream, 5), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap()["version"],
        env!("CARGO_PKG_VERSION")
    );
    assert_eq!(upstream.calls(), 0);
}
