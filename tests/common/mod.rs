#![allow(dead_code)]

//! In-process stand-in for the remote screening service.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use veria_gate::boundary::CredentialBoundary;
use veria_gate::handlers;
use veria_screening::{AuditLogger, Config, Credential, ScreeningClient, ServiceConfig};

pub const TEST_CREDENTIAL: &str = "sk_test_4f1c9b7e2d8a6035";

pub const LOW_VERDICT: &str = r#"{"score":12,"risk":"low","details":{"sanctions_hit":false,"pep_hit":false,"watchlist_hit":false}}"#;

pub const CRITICAL_VERDICT: &str = r#"{"score":91,"risk":"critical","chain":"ethereum","latency_ms":38,"details":{"sanctions_hit":true,"pep_hit":false,"watchlist_hit":true,"checked_lists":["ofac_sdn","eu_consolidated"],"address_type":"eoa"}}"#;

#[derive(Clone, Debug)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    pub headers: Vec<(&'static str, String)>,
}

impl MockReply {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
            headers: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub uri: String,
    pub body: Vec<u8>,
}

struct MockState {
    calls: AtomicUsize,
    reply: Mutex<MockReply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start(reply: MockReply) -> Self {
        let state = Arc::new(MockState {
            calls: AtomicUsize::new(0),
            reply: Mutex::new(reply),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/v1/screen", post(handle))
            .with_state(Arc::clone(&state));
        let addr = serve(app).await;
        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/v1/screen", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn set_reply(&self, reply: MockReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().unwrap().last().cloned()
    }

    pub fn service_config(&self, timeout_secs: u64) -> ServiceConfig {
        ServiceConfig {
            endpoint: self.endpoint(),
            timeout_secs,
        }
    }

    pub fn client(&self, timeout_secs: u64) -> ScreeningClient {
        ScreeningClient::new(&self.service_config(timeout_secs)).unwrap()
    }

    pub fn boundary(&self, timeout_secs: u64) -> CredentialBoundary {
        let config = Config {
            service: self.service_config(timeout_secs),
            ..Config::default()
        };
        CredentialBoundary::from_config(&config, credential()).unwrap()
    }

    pub fn boundary_with(&self, config: &Config) -> CredentialBoundary {
        CredentialBoundary::new(
            self.client(config.service.timeout_secs),
            credential(),
            config.gate,
            AuditLogger::new(config.audit.clone()),
        )
    }
}

pub fn credential() -> Credential {
    Credential::new(TEST_CREDENTIAL).unwrap()
}

async fn handle(State(state): State<Arc<MockState>>, headers: HeaderMap, uri: axum::http::Uri, body: Bytes) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(RecordedRequest {
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        uri: uri.to_string(),
        body: body.to_vec(),
    });

    let reply = state.reply.lock().unwrap().clone();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(reply.status).unwrap())
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in &reply.headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(Body::from(reply.body)).unwrap()
}

/// Serves `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Runs a boundary behind the real router, returning its base URL.
pub async fn serve_boundary(boundary: CredentialBoundary) -> url::Url {
    let app = handlers::routes().with_state(Arc::new(boundary));
    let addr = serve(app).await;
    url::Url::parse(&format!("http://{addr}/")).unwrap()
}
