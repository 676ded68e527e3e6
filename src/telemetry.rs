//! Logging setup shared by the server and the CLI.
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).
//! HTTP request spans carry the service name and version.

use axum::body::Body;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing::Span;
use tracing_subscriber::{fmt, EnvFilter};

pub struct Telemetry {
    name: &'static str,
    version: &'static str,
    default_filter: &'static str,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            name: "veria-gate",
            version: "unknown",
            default_filter: "info",
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn with_default_filter(mut self, filter: &'static str) -> Self {
        self.default_filter = filter;
        self
    }

    /// Installs the global subscriber. A second call is a no-op.
    pub fn register(self) -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_filter));
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(service = self.name, version = self.version, "Telemetry registered");
        }
        self
    }

    pub fn http_tracing(
        &self,
    ) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, impl Fn(&Request<Body>) -> Span + Clone> {
        let (name, version) = (self.name, self.version);
        TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                service = name,
                version = version,
                method = %request.method(),
                path = %request.uri().path(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_service_identity() {
        let telemetry = Telemetry::new()
            .with_name("veria-test")
            .with_version("9.9.9")
            .with_default_filter("warn");
        assert_eq!(telemetry.name, "veria-test");
        assert_eq!(telemetry.version, "9.9.9");
        assert_eq!(telemetry.default_filter, "warn");
    }

    #[tokio::test]
    async fn request_spans_layer_onto_router() {
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::Router;
        use tower::ServiceExt;

        let telemetry = Telemetry::new().with_name("veria-test").with_version("9.9.9");
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(telemetry.http_tracing());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
