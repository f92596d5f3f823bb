//! HTTP API gateway for UHPM.
//!
//! Exposes the reasoning pipeline, the planner, direct research and the
//! memory store as JSON endpoints.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uhpm_agent::Services;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub services: Services,
}

pub type SharedState = Arc<GatewayState>;

/// Default request body limit.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// The ports and agents are built once here and shared by every request.
pub async fn start(config: uhpm_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let services = Services::from_config(&config)?;
    let state = Arc::new(GatewayState { services });
    let app = build_router(state, config.gateway.max_body_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
    msg: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        msg: "UHPM Agent API is running.",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;
    use uhpm_core::error::ProviderError;
    use uhpm_core::generation::GenerationPort;
    use uhpm_memory::InMemoryBackend;

    /// Replays canned replies in order; `None` once the script runs out.
    pub struct MockGenerator {
        replies: Mutex<VecDeque<String>>,
    }

    impl MockGenerator {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl GenerationPort for MockGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Option<String>, ProviderError> {
            Ok(self.replies.lock().unwrap().pop_front())
        }
    }

    /// Never answers.
    pub struct StalledGenerator;

    #[async_trait]
    impl GenerationPort for StalledGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Option<String>, ProviderError> {
            std::future::pending().await
        }
    }

    pub fn app_with(generator: Arc<dyn GenerationPort>, timeout: Duration) -> Router {
        let services = Services::new(generator, Arc::new(InMemoryBackend::new()), 3, timeout);
        build_router(Arc::new(GatewayState { services }), DEFAULT_BODY_LIMIT)
    }

    pub fn app(replies: &[&str]) -> Router {
        app_with(Arc::new(MockGenerator::new(replies)), Duration::from_secs(5))
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
