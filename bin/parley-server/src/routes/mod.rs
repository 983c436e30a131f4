//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI document (disable with `PARLEY_ENABLE_SWAGGER=false`)
//! - Health route
//! - `/api/v1` user and conversation routes
//! - The browser UI at `/`

pub mod doc;
mod health;
mod ui;
mod v1;

use std::sync::Arc;

use axum::{Router, middleware};
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(ui::router())
        .nest("/api/v1", v1::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state.config)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use parley_core::{Database, GenerationError, Generator, Message, UserProfile};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::state::AppState;

    /// Generator with a canned outcome.
    pub(crate) struct StubGenerator {
        outcome: Result<String, GenerationError>,
    }

    impl StubGenerator {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                outcome: Ok(reply.to_owned()),
            }
        }

        pub(crate) fn failing(error: GenerationError) -> Self {
            Self { outcome: Err(error) }
        }
    }

    #[async_trait]
    impl Generator for StubGenerator {
        async fn invoke(
            &self,
            _messages: &[Message],
            _profile: &UserProfile,
        ) -> Result<String, GenerationError> {
            self.outcome.clone()
        }
    }

    /// Full router over a throwaway SQLite file.
    pub(crate) struct TestApp {
        pub(crate) state: Arc<AppState>,
        router: Router,
        _dir: TempDir,
    }

    impl TestApp {
        /// Model replies are always `"pong"`.
        pub(crate) async fn new() -> Self {
            Self::with_generator(StubGenerator::replying("pong")).await
        }

        pub(crate) async fn with_generator(generator: StubGenerator) -> Self {
            Self::with_config(Config::default(), generator).await
        }

        pub(crate) async fn with_config(config: Config, generator: StubGenerator) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let url = format!("sqlite://{}?mode=rwc", dir.path().join("parley.db").display());
            let store = Database::new(url);
            store.ensure_schema().await.expect("schema");

            let state = Arc::new(AppState {
                config: Arc::new(config),
                store: Arc::new(store),
                generator: Arc::new(generator),
            });
            let router = super::build(Arc::clone(&state));
            Self {
                state,
                router,
                _dir: dir,
            }
        }

        /// Send one request; the body is parsed as JSON, or `Value::Null` if it is not JSON.
        pub(crate) async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
            let (status, bytes) = self.call_raw(req).await;
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }

        pub(crate) async fn call_raw(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
            let response = self
                .router
                .clone()
                .oneshot(req)
                .await
                .expect("infallible router");
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .expect("body")
                .to_bytes();
            (status, bytes.to_vec())
        }
    }

    pub(crate) fn get(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request")
    }

    pub(crate) fn post_json(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }
}
