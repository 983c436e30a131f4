use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

/// CORS policy from `PARLEY_CORS_ORIGINS`.
///
/// Unset, or a list with no parseable origin, allows any origin.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .filter(|v: &HeaderValue| !v.is_empty())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

#[cfg(test)]
mod test {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    async fn allowed_origin(config: &Config, origin: &str) -> Option<String> {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(config));
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_owned())
    }

    #[tokio::test]
    async fn unset_origins_allow_any() {
        let origin = allowed_origin(&Config::default(), "http://elsewhere.test").await;
        assert_eq!(origin.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn listed_origins_are_enforced() {
        let config = Config {
            cors_allowed_origins: Some("http://a.test, http://b.test".into()),
            ..Config::default()
        };
        assert_eq!(
            allowed_origin(&config, "http://b.test").await.as_deref(),
            Some("http://b.test")
        );
        assert_eq!(allowed_origin(&config, "http://c.test").await, None);
    }
}
