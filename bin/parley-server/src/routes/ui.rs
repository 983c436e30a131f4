//! Browser UI served at `/`.
//!
//! The page is one minijinja template compiled into the binary.  All data is
//! fetched by the page's script from `/api/v1`; the server only injects the
//! API base URL and version.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use minijinja::{Environment, context};

use crate::error::ServerError;
use crate::state::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ServerError> {
    render_index(&state.config.api_base_url).map(Html)
}

fn render_index(api_base_url: &str) -> Result<String, ServerError> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)
        .map_err(|e| ServerError::Internal(format!("ui template: {e}")))?;
    let template = env
        .get_template("index.html")
        .map_err(|e| ServerError::Internal(format!("ui template: {e}")))?;
    template
        .render(context! {
            title => "parley",
            version => env!("CARGO_PKG_VERSION"),
            api_base_url => api_base_url.trim_end_matches('/'),
        })
        .map_err(|e| ServerError::Internal(format!("ui render: {e}")))
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;

    use super::*;
    use crate::config::Config;
    use crate::routes::test_support::{StubGenerator, TestApp, get};

    #[test]
    fn base_url_is_embedded_as_js_string() {
        let html = render_index("http://api.test/").expect("render");
        assert!(html.contains(r#"const API = "http://api.test" + "/api/v1";"#));
    }

    #[test]
    fn empty_base_url_means_same_origin() {
        let html = render_index("").expect("render");
        assert!(html.contains(r#"const API = "" + "/api/v1";"#));
    }

    #[tokio::test]
    async fn index_is_served_as_html() {
        let config = Config {
            api_base_url: "https://chat.example".into(),
            ..Config::default()
        };
        let app = TestApp::with_config(config, StubGenerator::replying("pong")).await;
        let (status, body) = app.call_raw(get("/")).await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).expect("utf8");
        assert!(html.contains("<title>parley</title>"));
        assert!(html.contains("https://chat.example"));
    }
}
