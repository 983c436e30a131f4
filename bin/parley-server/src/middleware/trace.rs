use std::time::Instant;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::json;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies above this size are never logged.
const MAX_LOGGED_BODY: usize = 1024;

/// Request bodies are buffered up to this size; larger ones get `413`.
pub const MAX_REQUEST_BODY: usize = 1024 * 1024;

/// Wrap each request in an `http_request` span carrying a trace id.
///
/// An incoming `x-trace-id` is reused when it is a valid UUID; otherwise a new
/// one is generated.  The id is echoed on the response.
pub async fn trace_middleware(req: Request, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("request started");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let mut response = match buffer_request(&parts.headers, body).await {
            Ok(req_bytes) => {
                let mut req = Request::from_parts(parts, Body::from(req_bytes));
                if let Some(value) = &header_value {
                    req.headers_mut().insert(X_TRACE_ID, value.clone());
                }
                let response = next.run(req).await;

                let (parts, body) = response.into_parts();
                let res_bytes = match body.collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => {
                        warn!(error = %e, "failed to buffer response body");
                        Bytes::new()
                    }
                };
                log_body("response", &parts.headers, &res_bytes);
                Response::from_parts(parts, Body::from(res_bytes))
            }
            Err(rejection) => rejection,
        };

        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "response finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Collect a request body of at most [`MAX_REQUEST_BODY`] bytes.
async fn buffer_request(headers: &HeaderMap, body: Body) -> Result<Bytes, Response> {
    let bytes = match Limited::new(body, MAX_REQUEST_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit = MAX_REQUEST_BODY, "request body too large");
            return Err(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {MAX_REQUEST_BODY} bytes"),
            ));
        }
        Err(e) => {
            warn!(error = %e, "failed to buffer request body");
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "failed to read request body".to_owned(),
            ));
        }
    };
    log_body("request", headers, &bytes);
    Ok(bytes)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Log a body at debug level when it is small JSON.
fn log_body(direction: &str, headers: &HeaderMap, bytes: &Bytes) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("application/json") && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(bytes) {
            debug!(direction, body = text, "body");
        }
    } else if !bytes.is_empty() {
        debug!(direction, content_type, size = bytes.len(), "body skipped");
    }
}
