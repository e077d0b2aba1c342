//! Request forwarding handlers.
//!
//! A single upstream round trip per request: the incoming method, path,
//! query, headers, and body are replayed against the backend origin and
//! the upstream response is relayed back. Hop-by-hop headers are dropped
//! in both directions.

use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::ProxyConfig;

/// Headers never forwarded to the upstream. `host` must name the backend,
/// not the proxy, and reqwest sets it from the target URL.
/// `accept-encoding` stays out so the backend never compresses: the proxy
/// relays bodies as-is and must not hand the client gzip bytes while the
/// `content-encoding` header is stripped below.
const SKIP_UPSTREAM_HEADERS: &[&str] = &["host", "content-length", "accept-encoding"];

/// Headers never relayed back to the client. The proxy re-frames the
/// body itself, so upstream framing and encoding metadata would lie.
const SKIP_DOWNSTREAM_HEADERS: &[&str] = &[
    "content-encoding",
    "transfer-encoding",
    "content-length",
    "connection",
];

/// Shared proxy state: one pooled HTTP client plus the loaded config.
#[derive(Clone)]
pub struct ProxyState {
    pub http: reqwest::Client,
    pub config: ProxyConfig,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

/// Forward an `/api/**` request to the backend verbatim.
///
/// Upstream failures are translated rather than propagated as a hung
/// connection: connect errors become 502, timeouts become 504, both with
/// a JSON body the client-side error path understands.
pub async fn forward_api(State(state): State<ProxyState>, req: Request) -> Response {
    match forward(&state, req).await {
        Ok(response) => response,
        Err(err) => {
            let (status, message) = classify_upstream_error(&err);
            tracing::warn!(status = %status, error = %err, "Upstream request failed");
            (status, axum::Json(json!({ "error": message }))).into_response()
        }
    }
}

/// Forward a `/generated/**` asset request to the backend.
///
/// Routed for GET and HEAD only. Asset fetch failures collapse to a
/// plain-text 502 since the response is consumed by `<img>` tags, not
/// the API client.
pub async fn forward_generated(State(state): State<ProxyState>, req: Request) -> Response {
    match forward(&state, req).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "Generated asset fetch failed");
            (StatusCode::BAD_GATEWAY, "Failed to load generated asset").into_response()
        }
    }
}

/// Replay `req` against the backend and rebuild the upstream response.
async fn forward(state: &ProxyState, req: Request) -> Result<Response, reqwest::Error> {
    let method = req.method().clone();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let url = format!("{}{}", state.config.backend_url, path_and_query);

    let headers = upstream_headers(req.headers());

    // Buffering the body is fine here: request payloads are JSON answers
    // and form fields, never large uploads.
    let body = match axum::body::to_bytes(req.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read request body");
            return Ok((
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "error": "Failed to read request body" })),
            )
                .into_response());
        }
    };

    let upstream = state
        .http
        .request(method, &url)
        .headers(headers)
        .body(body)
        .timeout(Duration::from_secs(state.config.upstream_timeout_secs))
        .send()
        .await?;

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if SKIP_DOWNSTREAM_HEADERS.contains(&name.as_str()) {
            continue;
        }
        // append, not insert: upstream may emit repeated headers
        // (set-cookie in particular) and all of them must survive.
        response_headers.append(name.clone(), value.clone());
    }

    let bytes = upstream.bytes().await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

/// Copy request headers for the upstream call, dropping the skip list.
fn upstream_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in incoming {
        if SKIP_UPSTREAM_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Map a reqwest failure to the status and message the client sees.
fn classify_upstream_error(err: &reqwest::Error) -> (StatusCode, &'static str) {
    if err.is_timeout() {
        (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out")
    } else if err.is_connect() {
        (StatusCode::BAD_GATEWAY, "Failed to reach backend")
    } else {
        (StatusCode::BAD_GATEWAY, "Upstream request failed")
    }
}
