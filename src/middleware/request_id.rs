//! Request ID middleware for request correlation.
//!
//! Generates or propagates a unique request ID for each request, records
//! HTTP metrics, and stamps error bodies with the request path.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::metrics;

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Extension containing the request ID for the current request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Middleware that adds a request ID to each request.
///
/// If the request already has an X-Request-Id header, it's used.
/// Otherwise, a new UUID is generated.
///
/// Error responses (4xx/5xx with a JSON error body) get their `description`
/// set to `uri=<request path>` when the handler left it empty.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| RequestId(s.to_string()))
        .unwrap_or_else(RequestId::new);

    req.extensions_mut().insert(request_id.clone());

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start_time = Instant::now();
    let response = next.run(req).instrument(span).await;
    metrics::record_http_request(
        &method,
        &route,
        response.status().as_u16(),
        start_time.elapsed().as_secs_f64(),
    );

    let mut response = inject_description_into_error(response, &path).await;

    if let Ok(value) = request_id.0.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Fill `description` in JSON error bodies.
///
/// Only bodies that look like an error message (an object carrying
/// `statusCode`) and have no description yet are touched.
async fn inject_description_into_error(response: Response, path: &str) -> Response {
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return (parts, Body::empty()).into_response(),
    };

    let modified_bytes = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut json) => {
            match json.as_object_mut() {
                Some(obj)
                    if obj.contains_key("statusCode")
                        && obj.get("description").is_none_or(|d| d.is_null()) =>
                {
                    obj.insert(
                        "description".to_string(),
                        serde_json::Value::String(format!("uri={}", path)),
                    );
                    serde_json::to_vec(&json).unwrap_or_else(|_| bytes.to_vec())
                }
                _ => bytes.to_vec(),
            }
        }
        Err(_) => bytes.to_vec(),
    };

    // The body length changed; let hyper recompute it.
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(modified_bytes))
}
