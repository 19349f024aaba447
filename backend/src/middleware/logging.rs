use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::request_id::RequestId;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 1024;

/// Logs every 4xx/5xx response together with its error body, so rejected
/// attendance events can be traced by request id. The body is buffered and
/// forwarded unchanged.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let latency_ms = start.elapsed().as_millis() as u64;
    let (mut parts, body) = response.into_parts();
    let (body, preview) = match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => {
            let preview = preview(&bytes);
            (Body::from(bytes), preview)
        }
        Err(err) => {
            parts.headers.remove(CONTENT_LENGTH);
            (Body::empty(), format!("<unreadable body: {}>", err))
        }
    };

    if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            %method,
            path = %path,
            request_id = %request_id,
            latency_ms,
            body = %preview,
            "Request completed with error status"
        );
    } else {
        tracing::warn!(
            status = status.as_u16(),
            %method,
            path = %path,
            request_id = %request_id,
            latency_ms,
            body = %preview,
            "Request completed with error status"
        );
    }

    Response::from_parts(parts, body)
}

fn preview(bytes: &Bytes) -> String {
    if bytes.len() > MAX_LOGGED_BODY_BYTES {
        format!(
            "{}... (truncated, {} bytes total)",
            String::from_utf8_lossy(&bytes[..MAX_LOGGED_BODY_BYTES]),
            bytes.len()
        )
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
