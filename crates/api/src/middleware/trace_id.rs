//! Request id propagation.
//!
//! Every request runs inside an `info_span` carrying its id, and the id is
//! echoed back in `X-Request-ID`.

use axum::{
    body::Body,
    http::{header::HeaderName, Extensions, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Longest client-supplied id that is reused; longer ones are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reuses a well-formed incoming id or generates a UUID v4.
fn resolve_request_id(incoming: Option<&HeaderValue>) -> String {
    incoming
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = resolve_request_id(req.headers().get(REQUEST_ID_HEADER));
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        user_id = tracing::field::Empty,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;

        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static("x-request-id"), value);
        }
        response
    }
    .instrument(span)
    .await
}

pub fn get_request_id(extensions: &Extensions) -> Option<&str> {
    extensions.get::<RequestId>().map(RequestId::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_id_reused() {
        let value = HeaderValue::from_static("req-123_abc.xyz");
        assert_eq!(resolve_request_id(Some(&value)), "req-123_abc.xyz");
    }

    #[test]
    fn test_missing_id_generates_uuid() {
        let id = resolve_request_id(None);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_blank_id_replaced() {
        let value = HeaderValue::from_static("   ");
        let id = resolve_request_id(Some(&value));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_oversized_id_replaced() {
        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        let value = HeaderValue::from_str(&long).unwrap();
        let id = resolve_request_id(Some(&value));
        assert_ne!(id, long);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_get_request_id() {
        let mut extensions = Extensions::new();
        assert_eq!(get_request_id(&extensions), None);

        extensions.insert(RequestId("my-request-id".to_string()));
        assert_eq!(get_request_id(&extensions), Some("my-request-id"));
    }
}
