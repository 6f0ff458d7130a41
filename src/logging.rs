//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::routing::MAX_UPLOAD_BYTES;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and the
/// full text is logged at the `debug` level. Multipart and other binary bodies, such
/// as receipt images, are only logged by size.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_UPLOAD_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("Could not read request body: {error}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };
    tracing::info!(
        "Received request: {parts:#?}\nbody: {}",
        describe_body(&parts.headers, &body_bytes)
    );

    let response = next
        .run(Request::from_parts(parts, Body::from(body_bytes)))
        .await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    tracing::info!(
        "Sending response: {parts:#?}\nbody: {}",
        describe_body(&parts.headers, &body_bytes)
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

fn describe_body(headers: &HeaderMap, body: &Bytes) -> String {
    if !is_text(headers) {
        return format!("<{} bytes>", body.len());
    }

    let text = String::from_utf8_lossy(body);
    if text.len() <= LOG_BODY_LENGTH_LIMIT {
        return format!("{text:?}");
    }

    tracing::debug!("Full body: {text:?}");
    let end = (0..=LOG_BODY_LENGTH_LIMIT)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or_default();

    format!("{}...", &text[..end])
}

fn is_text(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return true;
    };

    content_type.starts_with("text/")
        || content_type.starts_with("application/json")
        || content_type.starts_with("application/x-www-form-urlencoded")
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Bytes,
        http::{HeaderMap, HeaderValue, header::CONTENT_TYPE},
    };

    use super::{LOG_BODY_LENGTH_LIMIT, describe_body};

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn multipart_bodies_are_logged_by_size() {
        let body = Bytes::from_static(b"--boundary\r\nsecret image bytes");

        let got = describe_body(&headers("multipart/form-data; boundary=boundary"), &body);

        assert_eq!(got, format!("<{} bytes>", body.len()));
    }

    #[test]
    fn short_json_is_logged_in_full() {
        let got = describe_body(
            &headers("application/json"),
            &Bytes::from_static(br#"{"role":"admin"}"#),
        );

        assert_eq!(got, r#""{\"role\":\"admin\"}""#);
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let text = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let got = describe_body(&headers("text/plain"), &Bytes::from(text));

        assert!(got.ends_with("..."));
        assert!(got.len() <= LOG_BODY_LENGTH_LIMIT + 3);
    }
}
