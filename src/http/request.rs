//! Request metadata extraction.
//!
//! Every request carries an `x-request-id` (set by the server's
//! request-id layer when the client sent none); handlers pull it with the
//! `RequestId` extractor to tag their log events.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::fmt;

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        Ok(RequestId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_header() {
        let (mut parts, _) = Request::builder()
            .header(X_REQUEST_ID, "req-42")
            .body(())
            .unwrap()
            .into_parts();
        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id, RequestId("req-42".to_string()));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let id = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.to_string(), "unknown");
    }
}
