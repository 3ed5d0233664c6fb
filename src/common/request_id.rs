//! Request tracing helpers for RPC handlers
//!
//! - Unique request ID per call (taken from metadata or generated)
//! - One span per call carrying method and request ID

use tonic::Request;
use tracing::Span;
use uuid::Uuid;

/// Metadata key for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Request ID supplied by the caller, or a fresh one.
pub fn request_id<T>(request: &Request<T>) -> String {
    request
        .metadata()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(generate_request_id)
}

pub fn rpc_span(method: &'static str, request_id: &str) -> Span {
    tracing::info_span!("rpc", method = method, request_id = %request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_from_metadata() {
        let mut req = Request::new(());
        req.metadata_mut()
            .insert(REQUEST_ID_HEADER, "abc-123".parse().unwrap());
        assert_eq!(request_id(&req), "abc-123");
    }

    #[test]
    fn test_request_id_generated() {
        let req = Request::new(());
        let id = request_id(&req);
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, request_id(&req));
    }
}
