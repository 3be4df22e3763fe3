//! Uniform outcome of a send attempt.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Status code for a successful non-HTTP send.
pub const STATUS_SUCCESS: i32 = 0;

/// Status code for a send the transport could not complete.
pub const STATUS_TRANSPORT_FAILURE: i32 = 1;

/// Result of publishing one message.
///
/// Email sends report `0` on success. Webhook sends report the HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationResponse {
    status_code: i32,
    response_content: String,
}

impl DestinationResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status_code: i32, response_content: impl Into<String>) -> Self {
        Self {
            status_code,
            response_content: response_content.into(),
        }
    }

    /// Successful send with `content` as the outcome text.
    #[must_use]
    pub fn success(content: impl Into<String>) -> Self {
        Self::new(STATUS_SUCCESS, content)
    }

    /// Failed send carrying the transport's error text.
    #[must_use]
    pub fn transport_failure(error: &TransportError) -> Self {
        Self::new(STATUS_TRANSPORT_FAILURE, error.to_string())
    }

    /// Status code.
    #[must_use]
    pub const fn status_code(&self) -> i32 {
        self.status_code
    }

    /// Human-readable outcome or error text.
    #[must_use]
    pub fn response_content(&self) -> &str {
        &self.response_content
    }

    /// True for status `0` or any 2xx HTTP status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_SUCCESS || (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let resp = DestinationResponse::success("Sent");
        assert_eq!(resp.status_code(), 0);
        assert_eq!(resp.response_content(), "Sent");
        assert!(resp.is_success());
    }

    #[test]
    fn test_transport_failure_keeps_text() {
        let err = TransportError::connection("Couldn't connect to host, port: localhost, 55555; timeout -1");
        let resp = DestinationResponse::transport_failure(&err);
        assert_eq!(resp.status_code(), STATUS_TRANSPORT_FAILURE);
        assert_eq!(
            resp.response_content(),
            "Couldn't connect to host, port: localhost, 55555; timeout -1"
        );
        assert!(!resp.is_success());
    }

    #[test]
    fn test_http_statuses() {
        assert!(DestinationResponse::new(204, "").is_success());
        assert!(!DestinationResponse::new(500, "boom").is_success());
        assert!(!DestinationResponse::new(301, "moved").is_success());
    }
}
