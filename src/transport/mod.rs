//! Pluggable conversion transports
//!
//! A real multipart upload ([`HttpTransport`]) and a timer-driven local mode
//! ([`SimulatedTransport`]) are interchangeable implementations of the same
//! phase-based progress contract, so tests and demo setups can substitute a
//! deterministic transport without touching the orchestrator.

mod http;
mod simulated;

pub use http::HttpTransport;
pub use simulated::{SimulatedReply, SimulatedTransport};

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::types::ConversionRequest;

/// Byte-level upload progress callback: `(bytes_sent, bytes_total)`
pub type UploadProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// One-shot transfer of a conversion request to the backend
#[async_trait]
pub trait ConversionTransport: Send + Sync {
    /// Transfer the request and return the backend's raw reply
    ///
    /// Implementations report upload progress through `progress` (zero or
    /// more calls, bytes non-decreasing) and must abort promptly when
    /// `cancel` fires, returning [`TransportError::Aborted`]. Transport-level
    /// failures (refused connection, timeout) are errors; a non-success
    /// status from the backend is a normal reply, not an error.
    async fn submit(
        &self,
        request: &ConversionRequest,
        progress: UploadProgressFn,
        cancel: CancellationToken,
    ) -> Result<TransportReply, TransportError>;
}

/// Raw reply from the conversion backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportReply {
    /// HTTP status code (or transport-equivalent)
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportReply {
    /// Whether the status is in the 2xx success range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body into the expected response shape
    pub fn parse_body(&self) -> Option<ResponseBody> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Success-response body shape of the conversion backend
///
/// The backend may name the artifact URL `fileUrl`, `downloadUrl`, or `url`;
/// all three are modeled as optional fields and resolved through an explicit,
/// ordered fallback rather than duck-typed probing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    /// Primary artifact URL field
    #[serde(default)]
    pub file_url: Option<String>,
    /// First fallback for the artifact URL
    #[serde(default)]
    pub download_url: Option<String>,
    /// Second fallback for the artifact URL
    #[serde(default)]
    pub url: Option<String>,
    /// Server-supplied output filename; overrides the derived name
    #[serde(default)]
    pub file_name: Option<String>,
    /// Marks the artifact URL as session-scoped; such URLs must be released
    /// after use (default: durable)
    #[serde(default)]
    pub temporary: bool,
}

impl ResponseBody {
    /// Resolve the artifact URL with the fixed fallback order:
    /// `fileUrl` → `downloadUrl` → `url`
    pub fn artifact_url(&self) -> Option<&str> {
        self.file_url
            .as_deref()
            .or(self.download_url.as_deref())
            .or(self.url.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fallback_order_prefers_file_url() {
        let body: ResponseBody = serde_json::from_str(
            r#"{"fileUrl": "https://x/a", "downloadUrl": "https://x/b", "url": "https://x/c"}"#,
        )
        .unwrap();
        assert_eq!(body.artifact_url(), Some("https://x/a"));
    }

    #[test]
    fn fallback_order_then_download_url() {
        let body: ResponseBody =
            serde_json::from_str(r#"{"downloadUrl": "https://x/b", "url": "https://x/c"}"#)
                .unwrap();
        assert_eq!(body.artifact_url(), Some("https://x/b"));
    }

    #[test]
    fn fallback_order_finally_url() {
        let body: ResponseBody = serde_json::from_str(r#"{"url": "https://x/c"}"#).unwrap();
        assert_eq!(body.artifact_url(), Some("https://x/c"));
    }

    #[test]
    fn missing_all_url_fields_yields_none() {
        let body: ResponseBody = serde_json::from_str(r#"{"fileName": "out.pdf"}"#).unwrap();
        assert_eq!(body.artifact_url(), None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body: ResponseBody = serde_json::from_str(
            r#"{"url": "https://x/y", "fileName": "out.pdf", "jobId": 42, "temporary": true}"#,
        )
        .unwrap();
        assert_eq!(body.artifact_url(), Some("https://x/y"));
        assert_eq!(body.file_name.as_deref(), Some("out.pdf"));
        assert!(body.temporary);
    }

    #[test]
    fn non_json_body_fails_to_parse() {
        let reply = TransportReply {
            status: 200,
            body: b"<html>oops</html>".to_vec(),
        };
        assert!(reply.parse_body().is_none());
    }

    #[test]
    fn status_classification() {
        let ok = TransportReply {
            status: 201,
            body: vec![],
        };
        let err = TransportReply {
            status: 500,
            body: vec![],
        };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }
}
