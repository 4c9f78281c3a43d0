//! Multipart HTTP transport for the conversion backend

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::TransferConfig;
use crate::error::{Result, TransportError};
use crate::transport::{ConversionTransport, TransportReply, UploadProgressFn};
use crate::types::ConversionRequest;

/// Transfers a conversion request as a multipart POST
///
/// The file payload is streamed in configured-size chunks so byte-level
/// upload progress scales linearly with bytes actually handed to the
/// connection.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    chunk_size: usize,
}

impl HttpTransport {
    /// Build a transport for the given endpoint
    pub fn new(endpoint: Url, transfer: &TransferConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(transfer.request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            chunk_size: transfer.upload_chunk_size.max(1),
        })
    }
}

#[async_trait]
impl ConversionTransport for HttpTransport {
    async fn submit(
        &self,
        request: &ConversionRequest,
        progress: UploadProgressFn,
        cancel: CancellationToken,
    ) -> Result<TransportReply, TransportError> {
        let total = request.file.size();
        let chunks: Vec<Vec<u8>> = request
            .file
            .bytes
            .chunks(self.chunk_size)
            .map(<[u8]>::to_vec)
            .collect();

        // The closure runs lazily as the connection pulls each chunk, so the
        // counter tracks bytes handed to the transport, not bytes buffered.
        let sent = Arc::new(AtomicU64::new(0));
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            let sent_so_far =
                sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            progress(sent_so_far, total);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(request.file.name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let form = Form::new()
            .text("format", request.format.id.clone())
            .part("file", part);

        debug!(
            endpoint = %self.endpoint,
            file = %request.file.name,
            format = %request.format.id,
            size = total,
            "submitting conversion request"
        );

        let send = self.client.post(self.endpoint.clone()).multipart(form).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Aborted),
            result = send => result.map_err(|e| TransportError::from_reqwest(&e))?,
        };

        let status = response.status().as_u16();
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Aborted),
            bytes = response.bytes() => {
                bytes.map_err(|e| TransportError::from_reqwest(&e))?.to_vec()
            }
        };

        debug!(status, body_len = body.len(), "conversion reply received");
        Ok(TransportReply { status, body })
    }
}
