//! Timer-driven local transport
//!
//! Stands in for the real backend when no conversion service is reachable:
//! upload progress is synthesized over the real payload size on a ticking
//! timer, then a scripted reply is returned. Tests use it as the
//! deterministic fake transport.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{ConversionTransport, TransportReply, UploadProgressFn};
use crate::types::ConversionRequest;

/// How many ticks the synthetic upload is spread over
const UPLOAD_TICKS: u64 = 5;

/// Scripted result of a simulated transfer
#[derive(Clone, Debug)]
pub enum SimulatedReply {
    /// Return this reply after the synthetic upload completes
    Reply(TransportReply),
    /// Fail the transfer after the synthetic upload completes
    Fail(TransportError),
}

/// Local-mode transport that fabricates upload progress and a reply
pub struct SimulatedTransport {
    tick: Duration,
    reply: Option<SimulatedReply>,
}

impl SimulatedTransport {
    /// Simulated transport with the default tick interval (300ms) and a
    /// synthesized success reply carrying a transient `simulated://` URL
    pub fn new() -> Self {
        Self {
            tick: Duration::from_millis(300),
            reply: None,
        }
    }

    /// Override the tick interval (tests use sub-millisecond ticks)
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Script the result returned after the synthetic upload
    pub fn with_result(mut self, reply: SimulatedReply) -> Self {
        self.reply = Some(reply);
        self
    }

    fn default_reply(request: &ConversionRequest) -> TransportReply {
        let body = serde_json::json!({
            "url": format!("simulated://converted/{}", request.format.id),
            "temporary": true,
        });
        TransportReply {
            status: 200,
            body: body.to_string().into_bytes(),
        }
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversionTransport for SimulatedTransport {
    async fn submit(
        &self,
        request: &ConversionRequest,
        progress: UploadProgressFn,
        cancel: CancellationToken,
    ) -> Result<TransportReply, TransportError> {
        let total = request.file.size();
        debug!(file = %request.file.name, size = total, "simulating upload");

        // Byte progression is deterministic; only the tick timing jitters,
        // mimicking an uneven network without breaking monotonicity.
        for tick in 1..=UPLOAD_TICKS {
            let jitter_ms = rand::thread_rng().gen_range(0..=self.tick.as_millis() as u64 / 2);
            let sleep = self.tick + Duration::from_millis(jitter_ms);
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Aborted),
                _ = tokio::time::sleep(sleep) => {}
            }
            progress(total * tick / UPLOAD_TICKS, total);
        }

        match &self.reply {
            Some(SimulatedReply::Reply(reply)) => Ok(reply.clone()),
            Some(SimulatedReply::Fail(err)) => Err(err.clone()),
            None => Ok(Self::default_reply(request)),
        }
    }
}
