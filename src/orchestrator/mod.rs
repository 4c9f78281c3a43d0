//! Conversion orchestration
//!
//! [`ConversionOrchestrator`] drives one conversion attempt at a time
//! through a guarded `Idle → InFlight → Idle` state machine: it re-checks
//! the preconditions, hands the request to the configured transport, maps
//! byte-level upload progress into the phase-based 0–100 scale, reconciles
//! the reply into exactly one [`ConversionOutcome`], and returns to idle.

mod progress;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::catalog::FormatCatalog;
use crate::config::Config;
use crate::error::{Error, Result, TransportError};
use crate::transport::{ConversionTransport, HttpTransport, TransportReply, UploadProgressFn};
use crate::types::{
    Artifact, ArtifactUrl, ConversionOutcome, ConversionRequest, Event, FailureReason,
    FormatDescriptor, Progress, SelectedFile,
};
use crate::validator::FileValidator;

use progress::ProgressTracker;

/// Upper bound of the `Uploading` phase; a fully-transferred payload maps
/// here, which is exactly the start of `ServerProcessing`
const UPLOAD_SPAN: u64 = 60;

/// Percentage reported when the backend's reply has arrived
const FINALIZING_PERCENT: u8 = 90;

/// Drives conversion attempts against a pluggable transport
///
/// One logical session: at most one request is in flight at a time, enforced
/// with an atomic guard rather than relying on callers to serialize. All
/// fields are shared handles, so the orchestrator is cheap to clone.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    validator: FileValidator,
    catalog: Arc<FormatCatalog>,
    transport: Arc<dyn ConversionTransport>,
    event_tx: broadcast::Sender<Event>,
    in_flight: Arc<AtomicBool>,
}

impl ConversionOrchestrator {
    /// Create an orchestrator using the given transport and the built-in
    /// format catalog
    pub fn new(config: &Config, transport: Arc<dyn ConversionTransport>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(config.event_channel_capacity);
        Ok(Self {
            validator: FileValidator::new(config.validation.clone()),
            catalog: Arc::new(FormatCatalog::builtin()),
            transport,
            event_tx,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create an orchestrator that talks HTTP to the configured endpoint
    pub fn http(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.endpoint.clone(), &config.transfer)?;
        Self::new(config, Arc::new(transport))
    }

    /// Replace the format catalog
    pub fn with_catalog(mut self, catalog: FormatCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Subscribe to lifecycle events
    ///
    /// Multiple subscribers are supported; events mirror the `on_progress`
    /// callback plus start/settlement notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Whether the session currently has no request in flight
    pub fn is_idle(&self) -> bool {
        !self.in_flight.load(Ordering::SeqCst)
    }

    /// The catalog this orchestrator resolves formats against
    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    /// Start one conversion attempt
    ///
    /// Re-checks every precondition before accepting the request:
    /// - the file must pass validation ([`Error::Validation`])
    /// - `format.id` must resolve in the catalog ([`Error::UnknownFormat`])
    /// - the session must be idle ([`Error::Busy`]; an in-flight request is
    ///   never superseded)
    ///
    /// On acceptance the request runs on a spawned task; `on_progress`
    /// receives non-decreasing percentages and, except when the attempt is
    /// cancelled, a terminal 100 before the handle settles. The outcome is
    /// always delivered through the handle, never as an error, so any
    /// failure leaves the session retryable.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(
        &self,
        file: SelectedFile,
        format: &FormatDescriptor,
        on_progress: F,
    ) -> Result<ConversionHandle>
    where
        F: FnMut(Progress) + Send + 'static,
    {
        self.validator.validate(&file)?;
        let format = self
            .catalog
            .find(&format.id)
            .cloned()
            .ok_or_else(|| Error::UnknownFormat(format.id.clone()))?;

        // Idle → InFlight; losing the exchange means another request owns
        // the session and this one is rejected, not queued.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(file = %file.name, "rejecting start: conversion already in flight");
            return Err(Error::Busy);
        }

        info!(file = %file.name, format = %format.id, size = file.size(), "conversion started");
        let _ = self.event_tx.send(Event::Started {
            file_name: file.name.clone(),
            format_id: format.id.clone(),
        });

        let request = ConversionRequest { file, format };
        let tracker = Arc::new(ProgressTracker::new(
            Box::new(on_progress),
            self.event_tx.clone(),
        ));
        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let transport = self.transport.clone();
        let event_tx = self.event_tx.clone();
        let in_flight = self.in_flight.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let outcome = drive(transport, &request, &tracker, &task_cancel).await;

            // Terminal progress precedes settlement, except after a
            // cancellation, which must stay silent once acknowledged.
            match &outcome {
                ConversionOutcome::Failed(FailureReason::Cancelled) => tracker.close(),
                _ => tracker.finish(),
            }

            match &outcome {
                ConversionOutcome::Success(artifact) => {
                    info!(file_name = %artifact.file_name, "conversion succeeded");
                    let _ = event_tx.send(Event::Completed {
                        url: artifact.url.as_url().to_string(),
                        file_name: artifact.file_name.clone(),
                    });
                }
                ConversionOutcome::Failed(reason) => {
                    info!(%reason, "conversion failed");
                    let _ = event_tx.send(Event::Failed {
                        reason: reason.clone(),
                    });
                }
            }

            // InFlight → Idle before the outcome lands, so a caller reacting
            // to settlement can immediately start the next attempt.
            in_flight.store(false, Ordering::SeqCst);
            let _ = outcome_tx.send(outcome);
        });

        Ok(ConversionHandle { cancel, outcome_rx })
    }
}

/// Run the transfer and map the reply into an outcome
async fn drive(
    transport: Arc<dyn ConversionTransport>,
    request: &ConversionRequest,
    tracker: &Arc<ProgressTracker>,
    cancel: &CancellationToken,
) -> ConversionOutcome {
    let upload_progress: UploadProgressFn = {
        let tracker = tracker.clone();
        Arc::new(move |sent, total| {
            // Linear map of bytes into [0, 60]; a complete upload lands on
            // 60, the first percentage of ServerProcessing.
            let percent = if total == 0 {
                UPLOAD_SPAN
            } else {
                sent.min(total) * UPLOAD_SPAN / total
            };
            tracker.report(percent as u8);
        })
    };

    let submitted = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(file = %request.file.name, "conversion cancelled before reply");
            return ConversionOutcome::Failed(FailureReason::Cancelled);
        }
        result = transport.submit(request, upload_progress, cancel.child_token()) => result,
    };

    let reply = match submitted {
        Ok(reply) => reply,
        Err(TransportError::Aborted) if cancel.is_cancelled() => {
            return ConversionOutcome::Failed(FailureReason::Cancelled);
        }
        Err(err) => {
            warn!(%err, "transport failure");
            return ConversionOutcome::Failed(FailureReason::Network(err.to_string()));
        }
    };

    tracker.report(FINALIZING_PERCENT);
    reconcile(request, &reply)
}

/// Map a backend reply to the terminal outcome
fn reconcile(request: &ConversionRequest, reply: &TransportReply) -> ConversionOutcome {
    if !reply.is_success() {
        return ConversionOutcome::Failed(FailureReason::Server { code: reply.status });
    }

    let Some(body) = reply.parse_body() else {
        warn!(status = reply.status, "unparseable success body");
        return ConversionOutcome::Failed(FailureReason::MalformedResponse);
    };
    let Some(raw_url) = body.artifact_url() else {
        warn!(status = reply.status, "success body carries no artifact URL");
        return ConversionOutcome::Failed(FailureReason::MalformedResponse);
    };
    let Ok(url) = Url::parse(raw_url) else {
        warn!(raw_url, "artifact URL is not parseable");
        return ConversionOutcome::Failed(FailureReason::MalformedResponse);
    };

    // Server-supplied filename wins over the derived one.
    let file_name = body
        .file_name
        .clone()
        .unwrap_or_else(|| request.derived_file_name());
    let url = if body.temporary {
        ArtifactUrl::Transient(url)
    } else {
        ArtifactUrl::Durable(url)
    };
    ConversionOutcome::Success(Artifact { url, file_name })
}

/// Awaitable, cancellable handle to one started conversion
#[derive(Debug)]
pub struct ConversionHandle {
    cancel: CancellationToken,
    outcome_rx: oneshot::Receiver<ConversionOutcome>,
}

impl ConversionHandle {
    /// Cancel the attempt
    ///
    /// Aborts the outbound transfer; the handle settles to
    /// `Failed(Cancelled)` and no further progress is reported. Cancelling
    /// an already-settled request is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Await the terminal outcome
    pub async fn outcome(self) -> ConversionOutcome {
        self.outcome_rx
            .await
            .unwrap_or(ConversionOutcome::Failed(FailureReason::Cancelled))
    }
}

impl IntoFuture for ConversionHandle {
    type Output = ConversionOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = ConversionOutcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.outcome())
    }
}
