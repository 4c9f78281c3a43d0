//! Monotonic phase-based progress tracking

use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::types::{Event, Progress};

/// Progress callback supplied by the presentation layer
pub type ProgressFn = Box<dyn FnMut(Progress) + Send>;

/// Enforces the progress contract for one conversion attempt
///
/// Reports are clamped to non-decreasing order and capped at 99; the
/// terminal 100 is reserved for [`finish`](Self::finish), which emits it
/// exactly once. After `finish` or [`close`](Self::close) the tracker goes
/// silent, so no callback can fire after cancellation is acknowledged.
pub(crate) struct ProgressTracker {
    inner: Mutex<Inner>,
}

struct Inner {
    callback: ProgressFn,
    event_tx: broadcast::Sender<Event>,
    last: Option<u8>,
    closed: bool,
}

impl ProgressTracker {
    pub(crate) fn new(callback: ProgressFn, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                callback,
                event_tx,
                last: None,
                closed: false,
            }),
        }
    }

    /// Report an intermediate percentage
    ///
    /// Values at or above 100 are clamped to 99; values below the last
    /// report are dropped rather than emitted backward.
    pub(crate) fn report(&self, percent: u8) {
        self.emit(percent.min(99));
    }

    /// Emit the terminal 100 exactly once and silence the tracker
    pub(crate) fn finish(&self) {
        self.emit(100);
        self.close();
    }

    /// Silence the tracker without a terminal report (cancellation path)
    pub(crate) fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.closed = true;
        }
    }

    fn emit(&self, percent: u8) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.closed {
            return;
        }
        if let Some(last) = inner.last {
            if percent <= last {
                return;
            }
        }
        inner.last = Some(percent);
        let progress = Progress::at(percent);
        (inner.callback)(progress);
        let _ = inner.event_tx.send(Event::Progress {
            percent: progress.percent,
            phase: progress.phase,
        });
    }
}
