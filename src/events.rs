//! Run events surfaced to the host harness.
//!
//! Each virtual-user run reports its lifecycle through an [`EventSink`]
//! handed to [`crate::runner::CompiledScenario::run`]. The harness owns the
//! receiving half and aggregates timings across runs; this crate only ever
//! produces per-step events.

use tokio::sync::mpsc;

use crate::context::RunId;

/// Events emitted while a compiled scenario runs.
///
/// Emission order is part of the contract: a run emits `Started` once after
/// connecting, then for every `pub`/`req` step a `Request` followed by
/// either a `Response` or an `Error`. The first `Error` is also the run's
/// terminal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The broker connection is established and the run is ready.
    Started,
    /// A `pub` or `req` step began its network operation.
    Request,
    /// A `pub` or `req` step completed its network operation.
    Response {
        /// Elapsed time of the network operation in nanoseconds.
        elapsed_ns: u128,
        /// Outcome code; `0` on success.
        code: u32,
        /// Identifier of the run that produced the response.
        uid: RunId,
    },
    /// A connection, hook, publish, request, or capture failure.
    Error {
        /// Rendered failure message.
        message: String,
    },
}

/// Sending half of one run's event stream.
///
/// Cloneable so hooks and custom functions can emit their own events; all
/// clones feed the same receiver.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl EventSink {
    /// Create a sink together with the receiver the harness drains.
    #[must_use]
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit `event`, discarding it if the harness dropped the receiver.
    pub fn emit(&self, event: RunEvent) { let _ = self.tx.send(event); }

    pub(crate) fn started(&self) { self.emit(RunEvent::Started); }

    pub(crate) fn request(&self) { self.emit(RunEvent::Request); }

    pub(crate) fn response(&self, elapsed_ns: u128, code: u32, uid: RunId) {
        self.emit(RunEvent::Response {
            elapsed_ns,
            code,
            uid,
        });
    }

    pub(crate) fn error(&self, err: &dyn std::fmt::Display) {
        self.emit(RunEvent::Error {
            message: err.to_string(),
        });
    }
}
