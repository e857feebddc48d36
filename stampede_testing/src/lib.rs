//! Test doubles for driving [`stampede`] pipelines without a real broker.
//!
//! Provides a scripted broker with failure injection, a `{{ name }}`
//! substitution renderer, table-driven capture evaluators, recording
//! processors sharing an ordered call log, and a serialised handle to the
//! global log capture.

pub mod broker;
pub mod captures;
pub mod logging;
pub mod processors;
pub mod render;

pub use broker::{BrokerScript, PublishRecord, RequestRecord, ScriptedConnector};
pub use captures::{ErroringCaptures, StaticCaptures};
pub use logging::{LoggerHandle, logger};
pub use processors::{CallLog, RecordingProcessor};
pub use render::MappingRenderer;

use stampede::RunEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Drain every event currently buffered on `rx`.
///
/// Call after the run finished and the sink was dropped, so the buffered
/// sequence is complete.
pub fn drain_events(rx: &mut UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
