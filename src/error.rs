//! Error taxonomy for scenario runs.

use thiserror::Error;

use crate::{broker::BrokerError, capture::CaptureError, hooks::ProcessorError};

/// Terminal failure of one virtual-user run.
///
/// Every variant is surfaced to the harness as an error event before the
/// run's pipeline resolves with it. The pipeline has a single failure
/// exit: the first failing stage aborts the run, and no stage retries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The broker was unreachable at run start; no steps executed.
    #[error("broker connection failed")]
    Connect(#[source] BrokerError),
    /// A hook or custom function reported a failure.
    #[error("function `{name}` failed")]
    Hook {
        /// Resolved name of the failing function.
        name: String,
        /// Failure reported by the function.
        #[source]
        source: ProcessorError,
    },
    /// A publish or its delivery confirmation failed.
    #[error("publish failed")]
    Publish(#[source] BrokerError),
    /// A request-reply call failed or timed out.
    #[error("request failed")]
    Request(#[source] BrokerError),
    /// The capture evaluator itself errored.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
