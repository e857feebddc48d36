//! Table-driven capture evaluators.

use async_trait::async_trait;
use stampede::{
    CaptureError,
    CaptureEvaluator,
    CaptureOutcome,
    CaptureSet,
    ExecutionContext,
    InvocationParams,
    ResponseRecord,
};

/// Evaluator returning the same capture set for every step.
#[derive(Clone, Debug, Default)]
pub struct StaticCaptures {
    set: CaptureSet,
}

impl StaticCaptures {
    /// Create an evaluator that always yields `set`.
    #[must_use]
    pub fn new(set: CaptureSet) -> Self { Self { set } }

    /// Add one outcome to the returned set.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, outcome: CaptureOutcome) -> Self {
        self.set.insert(name.into(), outcome);
        self
    }
}

#[async_trait]
impl CaptureEvaluator for StaticCaptures {
    async fn evaluate(
        &self,
        _params: &InvocationParams,
        _response: &ResponseRecord,
        _context: &ExecutionContext,
    ) -> Result<Option<CaptureSet>, CaptureError> {
        Ok(Some(self.set.clone()))
    }
}

/// Evaluator whose engine itself fails, as opposed to a failed extraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErroringCaptures;

#[async_trait]
impl CaptureEvaluator for ErroringCaptures {
    async fn evaluate(
        &self,
        _params: &InvocationParams,
        _response: &ResponseRecord,
        _context: &ExecutionContext,
    ) -> Result<Option<CaptureSet>, CaptureError> {
        Err(CaptureError("scripted evaluator failure".to_owned()))
    }
}
