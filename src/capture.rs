//! Variable capture over step responses.
//!
//! After every successful `pub`/`req` network stage the external capture
//! evaluator inspects the normalised response and returns named extraction
//! outcomes. Non-failed outcomes are written into the run's variable
//! bindings; outcomes carrying the explicit failed marker are dropped key
//! by key while the rest still commit.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::{context::ExecutionContext, hooks::InvocationParams, response::ResponseRecord};

/// Outcome of one extraction rule.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The extraction produced a value to bind.
    Value(Value),
    /// The extraction explicitly failed; the binding must not be written.
    Failed,
}

/// Named extraction outcomes for one step.
pub type CaptureSet = HashMap<String, CaptureOutcome>;

/// Failure of the capture evaluator itself, as opposed to an extraction
/// that merely yielded the failed marker.
#[derive(Debug, thiserror::Error)]
#[error("capture evaluation failed: {0}")]
pub struct CaptureError(pub String);

/// External match/capture evaluator consumed by `pub`/`req` steps.
#[async_trait]
pub trait CaptureEvaluator: Send + Sync {
    /// Evaluate the configured extraction rules against `response`.
    ///
    /// Returning `Ok(None)` means no rules applied to this step.
    ///
    /// # Errors
    ///
    /// An `Err` aborts the step and the run; it is reserved for the
    /// evaluator itself failing, never for an individual extraction.
    async fn evaluate(
        &self,
        params: &InvocationParams,
        response: &ResponseRecord,
        context: &ExecutionContext,
    ) -> Result<Option<CaptureSet>, CaptureError>;
}

/// Evaluator used when no capture rules are configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCaptures;

#[async_trait]
impl CaptureEvaluator for NoCaptures {
    async fn evaluate(
        &self,
        _params: &InvocationParams,
        _response: &ResponseRecord,
        _context: &ExecutionContext,
    ) -> Result<Option<CaptureSet>, CaptureError> {
        Ok(None)
    }
}

/// Commit `captures` into `vars`, overwriting prior bindings of the same
/// name. Failed outcomes are dropped individually; they never roll back
/// the other keys of the same step.
pub(crate) fn apply_captures(captures: CaptureSet, vars: &mut HashMap<String, Value>) {
    for (name, outcome) in captures {
        match outcome {
            CaptureOutcome::Value(value) => {
                vars.insert(name, value);
            }
            CaptureOutcome::Failed => {
                tracing::debug!(name, "dropping failed capture");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn failed_outcomes_are_dropped_others_commit() {
        let mut vars = HashMap::new();
        let mut captures = CaptureSet::new();
        captures.insert("token".to_owned(), CaptureOutcome::Value(json!("abc")));
        captures.insert("missing".to_owned(), CaptureOutcome::Failed);

        apply_captures(captures, &mut vars);

        assert_eq!(vars.get("token"), Some(&json!("abc")));
        assert!(!vars.contains_key("missing"));
    }

    #[test]
    fn captures_overwrite_prior_bindings() {
        let mut vars = HashMap::new();
        vars.insert("token".to_owned(), json!("old"));
        let mut captures = CaptureSet::new();
        captures.insert("token".to_owned(), CaptureOutcome::Value(json!("new")));

        apply_captures(captures, &mut vars);

        assert_eq!(vars.get("token"), Some(&json!("new")));
    }

    #[test]
    fn failed_outcome_leaves_prior_binding_intact() {
        let mut vars = HashMap::new();
        vars.insert("token".to_owned(), json!("old"));
        let mut captures = CaptureSet::new();
        captures.insert("token".to_owned(), CaptureOutcome::Failed);

        apply_captures(captures, &mut vars);

        assert_eq!(vars.get("token"), Some(&json!("old")));
    }
}
