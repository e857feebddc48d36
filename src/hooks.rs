//! Named processor functions and the before/after hook pipeline.
//!
//! Scenario authors reference processor functions by name; the run
//! configuration maps those names to [`Processor`] implementations.
//! `pub`/`req` steps execute the configured hook names in strict series,
//! warning and substituting a no-op for names the registry does not know,
//! and stopping at the first hook that reports an error.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    context::ExecutionContext,
    error::RunError,
    events::EventSink,
    response::ResponseRecord,
    template::TemplateRenderer,
};

/// Error reported by a processor function.
pub type ProcessorError = Box<dyn std::error::Error + Send + Sync>;

/// Registry of named processor functions from the run configuration.
pub type ProcessorRegistry = HashMap<String, Arc<dyn Processor>>;

/// User-supplied function callable from scenarios.
///
/// Every entry point defaults to a no-op, so implementations override only
/// the shapes they participate in: [`invoke`](Processor::invoke) for
/// `function` steps and the synthesised before/after-scenario steps,
/// [`before_request`](Processor::before_request) and
/// [`after_response`](Processor::after_response) for hooks around
/// `pub`/`req` steps.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Entry point for `function` steps.
    async fn invoke(
        &self,
        _context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Hook run before the network operation of a `pub`/`req` step.
    ///
    /// Mutations to the params' subject and headers take effect on the
    /// network call. The payload is re-rendered from its template after all
    /// before-hooks run, so payload mutations do not survive.
    async fn before_request(
        &self,
        _params: &mut InvocationParams,
        _context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Hook run after the network operation with the normalised response.
    async fn after_response(
        &self,
        _params: &InvocationParams,
        _response: &ResponseRecord,
        _context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), ProcessorError> {
        Ok(())
    }
}

/// Request metadata assembled for hooks and the capture evaluator.
///
/// Merges the action's own fields with derived request metadata so hooks
/// written against other engines keep working unchanged.
#[derive(Debug, Clone)]
pub struct InvocationParams {
    /// Target subject of the network operation.
    pub subject: String,
    /// Payload rendered against the bindings current when the step began.
    pub payload: String,
    /// Raw payload template before rendering.
    pub payload_template: String,
    /// Request-reply timeout; absent for fire-and-forget publishes.
    pub timeout: Option<Duration>,
    /// Protocol headers sent with a request-reply call.
    pub headers: HashMap<String, String>,
    /// Action-level before-hook names.
    pub before_request: Vec<String>,
    /// Action-level after-hook names.
    pub after_response: Vec<String>,
}

/// Run `names` as before-hooks in strict series.
///
/// Each name is itself rendered as a template against the current bindings
/// before lookup, so hook names may be parameterised. Unknown names warn
/// and no-op; the first hook error aborts the series.
pub(crate) async fn run_before_hooks(
    names: &[String],
    registry: &ProcessorRegistry,
    renderer: &dyn TemplateRenderer,
    params: &mut InvocationParams,
    context: &mut ExecutionContext,
    events: &EventSink,
) -> Result<(), RunError> {
    for name in names {
        let resolved = renderer.render(name, context);
        let Some(processor) = registry.get(&resolved) else {
            tracing::warn!(hook = %resolved, "before-request function not found, skipping");
            continue;
        };
        processor
            .before_request(params, context, events)
            .await
            .map_err(|source| RunError::Hook {
                name: resolved,
                source,
            })?;
    }
    Ok(())
}

/// Run `names` as after-hooks in strict series, handing each the response.
pub(crate) async fn run_after_hooks(
    names: &[String],
    registry: &ProcessorRegistry,
    renderer: &dyn TemplateRenderer,
    params: &InvocationParams,
    response: &ResponseRecord,
    context: &mut ExecutionContext,
    events: &EventSink,
) -> Result<(), RunError> {
    for name in names {
        let resolved = renderer.render(name, context);
        let Some(processor) = registry.get(&resolved) else {
            tracing::warn!(hook = %resolved, "after-response function not found, skipping");
            continue;
        };
        processor
            .after_response(params, response, context, events)
            .await
            .map_err(|source| RunError::Hook {
                name: resolved,
                source,
            })?;
    }
    Ok(())
}
