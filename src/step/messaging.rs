//! Shared execution pipeline for `pub` and `req` steps.
//!
//! Both step kinds run the same linear pipeline: render the payload,
//! assemble hook params, run before-hooks, emit the request event and
//! start the timer, re-render the payload, perform the network operation,
//! normalise the response, commit captures, run after-hooks. Any stage
//! failure short-circuits the remaining stages and fails the run; the
//! failure is emitted as an error event exactly once.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use super::{ScenarioHooks, StepExec};
use crate::{
    broker::{BrokerError, RequestOptions},
    capture,
    context::ExecutionContext,
    error::RunError,
    events::EventSink,
    hooks::{self, InvocationParams},
    response::ResponseRecord,
    runner::EngineCore,
    scenario::{DEFAULT_REQUEST_TIMEOUT_MS, PubSpec, ReqSpec},
};

/// Which network operation a messaging step performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpKind {
    Publish,
    Request,
}

/// Unified view over `PubSpec` and `ReqSpec`.
#[derive(Debug, Clone)]
struct MessagingSpec {
    kind: OpKind,
    subject: String,
    payload: Value,
    before_request: Vec<String>,
    after_response: Vec<String>,
    timeout: Option<Duration>,
    headers: HashMap<String, String>,
}

/// Compiled `pub` or `req` step.
pub(super) struct MessagingStep {
    spec: MessagingSpec,
    core: Arc<EngineCore>,
    scenario_hooks: Arc<ScenarioHooks>,
}

impl MessagingStep {
    pub(super) fn publish(
        spec: PubSpec,
        core: Arc<EngineCore>,
        scenario_hooks: Arc<ScenarioHooks>,
    ) -> Self {
        Self {
            spec: MessagingSpec {
                kind: OpKind::Publish,
                subject: spec.subject,
                payload: spec.payload,
                before_request: spec.before_request,
                after_response: spec.after_response,
                timeout: None,
                headers: HashMap::new(),
            },
            core,
            scenario_hooks,
        }
    }

    pub(super) fn request(
        spec: ReqSpec,
        core: Arc<EngineCore>,
        scenario_hooks: Arc<ScenarioHooks>,
    ) -> Self {
        Self {
            spec: MessagingSpec {
                kind: OpKind::Request,
                subject: spec.subject,
                payload: spec.payload,
                before_request: spec.before_request,
                after_response: spec.after_response,
                timeout: Some(Duration::from_millis(spec.timeout)),
                headers: spec.headers,
            },
            core,
            scenario_hooks,
        }
    }

    /// The linear step pipeline with its single failure exit.
    async fn execute(
        &self,
        context: &mut ExecutionContext,
        events: &EventSink,
    ) -> Result<(), RunError> {
        let spec = &self.spec;
        let core = &self.core;
        let template = payload_text(&spec.payload);

        let mut params = InvocationParams {
            subject: self.resolve_subject(),
            payload: core.renderer.render(&template, context),
            payload_template: template.clone(),
            timeout: spec.timeout,
            headers: spec.headers.clone(),
            before_request: spec.before_request.clone(),
            after_response: spec.after_response.clone(),
        };

        let before = concat_names(&self.scenario_hooks.before_request, &spec.before_request);
        hooks::run_before_hooks(
            &before,
            &core.config.processor,
            core.renderer.as_ref(),
            &mut params,
            context,
            events,
        )
        .await?;

        events.request();
        let started_at = Instant::now();

        // Before-hooks may have mutated the bindings; render the payload
        // again immediately before the network call.
        params.payload = core.renderer.render(&template, context);

        let connection = context.connection().ok_or_else(|| match spec.kind {
            OpKind::Publish => RunError::Publish(BrokerError::NotConnected),
            OpKind::Request => RunError::Request(BrokerError::NotConnected),
        })?;
        let bytes = context.codec().encode(&params.payload);

        let response = match spec.kind {
            OpKind::Publish => {
                tracing::debug!(
                    subject = %params.subject,
                    payload = %params.payload,
                    "publishing",
                );
                connection
                    .publish(&params.subject, bytes)
                    .await
                    .map_err(RunError::Publish)?;
                connection.flush().await.map_err(RunError::Publish)?;
                events.response(started_at.elapsed().as_nanos(), 0, context.uid());
                ResponseRecord::empty()
            }
            OpKind::Request => {
                let options = RequestOptions {
                    timeout: params
                        .timeout
                        .unwrap_or(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)),
                    headers: params.headers.clone(),
                };
                tracing::debug!(
                    subject = %params.subject,
                    payload = %params.payload,
                    timeout = ?options.timeout,
                    "requesting",
                );
                let reply = connection
                    .request(&params.subject, bytes, options)
                    .await
                    .map_err(RunError::Request)?;
                let text = context.codec().decode(&reply.payload);
                events.response(started_at.elapsed().as_nanos(), 0, context.uid());
                ResponseRecord::from_reply(text, reply.headers)
            }
        };

        if let Some(captures) = core
            .captures
            .evaluate(&params, &response, context)
            .await
            .map_err(RunError::Capture)?
        {
            capture::apply_captures(captures, &mut context.vars);
        }

        let after = concat_names(&self.scenario_hooks.after_response, &spec.after_response);
        hooks::run_after_hooks(
            &after,
            &core.config.processor,
            core.renderer.as_ref(),
            &params,
            &response,
            context,
            events,
        )
        .await?;

        Ok(())
    }

    /// The action's subject, or the configured default when it is empty.
    fn resolve_subject(&self) -> String {
        if self.spec.subject.is_empty() {
            if let Some(subject) = &self.core.config.subject {
                return subject.clone();
            }
        }
        self.spec.subject.clone()
    }
}

#[async_trait]
impl StepExec for MessagingStep {
    async fn run(
        &self,
        context: &mut ExecutionContext,
        events: &EventSink,
    ) -> Result<(), RunError> {
        match self.execute(context, events).await {
            Ok(()) => Ok(()),
            Err(err) => {
                events.error(&err);
                Err(err)
            }
        }
    }
}

/// Scenario-level hook names first, then action-level ones.
fn concat_names(scenario_level: &[String], action_level: &[String]) -> Vec<String> {
    scenario_level.iter().chain(action_level).cloned().collect()
}

/// Canonical text form of a payload template; objects and arrays
/// serialise to JSON text, strings pass through unquoted.
fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
