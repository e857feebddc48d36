//! Recording processor functions for ordering and failure assertions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use stampede::{
    EventSink,
    ExecutionContext,
    InvocationParams,
    Processor,
    ProcessorError,
    ResponseRecord,
};

/// Shared, ordered log of invocations.
///
/// Processors and the scripted broker append entries as they run, so one
/// log captures the full within-step ordering.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `entry`.
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("call log poisoned").push(entry.into());
    }

    /// Snapshot of the entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> { self.0.lock().expect("call log poisoned").clone() }
}

/// Processor recording every entry point it is driven through.
///
/// Entries take the form `label:invoke`, `label:before`, and
/// `label:after`. The builder methods bolt on failure injection, variable
/// mutation, header mutation, and response stashing.
pub struct RecordingProcessor {
    label: String,
    log: CallLog,
    fail: bool,
    set_var: Option<(String, Value)>,
    set_header: Option<(String, String)>,
    stash_body_in: Option<String>,
    stash_payload_in: Option<String>,
}

impl RecordingProcessor {
    /// Create a processor recording to `log` under `label`.
    #[must_use]
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            fail: false,
            set_var: None,
            set_header: None,
            stash_body_in: None,
            stash_payload_in: None,
        }
    }

    /// Report an error from every entry point after recording it.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Write `value` under `name` into the context vars when run.
    #[must_use]
    pub fn setting_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_var = Some((name.into(), value));
        self
    }

    /// Insert a request header when run as a before-hook.
    #[must_use]
    pub fn setting_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header = Some((name.into(), value.into()));
        self
    }

    /// Stash the response body under `name` when run as an after-hook.
    #[must_use]
    pub fn stashing_body_in(mut self, name: impl Into<String>) -> Self {
        self.stash_body_in = Some(name.into());
        self
    }

    /// Stash the rendered payload under `name` when run as a before-hook.
    #[must_use]
    pub fn stashing_payload_in(mut self, name: impl Into<String>) -> Self {
        self.stash_payload_in = Some(name.into());
        self
    }

    fn outcome(&self, entry: &str, context: &mut ExecutionContext) -> Result<(), ProcessorError> {
        self.log.record(format!("{}:{entry}", self.label));
        if let Some((name, value)) = &self.set_var {
            context.vars.insert(name.clone(), value.clone());
        }
        if self.fail {
            return Err(format!("{} scripted failure", self.label).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for RecordingProcessor {
    async fn invoke(
        &self,
        context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), ProcessorError> {
        self.outcome("invoke", context)
    }

    async fn before_request(
        &self,
        params: &mut InvocationParams,
        context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), ProcessorError> {
        if let Some((name, value)) = &self.set_header {
            params.headers.insert(name.clone(), value.clone());
        }
        if let Some(name) = &self.stash_payload_in {
            context
                .vars
                .insert(name.clone(), Value::String(params.payload.clone()));
        }
        self.outcome("before", context)
    }

    async fn after_response(
        &self,
        _params: &InvocationParams,
        response: &ResponseRecord,
        context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), ProcessorError> {
        if let Some(name) = &self.stash_body_in {
            let body = response.body.clone().unwrap_or(Value::Null);
            context.vars.insert(name.clone(), body);
        }
        self.outcome("after", context)
    }
}
