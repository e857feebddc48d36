//! Engine wiring and the sequential scenario pipeline.
//!
//! An [`Engine`] bundles the run configuration with the external
//! collaborator seams (broker connector, template renderer, capture
//! evaluator) and compiles scenario specs into reusable
//! [`CompiledScenario`] pipelines. Each call to
//! [`CompiledScenario::run`] executes one virtual-user iteration.

use std::sync::Arc;

use crate::{
    broker::{BrokerConnector, Utf8Codec},
    capture::{CaptureEvaluator, NoCaptures},
    config::RunConfig,
    context::ExecutionContext,
    error::RunError,
    events::EventSink,
    scenario::ScenarioSpec,
    step::{self, Step, StepExec as _},
    template::{PassthroughRenderer, TemplateRenderer},
};

/// Immutable engine internals captured by compiled steps.
pub(crate) struct EngineCore {
    pub(crate) config: Arc<RunConfig>,
    pub(crate) renderer: Arc<dyn TemplateRenderer>,
    pub(crate) captures: Arc<dyn CaptureEvaluator>,
}

/// Scenario-execution engine for one load-generation worker.
///
/// Construction wires the collaborator seams; [`compile`](Engine::compile)
/// then turns scenario specs into runnable pipelines. The default renderer
/// passes templates through verbatim and the default capture evaluator
/// captures nothing, so a bare engine runs template-free scenarios as-is.
pub struct Engine {
    config: Arc<RunConfig>,
    connector: Arc<dyn BrokerConnector>,
    renderer: Arc<dyn TemplateRenderer>,
    captures: Arc<dyn CaptureEvaluator>,
}

impl Engine {
    /// Create an engine over `connector` with default collaborators.
    #[must_use]
    pub fn new(config: RunConfig, connector: Arc<dyn BrokerConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            renderer: Arc::new(PassthroughRenderer),
            captures: Arc::new(NoCaptures),
        }
    }

    /// Replace the template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the capture evaluator.
    #[must_use]
    pub fn with_captures(mut self, captures: Arc<dyn CaptureEvaluator>) -> Self {
        self.captures = captures;
        self
    }

    /// Compile `spec` into a reusable run pipeline.
    ///
    /// Compilation is pure: no side effects, and it cannot fail. Malformed
    /// actions have already degraded to no-ops at decode time.
    #[must_use]
    pub fn compile(&self, spec: &ScenarioSpec) -> CompiledScenario {
        let core = Arc::new(EngineCore {
            config: Arc::clone(&self.config),
            renderer: Arc::clone(&self.renderer),
            captures: Arc::clone(&self.captures),
        });
        CompiledScenario {
            steps: step::compile(spec, &core),
            config: Arc::clone(&self.config),
            connector: Arc::clone(&self.connector),
        }
    }
}

/// One scenario compiled into an ordered, reusable step pipeline.
pub struct CompiledScenario {
    steps: Vec<Step>,
    config: Arc<RunConfig>,
    connector: Arc<dyn BrokerConnector>,
}

impl CompiledScenario {
    /// Number of compiled steps, including synthesised scenario hooks.
    #[must_use]
    pub fn len(&self) -> usize { self.steps.len() }

    /// Whether the pipeline contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    /// Run the pipeline once against a freshly established connection.
    ///
    /// The init stage connects and attaches the connection and codec to
    /// `context`; the compiled steps then execute strictly in order, each
    /// observing the state its predecessors left behind. The context is
    /// mutated in place so the caller sees the bindings as of failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`RunError`] produced by the init stage or any
    /// step. The error has already been surfaced as an error event on
    /// `events`.
    pub async fn run(
        &self,
        context: &mut ExecutionContext,
        events: &EventSink,
    ) -> Result<(), RunError> {
        self.init(context, events).await?;
        for step in &self.steps {
            step.run(context, events).await?;
        }
        Ok(())
    }

    /// Connection init stage, the first pipeline stage of every run.
    ///
    /// On failure the run executes no steps at all.
    async fn init(&self, context: &mut ExecutionContext, events: &EventSink) -> Result<(), RunError> {
        tracing::debug!(server = %self.config.server, "connecting");
        match self.connector.connect(&self.config).await {
            Ok(connection) => {
                context.attach_connection(connection, Arc::new(Utf8Codec));
                events.started();
                Ok(())
            }
            Err(source) => {
                let err = RunError::Connect(source);
                events.error(&err);
                Err(err)
            }
        }
    }
}
