//! Step compilation: scenario actions become executable pipeline stages.
//!
//! Compilation is pure and happens once per scenario definition; the
//! resulting steps are shared by every virtual-user iteration and invoked
//! once per run each, strictly in order, threading one mutable context
//! forward.

mod messaging;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    context::ExecutionContext,
    error::RunError,
    events::EventSink,
    runner::EngineCore,
    scenario::{Action, ScenarioSpec, ThinkSpec},
};

/// One compiled, re-invocable pipeline stage.
///
/// Steps borrow the run's context mutably while they execute, so a run can
/// never drive two steps concurrently.
#[async_trait]
pub(crate) trait StepExec: Send + Sync {
    /// Execute this step once for the current run.
    async fn run(
        &self,
        context: &mut ExecutionContext,
        events: &EventSink,
    ) -> Result<(), RunError>;
}

/// Shared handle to a compiled step.
pub(crate) type Step = Arc<dyn StepExec>;

/// Scenario-level hook-name lists shared by every `pub`/`req` step.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScenarioHooks {
    pub(crate) before_request: Vec<String>,
    pub(crate) after_response: Vec<String>,
}

/// Compile `spec` into its ordered step list.
///
/// `before_scenario`/`after_scenario` names are synthesised into
/// `function` steps wrapping the declared flow before per-action
/// compilation. Compilation never fails: unknown actions become
/// immediately-succeeding no-ops.
pub(crate) fn compile(spec: &ScenarioSpec, core: &Arc<EngineCore>) -> Vec<Step> {
    let scenario_hooks = Arc::new(ScenarioHooks {
        before_request: spec.before_request.clone(),
        after_response: spec.after_response.clone(),
    });

    let before = spec.before_scenario.iter().cloned().map(Action::Function);
    let after = spec.after_scenario.iter().cloned().map(Action::Function);

    before
        .chain(spec.flow.iter().cloned())
        .chain(after)
        .map(|action| compile_action(action, core, &scenario_hooks))
        .collect()
}

fn compile_action(
    action: Action,
    core: &Arc<EngineCore>,
    scenario_hooks: &Arc<ScenarioHooks>,
) -> Step {
    match action {
        Action::Log(message) => Arc::new(LogStep { message }),
        Action::Think(spec) => Arc::new(ThinkStep {
            spec,
            core: Arc::clone(core),
        }),
        Action::Function(name) => Arc::new(FunctionStep {
            name,
            core: Arc::clone(core),
        }),
        Action::Pub(spec) => Arc::new(messaging::MessagingStep::publish(
            spec,
            Arc::clone(core),
            Arc::clone(scenario_hooks),
        )),
        Action::Req(spec) => Arc::new(messaging::MessagingStep::request(
            spec,
            Arc::clone(core),
            Arc::clone(scenario_hooks),
        )),
        Action::Noop => Arc::new(NoopStep),
    }
}

/// Immediately-succeeding stand-in for unrecognised actions.
struct NoopStep;

#[async_trait]
impl StepExec for NoopStep {
    async fn run(
        &self,
        _context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), RunError> {
        Ok(())
    }
}

struct LogStep {
    message: String,
}

#[async_trait]
impl StepExec for LogStep {
    async fn run(
        &self,
        _context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), RunError> {
        tracing::debug!(message = %self.message, "log step");
        // Yield so concurrently scheduled virtual users make progress
        // before the next step.
        tokio::task::yield_now().await;
        Ok(())
    }
}

struct ThinkStep {
    spec: ThinkSpec,
    core: Arc<EngineCore>,
}

#[async_trait]
impl StepExec for ThinkStep {
    async fn run(
        &self,
        context: &mut ExecutionContext,
        _events: &EventSink,
    ) -> Result<(), RunError> {
        let seconds = resolve_think(&self.spec, &self.core, context);
        if seconds > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        }
        Ok(())
    }
}

/// Resolve a think duration, falling back to the configured default when a
/// templated value does not parse as seconds.
fn resolve_think(spec: &ThinkSpec, core: &EngineCore, context: &ExecutionContext) -> f64 {
    let seconds = match spec {
        ThinkSpec::Seconds(seconds) => *seconds,
        ThinkSpec::Template(template) => {
            let rendered = core.renderer.render(template, context);
            rendered.trim().parse().unwrap_or_else(|_| {
                let fallback = core.config.defaults.think.unwrap_or(0.0);
                tracing::warn!(value = %rendered, fallback, "unparseable think duration");
                fallback
            })
        }
    };
    if seconds.is_finite() { seconds.max(0.0) } else { 0.0 }
}

struct FunctionStep {
    name: String,
    core: Arc<EngineCore>,
}

#[async_trait]
impl StepExec for FunctionStep {
    async fn run(
        &self,
        context: &mut ExecutionContext,
        events: &EventSink,
    ) -> Result<(), RunError> {
        // Absent names are deliberate no-ops, without even a warning:
        // scenario specs may reference functions defined only in optional
        // configuration profiles.
        let Some(processor) = self.core.config.processor.get(&self.name).cloned() else {
            return Ok(());
        };
        if let Err(source) = processor.invoke(context, events).await {
            let err = RunError::Hook {
                name: self.name.clone(),
                source,
            };
            events.error(&err);
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        capture::NoCaptures,
        config::{EngineDefaults, RunConfig},
        template::PassthroughRenderer,
    };

    fn core_with(config: RunConfig) -> Arc<EngineCore> {
        Arc::new(EngineCore {
            config: Arc::new(config),
            renderer: Arc::new(PassthroughRenderer),
            captures: Arc::new(NoCaptures),
        })
    }

    #[rstest]
    #[case(ThinkSpec::Seconds(1.5), 1.5)]
    #[case(ThinkSpec::Seconds(-3.0), 0.0)]
    #[case(ThinkSpec::Seconds(f64::NAN), 0.0)]
    #[case(ThinkSpec::Template("2".to_owned()), 2.0)]
    #[case(ThinkSpec::Template("not a number".to_owned()), 0.0)]
    fn think_durations_resolve(#[case] spec: ThinkSpec, #[case] expected: f64) {
        let context = ExecutionContext::new();
        let resolved = resolve_think(&spec, &core_with(RunConfig::default()), &context);
        assert!((resolved - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_think_uses_configured_default() {
        let config = RunConfig {
            defaults: EngineDefaults { think: Some(0.25) },
            ..RunConfig::default()
        };
        let context = ExecutionContext::new();
        let resolved = resolve_think(
            &ThinkSpec::Template("??".to_owned()),
            &core_with(config),
            &context,
        );
        assert!((resolved - 0.25).abs() < f64::EPSILON);
    }
}
