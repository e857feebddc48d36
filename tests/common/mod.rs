//! Shared utilities for integration tests.
//!
//! Provides helpers to build engines over the scripted broker and to run a
//! scenario once while collecting its full event sequence.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::Arc;

use stampede::{
    Engine,
    EventSink,
    ExecutionContext,
    RunConfig,
    RunError,
    RunEvent,
    ScenarioSpec,
};
use stampede_testing::{MappingRenderer, ScriptedConnector, drain_events};

/// Build a scenario spec from inline JSON.
pub fn scenario(raw: serde_json::Value) -> ScenarioSpec {
    serde_json::from_value(raw).expect("scenario decodes")
}

/// Engine over a clone of `connector`, with the mapping renderer
/// installed. The clone shares the connector's records, so the caller can
/// still inspect published messages afterwards.
pub fn engine_over(config: RunConfig, connector: &ScriptedConnector) -> Engine {
    Engine::new(config, Arc::new(connector.clone())).with_renderer(Arc::new(MappingRenderer))
}

/// Run `spec` once, returning the run result, the final context, and the
/// complete event sequence.
pub async fn run_once(
    engine: &Engine,
    spec: &ScenarioSpec,
) -> (Result<(), RunError>, ExecutionContext, Vec<RunEvent>) {
    let compiled = engine.compile(spec);
    let (events, mut rx) = EventSink::unbounded();
    let mut context = ExecutionContext::new();
    let result = compiled.run(&mut context, &events).await;
    drop(events);
    let collected = drain_events(&mut rx);
    (result, context, collected)
}

/// The subset of `events` that are `Response` events.
pub fn responses(events: &[RunEvent]) -> Vec<&RunEvent> {
    events
        .iter()
        .filter(|event| matches!(event, RunEvent::Response { .. }))
        .collect()
}

/// The subset of `events` that are `Error` events.
pub fn errors(events: &[RunEvent]) -> Vec<&RunEvent> {
    events
        .iter()
        .filter(|event| matches!(event, RunEvent::Error { .. }))
        .collect()
}
