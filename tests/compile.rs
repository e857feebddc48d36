//! Tests for step compilation counts and ordering.
//!
//! The compiler is pure: the compiled list must contain one step per flow
//! action plus one synthesised step per before/after-scenario name, in
//! declared order, and it must never fail.

mod common;

use std::sync::Arc;

use common::{engine_over, errors, run_once, scenario};
use rstest::rstest;
use serde_json::json;
use stampede::{RunConfig, RunEvent};
use stampede_testing::{CallLog, RecordingProcessor, ScriptedConnector};

#[rstest]
#[case(json!({"flow": []}), 0)]
#[case(json!({"flow": [{"log": "x"}]}), 1)]
#[case(
    json!({"flow": [
        {"log": "x"},
        {"think": 0.1},
        {"pub": {"subject": "s", "payload": "p"}},
        {"req": {"subject": "s", "payload": "p"}},
    ]}),
    4
)]
#[case(
    json!({
        "beforeScenario": ["a", "b"],
        "afterScenario": ["c"],
        "flow": [{"log": "x"}],
    }),
    4
)]
fn compiled_step_count_matches_flow_plus_synthesised_hooks(
    #[case] raw: serde_json::Value,
    #[case] expected: usize,
) {
    let connector = ScriptedConnector::default();
    let engine = engine_over(RunConfig::default(), &connector);
    let compiled = engine.compile(&scenario(raw));
    assert_eq!(compiled.len(), expected);
    assert_eq!(compiled.is_empty(), expected == 0);
}

#[tokio::test]
async fn scenario_hooks_wrap_the_flow_in_declared_order() {
    let log = CallLog::new();
    let config = RunConfig::default()
        .with_processor("setup", Arc::new(RecordingProcessor::new("setup", &log)))
        .with_processor("work", Arc::new(RecordingProcessor::new("work", &log)))
        .with_processor(
            "teardown",
            Arc::new(RecordingProcessor::new("teardown", &log)),
        );
    let connector = ScriptedConnector::default();
    let engine = engine_over(config, &connector);

    let spec = scenario(json!({
        "beforeScenario": ["setup"],
        "afterScenario": ["teardown"],
        "flow": [{"function": "work"}],
    }));
    let (result, _context, _events) = run_once(&engine, &spec).await;

    assert!(result.is_ok());
    assert_eq!(
        log.entries(),
        vec!["setup:invoke", "work:invoke", "teardown:invoke"],
    );
}

#[tokio::test]
async fn unknown_actions_compile_to_noops_and_still_run() {
    let connector = ScriptedConnector::default();
    let engine = engine_over(RunConfig::default(), &connector);

    let spec = scenario(json!({
        "flow": [{}, {"emit": "nothing"}, {"log": "done"}],
    }));
    let compiled = engine.compile(&spec);
    assert_eq!(compiled.len(), 3);

    let (result, _context, events) = run_once(&engine, &spec).await;
    assert!(result.is_ok());
    assert!(errors(&events).is_empty());
    assert_eq!(events, vec![RunEvent::Started]);
}

#[tokio::test]
async fn empty_scenario_connects_and_succeeds() {
    let connector = ScriptedConnector::default();
    let engine = engine_over(RunConfig::default(), &connector);

    let (result, _context, events) = run_once(&engine, &scenario(json!({"flow": []}))).await;

    assert!(result.is_ok());
    assert_eq!(events, vec![RunEvent::Started]);
}
