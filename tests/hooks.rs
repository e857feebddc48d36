//! Tests for the before/after hook pipeline around messaging steps.
//!
//! They check the strict within-step ordering, first-error
//! short-circuiting, the warn-and-skip path for unknown names, and
//! templated hook-name resolution.

mod common;

use std::sync::Arc;

use common::{engine_over, errors, responses, run_once, scenario};
use rstest::rstest;
use serde_json::json;
use stampede::{RunConfig, RunError, RunEvent};
use stampede_testing::{CallLog, LoggerHandle, RecordingProcessor, ScriptedConnector, logger};

#[tokio::test]
async fn hooks_run_in_strict_order_around_the_network_operation() {
    let log = CallLog::new();
    let config = RunConfig::default()
        .with_processor("sb", Arc::new(RecordingProcessor::new("sb", &log)))
        .with_processor("ab", Arc::new(RecordingProcessor::new("ab", &log)))
        .with_processor("sa", Arc::new(RecordingProcessor::new("sa", &log)))
        .with_processor("aa", Arc::new(RecordingProcessor::new("aa", &log)));
    let connector = ScriptedConnector::default().with_log(log.clone());
    let engine = engine_over(config, &connector);

    let spec = scenario(json!({
        "beforeRequest": ["sb"],
        "afterResponse": ["sa"],
        "flow": [{"pub": {
            "subject": "orders.new",
            "payload": "{}",
            "beforeRequest": ["ab"],
            "afterResponse": ["aa"],
        }}],
    }));
    let (result, _context, _events) = run_once(&engine, &spec).await;

    assert!(result.is_ok());
    assert_eq!(
        log.entries(),
        vec![
            "sb:before",
            "ab:before",
            "publish",
            "flush",
            "sa:after",
            "aa:after",
        ],
    );
}

#[tokio::test]
async fn failing_before_hook_prevents_the_network_call_and_after_hooks() {
    let log = CallLog::new();
    let config = RunConfig::default()
        .with_processor(
            "boom",
            Arc::new(RecordingProcessor::new("boom", &log).failing()),
        )
        .with_processor("after", Arc::new(RecordingProcessor::new("after", &log)));
    let connector = ScriptedConnector::default();
    let engine = engine_over(config, &connector);

    let spec = scenario(json!({
        "flow": [{"pub": {
            "subject": "orders.new",
            "payload": "{}",
            "beforeRequest": ["boom"],
            "afterResponse": ["after"],
        }}],
    }));
    let (result, _context, events) = run_once(&engine, &spec).await;

    let Err(RunError::Hook { name, .. }) = result else {
        panic!("expected hook failure, got {result:?}");
    };
    assert_eq!(name, "boom");
    assert!(connector.published().is_empty());
    assert_eq!(log.entries(), vec!["boom:before"]);
    // The request event is only emitted once every before-hook succeeded.
    assert!(!events.contains(&RunEvent::Request));
    assert_eq!(errors(&events).len(), 1);
    assert!(responses(&events).is_empty());
}

#[tokio::test]
async fn failing_after_hook_fails_the_run_after_the_response() {
    let log = CallLog::new();
    let config = RunConfig::default().with_processor(
        "late",
        Arc::new(RecordingProcessor::new("late", &log).failing()),
    );
    let connector = ScriptedConnector::default();
    let engine = engine_over(config, &connector);

    let spec = scenario(json!({
        "flow": [{"pub": {
            "subject": "orders.new",
            "payload": "{}",
            "afterResponse": ["late"],
        }}],
    }));
    let (result, _context, events) = run_once(&engine, &spec).await;

    assert!(matches!(result, Err(RunError::Hook { .. })));
    assert_eq!(connector.published().len(), 1);
    assert_eq!(responses(&events).len(), 1);
    assert_eq!(errors(&events).len(), 1);
}

#[rstest]
#[tokio::test]
async fn missing_hook_name_warns_and_skips(mut logger: LoggerHandle) {
    let connector = ScriptedConnector::default();
    let engine = engine_over(RunConfig::default(), &connector);

    let spec = scenario(json!({
        "flow": [{"pub": {
            "subject": "orders.new",
            "payload": "{}",
            "beforeRequest": ["ghostHook"],
        }}],
    }));
    let (result, _context, events) = run_once(&engine, &spec).await;

    assert!(result.is_ok());
    assert_eq!(connector.published().len(), 1);
    assert!(errors(&events).is_empty());

    let mut warned = false;
    while let Some(record) = logger.pop() {
        let message = record.args().to_string();
        if message.contains("ghostHook") && message.contains("not found") {
            warned = true;
        }
    }
    assert!(warned, "expected a warning about the missing hook");
}

#[tokio::test]
async fn hook_names_are_rendered_before_lookup() {
    let log = CallLog::new();
    let config = RunConfig::default()
        .with_processor(
            "choose",
            Arc::new(RecordingProcessor::new("choose", &log).setting_var("signer", json!("real"))),
        )
        .with_processor("real", Arc::new(RecordingProcessor::new("real", &log)));
    let connector = ScriptedConnector::default();
    let engine = engine_over(config, &connector);

    let spec = scenario(json!({
        "beforeScenario": ["choose"],
        "flow": [{"pub": {
            "subject": "orders.new",
            "payload": "{}",
            "beforeRequest": ["{{ signer }}"],
        }}],
    }));
    let (result, _context, _events) = run_once(&engine, &spec).await;

    assert!(result.is_ok());
    assert_eq!(log.entries(), vec!["choose:invoke", "real:before"]);
}
