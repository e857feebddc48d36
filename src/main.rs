//! Minimal binary demonstrating `stampede` usage.
//!
//! Loads a scenario JSON file and runs it against the in-process loopback
//! broker, printing the events each iteration emits. Real deployments
//! embed the library and supply their own broker connector.

mod cli;

use std::sync::Arc;

use clap::Parser;
use stampede::{
    Engine,
    EventSink,
    ExecutionContext,
    RunConfig,
    ScenarioSpec,
    broker::loopback::LoopbackConnector,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable structured logging for demos and smoke tests. Applications
    // embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let raw = std::fs::read_to_string(&cli.scenario)?;
    let spec: ScenarioSpec = serde_json::from_str(&raw)?;

    let engine = Engine::new(RunConfig::default(), Arc::new(LoopbackConnector));
    let compiled = engine.compile(&spec);
    println!("compiled {} steps", compiled.len());

    for iteration in 0..cli.iterations {
        let (events, mut rx) = EventSink::unbounded();
        let mut context = ExecutionContext::new();
        let result = compiled.run(&mut context, &events).await;
        drop(events);

        while let Some(event) = rx.recv().await {
            println!("[{iteration}] {event:?}");
        }
        result.map_err(|err| {
            eprintln!("[{iteration}] run failed: {err}");
            err
        })?;
    }

    Ok(())
}
