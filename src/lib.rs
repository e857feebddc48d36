//! Public API for the `stampede` library.
//!
//! This crate is the scenario-execution core of a pub/sub load-generation
//! tool: it compiles declarative scenarios into sequential pipelines of
//! asynchronous steps, runs each pipeline as one virtual-user iteration
//! against a single broker connection, and reports per-step timing events
//! to the host harness. The broker client, templating engine, and capture
//! evaluator are consumed through traits and supplied by the embedder.

pub mod broker;
pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod hooks;
pub mod response;
pub mod runner;
pub mod scenario;
mod step;
pub mod template;

pub use broker::{
    BrokerConnection,
    BrokerConnector,
    BrokerError,
    PayloadCodec,
    Reply,
    RequestOptions,
    Utf8Codec,
};
pub use capture::{CaptureError, CaptureEvaluator, CaptureOutcome, CaptureSet, NoCaptures};
pub use config::{DEFAULT_SERVER, EngineDefaults, RunConfig};
pub use context::{ExecutionContext, RunId};
pub use error::RunError;
pub use events::{EventSink, RunEvent};
pub use hooks::{InvocationParams, Processor, ProcessorError, ProcessorRegistry};
pub use response::ResponseRecord;
pub use runner::{CompiledScenario, Engine};
pub use scenario::{Action, PubSpec, ReqSpec, ScenarioSpec, ThinkSpec};
pub use template::{PassthroughRenderer, TemplateRenderer};
