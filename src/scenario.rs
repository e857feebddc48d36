//! Scenario data model consumed by the step compiler.
//!
//! A scenario is an ordered flow of abstract actions plus optional
//! scenario-level hook-name lists. Specs come from an external loader
//! (typically JSON); the types here only shape the data, they never
//! execute anything.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

/// Request-reply timeout applied when a `req` action names none, in
/// milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// One scenario: an ordered action flow and its hook-name lists.
///
/// Immutable once compiled; compiling the same spec again yields an
/// equivalent pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSpec {
    /// Optional display name, unused by the engine itself.
    #[serde(default)]
    pub name: Option<String>,
    /// Declared action flow, executed strictly in order.
    #[serde(default)]
    pub flow: Vec<Action>,
    /// Function names synthesised into steps before the flow.
    #[serde(default)]
    pub before_scenario: Vec<String>,
    /// Function names synthesised into steps after the flow.
    #[serde(default)]
    pub after_scenario: Vec<String>,
    /// Scenario-level before-hooks applied to every `pub`/`req` step.
    #[serde(default)]
    pub before_request: Vec<String>,
    /// Scenario-level after-hooks applied to every `pub`/`req` step.
    #[serde(default)]
    pub after_response: Vec<String>,
}

/// One abstract scenario action.
///
/// Unknown or malformed entries decode to [`Action::Noop`] rather than
/// failing, so scenario specs written for newer engine versions still
/// load. The compiler matches this enum exhaustively.
#[derive(Debug, Clone)]
pub enum Action {
    /// Schedule-only step; yields to the run loop and succeeds.
    Log(String),
    /// Pause this virtual user for the given duration.
    Think(ThinkSpec),
    /// Invoke a named function from the processor registry.
    Function(String),
    /// Fire-and-forget publish, confirmed by a flush round trip.
    Pub(PubSpec),
    /// Request-reply round trip with a timeout.
    Req(ReqSpec),
    /// Unrecognised action; compiles to an immediately-succeeding step.
    Noop,
}

/// Fields of a `pub` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSpec {
    /// Target subject.
    pub subject: String,
    /// Payload template; non-string values are serialised to JSON text
    /// before rendering.
    pub payload: Value,
    /// Action-level before-hooks, run after the scenario-level ones.
    #[serde(default)]
    pub before_request: Vec<String>,
    /// Action-level after-hooks, run after the scenario-level ones.
    #[serde(default)]
    pub after_response: Vec<String>,
}

/// Fields of a `req` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqSpec {
    /// Target subject.
    pub subject: String,
    /// Payload template; non-string values are serialised to JSON text
    /// before rendering.
    pub payload: Value,
    /// Action-level before-hooks, run after the scenario-level ones.
    #[serde(default)]
    pub before_request: Vec<String>,
    /// Action-level after-hooks, run after the scenario-level ones.
    #[serde(default)]
    pub after_response: Vec<String>,
    /// Reply timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub timeout: u64,
    /// Protocol headers attached to the request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Duration of a `think` pause.
#[derive(Debug, Clone, PartialEq)]
pub enum ThinkSpec {
    /// Literal number of seconds.
    Seconds(f64),
    /// Template rendered and parsed at execution time, so pauses can be
    /// driven by captured variables.
    Template(String),
}

const fn default_request_timeout() -> u64 { DEFAULT_REQUEST_TIMEOUT_MS }

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map: serde_json::Map<String, Value> = serde_json::Map::deserialize(deserializer)?;

        if let Some(message) = map.get("log") {
            return Ok(Action::Log(value_to_text(message)));
        }
        if let Some(think) = map.get("think") {
            return Ok(Action::Think(ThinkSpec::from_value(think)));
        }
        if let Some(name) = map.get("function") {
            return Ok(Action::Function(value_to_text(name)));
        }
        if let Some(spec) = map.get("pub") {
            return Ok(decode_or_noop::<PubSpec>(spec).map_or(Action::Noop, Action::Pub));
        }
        if let Some(spec) = map.get("req") {
            return Ok(decode_or_noop::<ReqSpec>(spec).map_or(Action::Noop, Action::Req));
        }

        Ok(Action::Noop)
    }
}

/// Decode an action body, degrading malformed entries to `None` so the
/// surrounding scenario still loads.
fn decode_or_noop<T: de::DeserializeOwned>(value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(spec) => Some(spec),
        Err(err) => {
            tracing::warn!(%err, "malformed action body, treating as no-op");
            None
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl ThinkSpec {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(template) => ThinkSpec::Template(template.clone()),
            other => other
                .as_f64()
                .map_or(ThinkSpec::Seconds(0.0), ThinkSpec::Seconds),
        }
    }
}
