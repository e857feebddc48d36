//! Run configuration consumed by the engine.
//!
//! The data fields deserialise from the harness's config file; the
//! processor registry holds live callables and is populated in code.

use std::{collections::HashMap, fmt, sync::Arc};

use serde::Deserialize;

use crate::hooks::{Processor, ProcessorRegistry};

/// Public demo endpoint used when no server is configured.
pub const DEFAULT_SERVER: &str = "demo.nats.io:4222";

/// Configuration shared by every run of one engine instance.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Broker address.
    #[serde(default = "default_server")]
    pub server: String,
    /// Default subject, applied when an action's subject renders empty.
    #[serde(default)]
    pub subject: Option<String>,
    /// Engine-level fallbacks applied when a step omits a value.
    #[serde(default)]
    pub defaults: EngineDefaults,
    /// Named processor functions callable from scenarios.
    #[serde(skip)]
    pub processor: ProcessorRegistry,
}

/// Fallback values for steps that omit their own.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct EngineDefaults {
    /// Think duration in seconds used when a templated pause does not
    /// parse.
    #[serde(default)]
    pub think: Option<f64>,
}

fn default_server() -> String { DEFAULT_SERVER.to_owned() }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            subject: None,
            defaults: EngineDefaults::default(),
            processor: HashMap::new(),
        }
    }
}

impl RunConfig {
    /// Register a processor function under `name`.
    #[must_use]
    pub fn with_processor(mut self, name: impl Into<String>, processor: Arc<dyn Processor>) -> Self {
        self.processor.insert(name.into(), processor);
        self
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("server", &self.server)
            .field("subject", &self.subject)
            .field("defaults", &self.defaults)
            .field("processor", &self.processor.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_server_falls_back_to_demo_endpoint() {
        let config: RunConfig = serde_json::from_value(json!({})).expect("config decodes");
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.subject, None);
    }

    #[test]
    fn explicit_fields_decode() {
        let config: RunConfig = serde_json::from_value(json!({
            "server": "broker.internal:4222",
            "subject": "load.default",
            "defaults": {"think": 0.5},
        }))
        .expect("config decodes");
        assert_eq!(config.server, "broker.internal:4222");
        assert_eq!(config.subject.as_deref(), Some("load.default"));
        assert_eq!(config.defaults.think, Some(0.5));
    }
}
