//! Per-run execution state threaded through every compiled step.
//!
//! An [`ExecutionContext`] is created once per virtual-user iteration and
//! mutated in place by the sequential pipeline: the init stage attaches the
//! broker connection and codec, hooks and captures mutate the variable
//! bindings, and every later step observes the accumulated state. Contexts
//! are never shared between concurrent runs.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

use crate::broker::{BrokerConnection, PayloadCodec, Utf8Codec};

/// Identifier assigned to one virtual-user run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a fresh random identifier.
    #[must_use]
    pub fn new() -> Self { Self(Uuid::new_v4()) }

    /// Return the inner [`Uuid`].
    #[must_use]
    pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl Default for RunId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Helper function callable from templates and hooks.
pub type HelperFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Per-virtual-user mutable state.
///
/// Holds the variable bindings, the helper capability set, the run
/// identifier, and the active connection and codec once the init stage has
/// run. The helper functions are registered once here, at creation time,
/// and stay available to templates and hooks for the whole run.
pub struct ExecutionContext {
    /// Template variable bindings, mutated by hooks and captures.
    pub vars: HashMap<String, Value>,
    funcs: HashMap<&'static str, HelperFn>,
    uid: RunId,
    connection: Option<Arc<dyn BrokerConnection>>,
    codec: Arc<dyn PayloadCodec>,
}

impl ExecutionContext {
    /// Create a fresh context with an empty binding set and a new [`RunId`].
    #[must_use]
    pub fn new() -> Self {
        let uid = RunId::new();
        let mut funcs: HashMap<&'static str, HelperFn> = HashMap::new();
        funcs.insert("increment", Arc::new(increment));
        funcs.insert("decrement", Arc::new(decrement));
        funcs.insert(
            "contextUid",
            Arc::new(move |_: &Value| Value::String(uid.to_string())),
        );
        Self {
            vars: HashMap::new(),
            funcs,
            uid,
            connection: None,
            codec: Arc::new(Utf8Codec),
        }
    }

    /// Identifier of this run.
    #[must_use]
    pub fn uid(&self) -> RunId { self.uid }

    /// Look up a helper function by name.
    #[must_use]
    pub fn helper(&self, name: &str) -> Option<HelperFn> { self.funcs.get(name).cloned() }

    /// Names of the registered helper functions.
    pub fn helper_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.funcs.keys().copied()
    }

    /// The active broker connection, once the init stage has attached one.
    #[must_use]
    pub fn connection(&self) -> Option<Arc<dyn BrokerConnection>> { self.connection.clone() }

    /// The payload codec paired with the connection.
    #[must_use]
    pub fn codec(&self) -> Arc<dyn PayloadCodec> { self.codec.clone() }

    pub(crate) fn attach_connection(
        &mut self,
        connection: Arc<dyn BrokerConnection>,
        codec: Arc<dyn PayloadCodec>,
    ) {
        self.connection = Some(connection);
        self.codec = codec;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("uid", &self.uid)
            .field("vars", &self.vars)
            .field("connected", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

/// Increment an integer value; anything else yields null.
fn increment(value: &Value) -> Value {
    value
        .as_i64()
        .map_or(Value::Null, |n| Value::from(n.saturating_add(1)))
}

/// Decrement an integer value; anything else yields null.
fn decrement(value: &Value) -> Value {
    value
        .as_i64()
        .map_or(Value::Null, |n| Value::from(n.saturating_sub(1)))
}
