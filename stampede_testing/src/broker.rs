//! Scripted in-memory broker with failure injection.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use stampede::{
    BrokerConnection,
    BrokerConnector,
    BrokerError,
    Reply,
    RequestOptions,
    RunConfig,
};

use crate::processors::CallLog;

/// Behaviour of the scripted broker for each operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrokerScript {
    /// Publishes succeed and requests echo their payload back.
    #[default]
    Echo,
    /// Publish calls fail.
    FailPublish,
    /// Publishes succeed but the flush round trip fails.
    FailFlush,
    /// Requests never receive a reply, so the timeout expires.
    NeverReply,
    /// Connection establishment fails; no run ever gets a connection.
    RefuseConnect,
}

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    /// Subject the payload went to.
    pub subject: String,
    /// Payload text as decoded from the wire bytes.
    pub payload: String,
}

/// One recorded request, including the options the engine passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Subject the request went to.
    pub subject: String,
    /// Payload text as decoded from the wire bytes.
    pub payload: String,
    /// Headers attached to the request.
    pub headers: HashMap<String, String>,
    /// Timeout the engine asked for, in milliseconds.
    pub timeout_ms: u128,
}

/// Connector handing out scripted connections that share their records
/// with the test.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConnector {
    script: BrokerScript,
    published: Arc<Mutex<Vec<PublishRecord>>>,
    requests: Arc<Mutex<Vec<RequestRecord>>>,
    reply_body: Option<String>,
    reply_headers: HashMap<String, String>,
    log: Option<CallLog>,
}

impl ScriptedConnector {
    /// Create a connector following `script`.
    #[must_use]
    pub fn new(script: BrokerScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Reply with `body` instead of echoing the request payload.
    #[must_use]
    pub fn with_reply(mut self, body: impl Into<String>) -> Self {
        self.reply_body = Some(body.into());
        self
    }

    /// Attach `headers` to every reply.
    #[must_use]
    pub fn with_reply_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.reply_headers.insert(name.into(), value.into());
        self
    }

    /// Record network operations on `log`, interleaved with hook entries.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Publishes recorded so far, across all connections handed out.
    #[must_use]
    pub fn published(&self) -> Vec<PublishRecord> {
        self.published.lock().expect("broker records poisoned").clone()
    }

    /// Requests recorded so far, across all connections handed out.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.requests.lock().expect("broker records poisoned").clone()
    }
}

#[async_trait]
impl BrokerConnector for ScriptedConnector {
    async fn connect(
        &self,
        _config: &RunConfig,
    ) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
        if self.script == BrokerScript::RefuseConnect {
            return Err(BrokerError::Connect("scripted connection refusal".into()));
        }
        Ok(Arc::new(ScriptedBroker {
            script: self.script,
            published: Arc::clone(&self.published),
            requests: Arc::clone(&self.requests),
            reply_body: self.reply_body.clone(),
            reply_headers: self.reply_headers.clone(),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedBroker {
    script: BrokerScript,
    published: Arc<Mutex<Vec<PublishRecord>>>,
    requests: Arc<Mutex<Vec<RequestRecord>>>,
    reply_body: Option<String>,
    reply_headers: HashMap<String, String>,
    log: Option<CallLog>,
}

impl ScriptedBroker {
    fn record(&self, entry: &str) {
        if let Some(log) = &self.log {
            log.record(entry);
        }
    }
}

#[async_trait]
impl BrokerConnection for ScriptedBroker {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError> {
        if self.script == BrokerScript::FailPublish {
            return Err(BrokerError::Publish {
                subject: subject.to_owned(),
                source: "scripted publish failure".into(),
            });
        }
        self.record("publish");
        self.published
            .lock()
            .expect("broker records poisoned")
            .push(PublishRecord {
                subject: subject.to_owned(),
                payload: String::from_utf8_lossy(&payload).into_owned(),
            });
        Ok(())
    }

    async fn flush(&self) -> Result<(), BrokerError> {
        if self.script == BrokerScript::FailFlush {
            return Err(BrokerError::Flush("scripted flush failure".into()));
        }
        self.record("flush");
        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<Reply, BrokerError> {
        if self.script == BrokerScript::NeverReply {
            tokio::time::sleep(options.timeout).await;
            return Err(BrokerError::Timeout(options.timeout));
        }
        self.record("request");
        let text = String::from_utf8_lossy(&payload).into_owned();
        self.requests
            .lock()
            .expect("broker records poisoned")
            .push(RequestRecord {
                subject: subject.to_owned(),
                payload: text.clone(),
                headers: options.headers,
                timeout_ms: options.timeout.as_millis(),
            });
        let body = self.reply_body.clone().unwrap_or(text);
        Ok(Reply {
            payload: Bytes::from(body.into_bytes()),
            headers: self.reply_headers.clone(),
        })
    }
}
