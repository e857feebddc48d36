//! Broker-client seam used by compiled steps.
//!
//! The engine never speaks the wire protocol itself. A harness supplies a
//! [`BrokerConnector`] which produces one [`BrokerConnection`] per run;
//! compiled steps publish, flush, and request through that connection,
//! translating rendered payload text to wire bytes with a [`PayloadCodec`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::RunConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by broker operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BrokerError {
    /// Establishing the connection failed.
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] BoxError),
    /// A publish could not be handed to the broker.
    #[error("publish to `{subject}` failed")]
    Publish {
        /// Target subject of the failed publish.
        subject: String,
        /// Underlying client failure.
        #[source]
        source: BoxError,
    },
    /// The delivery-confirmation round trip failed.
    #[error("flush failed")]
    Flush(#[source] BoxError),
    /// A request-reply call failed in transit.
    #[error("request to `{subject}` failed")]
    Request {
        /// Target subject of the failed request.
        subject: String,
        /// Underlying client failure.
        #[source]
        source: BoxError,
    },
    /// No reply arrived within the configured timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// A step ran before the connection init stage.
    #[error("broker connection used before initialisation")]
    NotConnected,
}

/// Options for a request-reply round trip.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// How long the client waits for the reply.
    pub timeout: Duration,
    /// Protocol headers attached to the request.
    pub headers: HashMap<String, String>,
}

/// Reply produced by a request-reply round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Raw reply payload bytes.
    pub payload: Bytes,
    /// Reply headers, empty when the broker carried none.
    pub headers: HashMap<String, String>,
}

/// One established broker connection, exclusively owned by one run.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Publish `payload` to `subject` with no reply expected.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError>;

    /// Force a delivery-confirmation round trip with the broker.
    async fn flush(&self) -> Result<(), BrokerError>;

    /// Publish and await a single correlated reply or timeout expiry.
    ///
    /// Implementations enforce `options.timeout` themselves and report
    /// expiry as [`BrokerError::Timeout`].
    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<Reply, BrokerError>;
}

/// Factory establishing one connection per scenario run.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect to the broker named by `config`.
    async fn connect(&self, config: &RunConfig) -> Result<Arc<dyn BrokerConnection>, BrokerError>;
}

/// Text codec between rendered payloads and wire bytes.
pub trait PayloadCodec: Send + Sync {
    /// Encode rendered payload text into wire bytes.
    fn encode(&self, text: &str) -> Bytes;

    /// Decode reply bytes into text.
    fn decode(&self, payload: &Bytes) -> String;
}

/// UTF-8 text codec.
///
/// Decoding is lossy so malformed reply bytes degrade to replacement
/// characters instead of failing the step.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Codec;

impl PayloadCodec for Utf8Codec {
    fn encode(&self, text: &str) -> Bytes { Bytes::copy_from_slice(text.as_bytes()) }

    fn decode(&self, payload: &Bytes) -> String { String::from_utf8_lossy(payload).into_owned() }
}

pub mod loopback {
    //! In-process echo broker for demos and dry runs.
    //!
    //! Accepts every publish and answers requests by echoing the payload
    //! back, so scenarios can be exercised without a reachable broker.

    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::{BrokerConnection, BrokerConnector, BrokerError, Reply, RequestOptions};
    use crate::config::RunConfig;

    /// Connector handing out [`LoopbackBroker`] connections.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct LoopbackConnector;

    #[async_trait]
    impl BrokerConnector for LoopbackConnector {
        async fn connect(
            &self,
            config: &RunConfig,
        ) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
            tracing::debug!(server = %config.server, "loopback connect");
            Ok(Arc::new(LoopbackBroker))
        }
    }

    /// Broker that accepts every publish and echoes request payloads back.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct LoopbackBroker;

    #[async_trait]
    impl BrokerConnection for LoopbackBroker {
        async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BrokerError> {
            tracing::debug!(subject, bytes = payload.len(), "loopback publish");
            Ok(())
        }

        async fn flush(&self) -> Result<(), BrokerError> { Ok(()) }

        async fn request(
            &self,
            subject: &str,
            payload: Bytes,
            options: RequestOptions,
        ) -> Result<Reply, BrokerError> {
            tracing::debug!(subject, bytes = payload.len(), "loopback request");
            Ok(Reply {
                payload,
                headers: options.headers,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{PayloadCodec, Utf8Codec};

    #[test]
    fn utf8_codec_round_trips_text() {
        let codec = Utf8Codec;
        let bytes = codec.encode("ping");
        assert_eq!(codec.decode(&bytes), "ping");
    }

    #[test]
    fn utf8_codec_decodes_malformed_bytes_lossily() {
        let codec = Utf8Codec;
        let decoded = codec.decode(&Bytes::from_static(&[0x70, 0xff, 0x6f]));
        assert_eq!(decoded, "p\u{fffd}o");
    }
}
