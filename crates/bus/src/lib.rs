//! Kafka-backed bus producer
//!
//! Submits envelopes to Kafka and reports delivery outcome on a per-send
//! oneshot channel, per SPEC_FULL.md §4.4. Grounded on the Nova
//! transactional-outbox library's `KafkaOutboxPublisher` (same
//! `FutureProducer`/`FutureRecord` shape, same routing-key-for-ordering
//! idea), adapted to a oneshot-per-send contract instead of an
//! await-then-mark-published loop.

use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error};
use userdir_core::models::Envelope;

#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("kafka submission failed: {0}")]
    Submission(String),
    #[error("delivery outcome channel dropped before a result arrived")]
    ChannelClosed,
}

/// Long-lived Kafka producer handle. Constructed once per process and
/// closed only at shutdown.
pub struct BusProducer {
    producer: FutureProducer,
}

impl BusProducer {
    pub fn new(bootstrap_servers: &str) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .create()?;

        Ok(Self { producer })
    }

    /// Submit an envelope. Returns immediately with a receiver that
    /// resolves exactly once with the delivery outcome.
    pub fn produce(&self, envelope: Envelope) -> oneshot::Receiver<Result<(), ProduceError>> {
        let (tx, rx) = oneshot::channel();
        let producer = self.producer.clone();

        tokio::spawn(async move {
            let key = envelope.key.clone();
            let record = FutureRecord::to(&envelope.topic)
                .key(&key)
                .payload(&envelope.value);

            let result = producer
                .send(record, Duration::from_secs(30))
                .await
                .map(|_| ())
                .map_err(|(err, _)| ProduceError::Submission(err.to_string()));

            match &result {
                Ok(()) => debug!(msg_id = %envelope.id, topic = %envelope.topic, "delivered to kafka"),
                Err(e) => error!(msg_id = %envelope.id, topic = %envelope.topic, error = %e, "kafka delivery failed"),
            }

            let _ = tx.send(result);
        });

        rx
    }

    /// Flush any buffered messages before shutdown.
    pub fn close(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            error!(error = %e, "failed to flush kafka producer on shutdown");
        }
    }
}
