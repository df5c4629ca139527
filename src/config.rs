//! Producer/consumer option snapshot held by a `Topic` (§3).

use crate::error::Error;
use crate::partitioner::{Partitioner, UniformRandomPartitioner};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// The process-wide uniform-random partitioner instance handed out by
/// `TopicConfig::default` — it carries no per-topic state worth
/// duplicating, so every caller that doesn't supply its own shares one.
static DEFAULT_PARTITIONER: Lazy<Arc<dyn Partitioner>> =
    Lazy::new(|| Arc::new(UniformRandomPartitioner));

/// Default message delivery timeout, matching the conventional Kafka
/// producer default.
pub const DEFAULT_MESSAGE_TIMEOUT_MILLIS: i64 = 300_000;
/// Default per-request timeout to a broker.
pub const DEFAULT_REQUEST_TIMEOUT_MILLIS: i64 = 30_000;

/// A snapshot of producer/consumer options. The core only consults
/// `message_timeout_ms` and `request_timeout_ms` for validation — they
/// are otherwise opaque values consumed by the broker subsystem (§5,
/// Cancellation / timeouts).
#[derive(Clone)]
pub struct TopicConfig {
    pub message_timeout_ms: i64,
    pub request_timeout_ms: i64,
    pub partitioner: Arc<dyn Partitioner>,
}

impl TopicConfig {
    pub fn new(partitioner: Arc<dyn Partitioner>) -> Self {
        TopicConfig {
            message_timeout_ms: DEFAULT_MESSAGE_TIMEOUT_MILLIS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MILLIS,
            partitioner,
        }
    }

    pub fn with_message_timeout_ms(mut self, ms: i64) -> Self {
        self.message_timeout_ms = ms;
        self
    }

    pub fn with_request_timeout_ms(mut self, ms: i64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// §4.D: reject configurations with non-positive timeouts. An empty
    /// topic name is rejected separately, by the registry, since the
    /// name itself does not live on this struct.
    pub fn validate(&self) -> Result<(), Error> {
        if self.message_timeout_ms <= 0 {
            return Err(Error::InvalidArgument(
                "message_timeout_ms must be positive".into(),
            ));
        }
        if self.request_timeout_ms <= 0 {
            return Err(Error::InvalidArgument(
                "request_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicConfig::new(DEFAULT_PARTITIONER.clone())
    }
}
