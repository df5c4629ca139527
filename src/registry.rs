//! The client registry (component D): a process-local table of live
//! topics, scoped to an explicit `Client` handle rather than a global
//! (§9 design note — there is no implicit process-wide state here).

use crate::config::TopicConfig;
use crate::error::{Error, Result};
use crate::handle::Shared;
use crate::topic::Topic;
use crate::wire::{TopicName, WireString};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Fire-and-forget async metadata re-query (collaborator
/// `topic_leader_query`, §6). The core never awaits this — it only
/// asks for the request to be scheduled.
pub trait MetadataQueryer: Send + Sync {
    fn request_topic_leader_query(&self, topic: &str);
}

/// A `MetadataQueryer` that drops every request on the floor. Handy as
/// a default for tests that don't care about re-queries.
#[derive(Default)]
pub struct NullMetadataQueryer;

impl MetadataQueryer for NullMetadataQueryer {
    fn request_topic_leader_query(&self, _topic: &str) {}
}

/// A `MetadataQueryer` backed by an unbounded channel, draining into a
/// background task — the shape a real client would use to hand the
/// request off to its metadata poller without blocking the caller.
pub struct ChannelMetadataQueryer {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl ChannelMetadataQueryer {
    /// Spawns the background drain task on the given runtime handle and
    /// hands every received topic name to `on_request`.
    pub fn spawn<F>(handle: &tokio::runtime::Handle, mut on_request: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        handle.spawn(async move {
            while let Some(topic) = rx.recv().await {
                on_request(topic);
            }
        });
        ChannelMetadataQueryer { tx }
    }
}

impl MetadataQueryer for ChannelMetadataQueryer {
    fn request_topic_leader_query(&self, topic: &str) {
        // Fire-and-forget: a closed receiver (poller shut down) is not
        // an error the caller needs to hear about.
        let _ = self.tx.send(topic.to_owned());
    }
}

/// Process-local (well, `Client`-local) table of live topics.
pub struct Client {
    topics: Mutex<HashMap<String, Shared<Topic>>>,
    default_partitioner: Arc<dyn crate::partitioner::Partitioner>,
    queryer: Arc<dyn MetadataQueryer>,
}

impl Client {
    pub fn new(
        default_partitioner: Arc<dyn crate::partitioner::Partitioner>,
        queryer: Arc<dyn MetadataQueryer>,
    ) -> Self {
        Client {
            topics: Mutex::new(HashMap::new()),
            default_partitioner,
            queryer,
        }
    }

    pub fn queryer(&self) -> &Arc<dyn MetadataQueryer> {
        &self.queryer
    }

    /// `create_or_find(name, config)` (§4.D). Validates `config` and
    /// rejects an empty name before ever touching the registry lock.
    pub fn create_or_find(&self, name: &str, config: Option<TopicConfig>) -> Result<Shared<Topic>> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("topic name must not be empty".into()));
        }

        let config = config.unwrap_or_else(|| TopicConfig::new(self.default_partitioner.clone()));
        config.validate()?;

        let mut topics = self.topics.lock();
        if let Some(existing) = topics.get(name) {
            tracing::debug!(target: "TOPIC", topic = name, "found existing topic");
            return Ok(existing.keep());
        }

        let topic = Topic::new(TopicName::new(name), config);
        topics.insert(name.to_owned(), topic.keep());
        Ok(topic)
    }

    pub fn find(&self, name: &str) -> Option<Shared<Topic>> {
        self.topics.lock().get(name).map(Shared::keep)
    }

    /// `find_by_protocol_string(s)` (§4.D) — compares by length + bytes,
    /// since the wire form is not NUL-terminated and a C-string
    /// primitive would read past or short of its real extent.
    pub fn find_by_protocol_string(&self, wire: &WireString) -> Option<Shared<Topic>> {
        self.topics
            .lock()
            .values()
            .find(|t| t.name().matches_wire(wire))
            .map(Shared::keep)
    }

    /// Explicit teardown in the order the design notes prescribe: the
    /// metadata applier and broker I/O threads are assumed already
    /// stopped by the time this runs. Calls `remove_all_partitions` on
    /// every topic — the only thing that actually breaks the Topic↔
    /// Partition ownership cycle — before dropping the registry's own
    /// references.
    pub fn shutdown(&self) {
        let mut topics = self.topics.lock();
        for (_, topic) in topics.drain() {
            let mut guard = topic.write();
            guard.remove_all_partitions(&topic);
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.lock().len()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown();
    }
}
