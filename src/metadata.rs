//! The metadata applier (component E): translates facts reported by the
//! metadata subsystem into structural mutations of a `Topic`.

use crate::broker::{delegate, BrokerLookup, NodeId};
use crate::error::{Error, Result};
use crate::handle::Shared;
use crate::partition::PartitionId;
use crate::registry::Client;

/// `topic_update(name, partition, leader_id)` (§4.E).
pub fn topic_update(
    client: &Client,
    brokers: &dyn BrokerLookup,
    name: &str,
    partition: u32,
    leader_id: Option<NodeId>,
) {
    let topic = match client.find(name) {
        Some(t) => t,
        None => {
            tracing::debug!(target: "TOPICUPD", topic = name, "unknown topic, ignoring");
            return;
        }
    };

    let guard = topic.write();
    let partition = match guard.lookup_partition(PartitionId::Real(partition), false) {
        Some(p) => p,
        None => {
            tracing::debug!(
                target: "TOPICUPD",
                topic = name,
                partition,
                "unknown partition, ignoring"
            );
            return;
        }
    };

    // The wire sentinel `-1` means "no leader" just as much as a bare
    // `None` does — both take the same "delegate to nothing, requery"
    // path regardless of whether a broker happens to be registered
    // under node id -1.
    let leader_known = leader_id.filter(|&id| id != -1);
    let broker = leader_known.and_then(|id| brokers.find_by_node_id(id));

    match broker {
        None => {
            // `tracing` has no "notice" level; a plain "no leader yet"
            // (-1) is a debug-level fact, while a broker we can't
            // resolve locally is worth an `info`-level signal.
            if leader_known.is_none() {
                tracing::debug!(target: "TOPICUPD", topic = name, partition = partition.id().to_wire(), "leader unknown, delegating to none and requerying");
            } else {
                tracing::info!(target: "TOPICUPD", topic = name, partition = partition.id().to_wire(), node_id = ?leader_id, "leader broker not known locally, delegating to none and requerying");
            }
            delegate(&guard, &partition, None);
            client.queryer().request_topic_leader_query(name);
        }
        Some(broker) => {
            let unchanged = partition
                .leader()
                .map_or(false, |current| Shared::ptr_eq(&current, &broker));
            if unchanged {
                return;
            }
            delegate(&guard, &partition, Some(broker));
        }
    }
}

/// `partition_count_update(name, N')` (§4.E).
pub fn partition_count_update(client: &Client, name: &str, new_count: u32) -> Result<bool> {
    let topic = client.find(name).ok_or_else(|| {
        tracing::debug!(target: "METADATA", topic = name, "partition count update for unknown topic");
        Error::UnknownTopic
    })?;
    let mut guard = topic.write();
    Ok(guard.resize(&topic, new_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use crate::partitioner::UniformRandomPartitioner;
    use crate::registry::{Client, NullMetadataQueryer};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FixedBrokers(Mutex<Vec<Shared<crate::broker::Broker>>>);

    impl BrokerLookup for FixedBrokers {
        fn find_by_node_id(&self, node_id: NodeId) -> Option<Shared<crate::broker::Broker>> {
            self.0
                .lock()
                .iter()
                .find(|b| b.node_id() == node_id)
                .map(Shared::keep)
        }
    }

    struct RecordingQueryer(Mutex<Vec<String>>);

    impl crate::registry::MetadataQueryer for RecordingQueryer {
        fn request_topic_leader_query(&self, topic: &str) {
            self.0.lock().push(topic.to_owned());
        }
    }

    fn client_with_queryer() -> (Client, Arc<RecordingQueryer>) {
        let queryer = Arc::new(RecordingQueryer(Mutex::new(Vec::new())));
        let client = Client::new(Arc::new(UniformRandomPartitioner), queryer.clone());
        (client, queryer)
    }

    #[test]
    fn grow_adopts_desired_partition_through_applier() {
        let (client, _q) = client_with_queryer();
        let topic = client.create_or_find("t", None).unwrap();
        let p3 = {
            let mut w = topic.write();
            w.desired_add(&topic, 3)
        };

        assert!(partition_count_update(&client, "t", 4).unwrap());

        let r = topic.read();
        let installed = r.lookup_partition(PartitionId::Real(3), false).unwrap();
        assert!(Shared::ptr_eq(&installed, &p3));
        assert!(r.desired().is_empty());
    }

    #[test]
    fn unknown_topic_returns_error() {
        let (client, _q) = client_with_queryer();
        assert_eq!(
            partition_count_update(&client, "missing", 1),
            Err(Error::UnknownTopic)
        );
    }

    #[test]
    fn leader_migration_moves_broker_links() {
        let (client, _q) = client_with_queryer();
        let topic = client.create_or_find("t", None).unwrap();
        partition_count_update(&client, "t", 1).unwrap();

        let b7 = Broker::new(7);
        let b9 = Broker::new(9);
        let brokers = FixedBrokers(Mutex::new(vec![b7.keep(), b9.keep()]));

        topic_update(&client, &brokers, "t", 0, Some(7));
        assert_eq!(b7.toppar_count(), 1);

        topic_update(&client, &brokers, "t", 0, Some(9));
        assert_eq!(b7.toppar_count(), 0);
        assert_eq!(b9.toppar_count(), 1);

        let r = topic.read();
        let p0 = r.lookup_partition(PartitionId::Real(0), false).unwrap();
        assert_eq!(p0.leader().unwrap().node_id(), 9);
    }

    #[test]
    fn lost_leader_clears_and_triggers_one_requery() {
        let (client, q) = client_with_queryer();
        client.create_or_find("t", None).unwrap();
        partition_count_update(&client, "t", 1).unwrap();

        let brokers = FixedBrokers(Mutex::new(vec![]));
        topic_update(&client, &brokers, "t", 0, Some(-1));

        let topic = client.find("t").unwrap();
        let r = topic.read();
        let p0 = r.lookup_partition(PartitionId::Real(0), false).unwrap();
        assert!(p0.leader().is_none());
        assert_eq!(q.0.lock().as_slice(), &["t".to_owned()]);
    }
}
