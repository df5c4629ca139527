//! Broker delegation link (component F).
//!
//! A `Broker` and a `Partition` hold strong references to each other
//! while delegated: the broker's `toppars` list keeps the partition
//! alive, and `Partition::leader` keeps the broker alive. That pair is
//! a genuine reference cycle — it is not collected automatically, and
//! is instead broken explicitly, atomically, by [`delegate`]. Anywhere
//! a partition with a leader is torn down, the caller must `delegate`
//! it to `None` first or the pair leaks.

use crate::handle::{shared_opt_ptr_eq, Shared};
use crate::partition::Partition;
use crate::topic::TopicWriteGuard;
use parking_lot::RwLock;

pub type NodeId = i32;

/// A broker node. Connection lifecycle, retries and batching belong to
/// the broker subsystem (§1, out of scope) — this type only tracks the
/// set of partitions currently delegated to it.
pub struct Broker {
    node_id: NodeId,
    toppars: RwLock<Vec<Shared<Partition>>>,
}

impl Broker {
    pub fn new(node_id: NodeId) -> Shared<Broker> {
        Shared::new(Broker {
            node_id,
            toppars: RwLock::new(Vec::new()),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn toppar_count(&self) -> usize {
        self.toppars.read().len()
    }

    /// A snapshot of the partitions currently delegated to this
    /// broker, for inspection and tests — invariant 4 says this length
    /// always equals `toppar_count`, which holds trivially here since
    /// both read the same list under the same lock.
    pub fn toppars(&self) -> Vec<Shared<Partition>> {
        self.toppars.read().clone()
    }

    pub fn has_toppar(&self, partition: &Shared<Partition>) -> bool {
        self.toppars
            .read()
            .iter()
            .any(|p| Shared::ptr_eq(p, partition))
    }
}

/// Collaborator interface: locate a known broker by node id (§6).
pub trait BrokerLookup: Send + Sync {
    fn find_by_node_id(&self, node_id: NodeId) -> Option<Shared<Broker>>;
}

/// Transfers a partition between brokers (§4.F). The caller must
/// already hold the topic's write lock — encoded here by requiring a
/// `TopicWriteGuard` witness rather than trusting call sites to order
/// their locking correctly.
pub fn delegate(
    _topic_guard: &TopicWriteGuard<'_>,
    partition: &Shared<Partition>,
    new_leader: Option<Shared<Broker>>,
) {
    let current = partition.leader();
    if shared_opt_ptr_eq(&current, &new_leader) {
        return;
    }

    // A temporary keep so `partition` survives the transitions below
    // even if every other reference to it is dropped mid-call.
    let _keepalive = partition.keep();

    if let Some(old) = current {
        let mut old_toppars = old.toppars.write();
        old_toppars.retain(|p| !Shared::ptr_eq(p, partition));
        drop(old_toppars);

        tracing::debug!(
            target: "BRKDELGT",
            node_id = old.node_id(),
            "unlinked partition from former leader"
        );

        *partition.leader_lock().write() = None;
        // `old`'s strong reference to `partition`, and `partition`'s
        // strong reference to `old`, both end here as their locals
        // drop — breaking the cycle atomically under `old`'s lock.
    }

    if let Some(new_leader) = new_leader {
        let mut new_toppars = new_leader.toppars.write();
        new_toppars.push(partition.keep());
        drop(new_toppars);

        tracing::debug!(
            target: "BRKDELGT",
            node_id = new_leader.node_id(),
            "delegated partition to new leader"
        );

        *partition.leader_lock().write() = Some(new_leader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopicConfig;
    use crate::partition::PartitionId;
    use crate::topic::Topic;
    use crate::wire::TopicName;

    fn fresh() -> (Shared<crate::topic::Topic>, Shared<Partition>) {
        let topic = Topic::new(TopicName::new("t"), TopicConfig::default());
        let partition = Partition::new(topic.keep(), PartitionId::Real(0));
        (topic, partition)
    }

    #[test]
    fn delegate_links_and_unlinks() {
        let (topic, partition) = fresh();
        let b7 = Broker::new(7);
        let b9 = Broker::new(9);

        {
            let guard = topic.write();
            delegate(&guard, &partition, Some(b7.keep()));
        }
        assert!(b7.has_toppar(&partition));
        assert_eq!(partition.leader().unwrap().node_id(), 7);

        {
            let guard = topic.write();
            delegate(&guard, &partition, Some(b9.keep()));
        }
        assert!(!b7.has_toppar(&partition));
        assert!(b9.has_toppar(&partition));
        assert_eq!(b7.toppar_count(), 0);
        assert_eq!(b9.toppar_count(), 1);
    }

    #[test]
    fn delegate_to_none_clears_leader() {
        let (topic, partition) = fresh();
        let b7 = Broker::new(7);

        {
            let guard = topic.write();
            delegate(&guard, &partition, Some(b7.keep()));
        }
        {
            let guard = topic.write();
            delegate(&guard, &partition, None);
        }
        assert!(partition.leader().is_none());
        assert_eq!(b7.toppar_count(), 0);
    }

    #[test]
    fn delegate_none_then_broker_equivalent_to_direct() {
        let (topic, partition) = fresh();
        let b7 = Broker::new(7);

        {
            let guard = topic.write();
            delegate(&guard, &partition, None);
            delegate(&guard, &partition, Some(b7.keep()));
        }
        assert_eq!(partition.leader().unwrap().node_id(), 7);
        assert_eq!(b7.toppar_count(), 1);
    }

    #[test]
    fn delegate_to_same_leader_is_a_noop() {
        let (topic, partition) = fresh();
        let b7 = Broker::new(7);

        {
            let guard = topic.write();
            delegate(&guard, &partition, Some(b7.keep()));
            delegate(&guard, &partition, Some(b7.keep()));
        }
        assert_eq!(b7.toppar_count(), 1);
    }
}
