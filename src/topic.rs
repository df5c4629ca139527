//! The topic object (component C).

use crate::broker::delegate;
use crate::config::TopicConfig;
use crate::error::{Error, Result};
use crate::handle::Shared;
use crate::message::MessageQueue;
use crate::partition::{Partition, PartitionId};
use crate::partitioner::resolve as resolve_partition;
use crate::wire::TopicName;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct TopicInner {
    /// Dense array; invariant 1 says `partitions[i].id() == Real(i)`.
    partitions: Vec<Shared<Partition>>,
    /// Application-requested partitions not yet known from metadata.
    desired: Vec<Shared<Partition>>,
    /// The unassigned holding slot. `None` only after teardown.
    unassigned: Option<Shared<Partition>>,
}

/// Named (topic, partition) stream sharing one configuration (§3).
pub struct Topic {
    name: TopicName,
    config: TopicConfig,
    inner: RwLock<TopicInner>,
}

impl Topic {
    /// Creates a brand new topic, including its unassigned slot. Does
    /// not register it anywhere — that is the client registry's job
    /// (component D), which is also where config validation happens so
    /// the empty-name check (stored on the registry key, not here) can
    /// run alongside it.
    pub fn new(name: TopicName, config: TopicConfig) -> Shared<Topic> {
        let topic = Shared::new(Topic {
            name,
            config,
            inner: RwLock::new(TopicInner {
                partitions: Vec::new(),
                desired: Vec::new(),
                unassigned: None,
            }),
        });

        let ua = Partition::new(topic.keep(), PartitionId::Unassigned);
        topic.inner.write().unassigned = Some(ua);

        tracing::debug!(target: "TOPIC", topic = %topic.name, "created");
        topic
    }

    pub fn name(&self) -> &TopicName {
        &self.name
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }

    pub fn partition_count(&self) -> usize {
        self.inner.read().partitions.len()
    }

    pub fn read(&self) -> TopicReadGuard<'_> {
        TopicReadGuard {
            guard: self.inner.read(),
        }
    }

    pub fn write(&self) -> TopicWriteGuard<'_> {
        TopicWriteGuard {
            guard: self.inner.write(),
        }
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("partitions", &self.inner.read().partitions.len())
            .finish()
    }
}

fn lookup_partition_in(
    inner: &TopicInner,
    id: PartitionId,
    ua_on_miss: bool,
) -> Option<Shared<Partition>> {
    match id {
        PartitionId::Real(n) => match inner.partitions.get(n as usize) {
            Some(p) => Some(p.keep()),
            None if ua_on_miss => inner.unassigned.as_ref().map(Shared::keep),
            None => None,
        },
        PartitionId::Unassigned => inner.unassigned.as_ref().map(Shared::keep),
    }
}

fn desired_lookup_in(inner: &TopicInner, id: u32) -> Option<Shared<Partition>> {
    inner
        .desired
        .iter()
        .find(|p| p.id() == PartitionId::Real(id))
        .map(Shared::keep)
}

/// A read-locked view of a topic's structure.
pub struct TopicReadGuard<'a> {
    guard: RwLockReadGuard<'a, TopicInner>,
}

impl<'a> TopicReadGuard<'a> {
    /// `lookup_partition(id, ua_on_miss)` (§4.C). The returned handle is
    /// kept; the caller owns the drop.
    pub fn lookup_partition(&self, id: PartitionId, ua_on_miss: bool) -> Option<Shared<Partition>> {
        lookup_partition_in(&self.guard, id, ua_on_miss)
    }

    pub fn desired_lookup(&self, id: u32) -> Option<Shared<Partition>> {
        desired_lookup_in(&self.guard, id)
    }

    pub fn partition_count(&self) -> usize {
        self.guard.partitions.len()
    }

    pub fn unassigned(&self) -> Option<Shared<Partition>> {
        self.guard.unassigned.as_ref().map(Shared::keep)
    }

    pub fn partitions(&self) -> Vec<Shared<Partition>> {
        self.guard.partitions.iter().map(Shared::keep).collect()
    }

    pub fn desired(&self) -> Vec<Shared<Partition>> {
        self.guard.desired.iter().map(Shared::keep).collect()
    }
}

/// A write-locked view of a topic's structure — the witness type every
/// structural mutation (desired add/remove, resize, delegate, ua move,
/// teardown) requires as proof the caller holds the write lock (§9
/// design note).
pub struct TopicWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, TopicInner>,
}

impl<'a> TopicWriteGuard<'a> {
    pub fn lookup_partition(&self, id: PartitionId, ua_on_miss: bool) -> Option<Shared<Partition>> {
        lookup_partition_in(&self.guard, id, ua_on_miss)
    }

    pub fn desired_lookup(&self, id: u32) -> Option<Shared<Partition>> {
        desired_lookup_in(&self.guard, id)
    }

    pub fn partition_count(&self) -> usize {
        self.guard.partitions.len()
    }

    pub fn unassigned(&self) -> Option<Shared<Partition>> {
        self.guard.unassigned.as_ref().map(Shared::keep)
    }

    pub fn partitions(&self) -> Vec<Shared<Partition>> {
        self.guard.partitions.iter().map(Shared::keep).collect()
    }

    /// `desired_add(id)` (§4.C) — idempotent.
    pub fn desired_add(&mut self, owner: &Shared<Topic>, id: u32) -> Shared<Partition> {
        if let Some(p) = lookup_partition_in(&self.guard, PartitionId::Real(id), false) {
            p.set_desired();
            tracing::debug!(target: "DESP", topic = %owner.name(), partition = id, "marked existing partition desired");
            return p;
        }

        if let Some(p) = desired_lookup_in(&self.guard, id) {
            tracing::debug!(target: "DESP", topic = %owner.name(), partition = id, "already on desired list");
            return p;
        }

        let p = Partition::new(owner.keep(), PartitionId::Real(id));
        p.set_desired();
        p.set_unknown();
        self.guard.desired.push(p.keep());

        tracing::debug!(target: "DESP", topic = %owner.name(), partition = id, "created new desired partition");
        p
    }

    /// `desired_remove(partition)` (§4.C) — idempotent.
    pub fn desired_remove(&mut self, owner: &Shared<Topic>, partition: &Shared<Partition>) {
        partition.clear_desired();

        if partition.is_unknown() {
            let before = self.guard.desired.len();
            self.guard
                .desired
                .retain(|p| !Shared::ptr_eq(p, partition));
            if self.guard.desired.len() != before {
                tracing::debug!(target: "DESP", topic = %owner.name(), "unlinked partition from desired list");
            }
        }
    }

    /// `ua_move_msgs(mq)` (§4.C). Fails with
    /// [`Error::NoUnassignedPartition`] if there is no unassigned slot
    /// (the topic has been torn down).
    pub fn ua_move_msgs(&self, mq: &MessageQueue) -> Result<()> {
        match self.guard.unassigned.as_ref() {
            Some(ua) => {
                ua.msgq.move_from(mq);
                Ok(())
            }
            None => Err(Error::NoUnassignedPartition),
        }
    }

    /// `remove_all_partitions()` (§4.C). Purges every message queue,
    /// breaks every broker delegation, and drops the topic's own
    /// references to its partitions and its unassigned slot.
    ///
    /// This is the only thing that actually breaks the Topic↔Partition
    /// reference cycle (see `broker.rs` for the matching Partition↔
    /// Broker case) — nothing here happens automatically from a plain
    /// `Drop`, since the cycle means the refcount never reaches zero on
    /// its own.
    pub fn remove_all_partitions(&mut self, owner: &Shared<Topic>) {
        // Drain into owned `Vec`s first: a live `Drain` holds `self.guard`
        // borrowed for the whole loop, which collides with `delegate`'s
        // own `&self` reborrow on every iteration.
        let partitions: Vec<_> = self.guard.partitions.drain(..).collect();
        for p in partitions {
            p.msgq.purge();
            p.xmit_msgq.purge();
            p.fetchq.purge();
            delegate(self, &p, None);
        }
        let desired: Vec<_> = self.guard.desired.drain(..).collect();
        for p in desired {
            p.msgq.purge();
            p.xmit_msgq.purge();
            p.fetchq.purge();
            delegate(self, &p, None);
        }
        if let Some(ua) = self.guard.unassigned.take() {
            ua.msgq.purge();
            ua.fetchq.purge();
        }

        tracing::debug!(target: "TOPIC", topic = %owner.name(), "removed all partitions");
    }

    /// `assign_unassigned()` (§4.C). Reruns the partitioner over every
    /// message currently in `unassigned.msgq`; messages the partitioner
    /// reports unavailable for are prepended back, in order (§5).
    pub fn assign_unassigned(&self, owner: &Shared<Topic>) {
        let ua = match self.guard.unassigned.as_ref() {
            Some(ua) => ua.keep(),
            None => return,
        };

        let available: Vec<u32> = self
            .guard
            .partitions
            .iter()
            .filter_map(|p| match p.id() {
                PartitionId::Real(n) => Some(n),
                PartitionId::Unassigned => None,
            })
            .collect();

        let messages = ua.msgq.drain_all();
        let total = messages.len();
        let mut failed = MessageQueue::new();
        let mut routed = 0usize;

        for msg in messages {
            let key = msg.key.as_deref();
            match resolve_partition(&*owner.config().partitioner, owner.name().as_str(), key, &available) {
                Some(PartitionId::Real(n)) => {
                    if let Some(p) = lookup_partition_in(&self.guard, PartitionId::Real(n), false) {
                        p.msgq.enqueue_tail(msg);
                        routed += 1;
                    } else {
                        failed.enqueue_tail(msg);
                    }
                }
                _ => failed.enqueue_tail(msg),
            }
        }

        // Cosmetic bug preserved from the source (§9 open question):
        // this reports `ua.msgq.len()`, which is already back to zero
        // by the time we log, rather than the failed count.
        tracing::debug!(
            target: "ASSIGNUA",
            topic = %owner.name(),
            total,
            routed,
            ua_len = ua.msgq.len(),
            "reassigned unassigned messages"
        );

        ua.msgq.splice_head(&failed);
    }

    /// The resize half of `partition_count_update` (§4.E). Returns
    /// `true` iff the count actually changed.
    pub(crate) fn resize(&mut self, owner: &Shared<Topic>, new_count: u32) -> bool {
        let old_count = self.guard.partitions.len() as u32;
        if new_count == old_count {
            return false;
        }

        let mut new_partitions = Vec::with_capacity(new_count as usize);

        for i in 0..new_count.min(old_count) {
            new_partitions.push(self.guard.partitions[i as usize].keep());
        }

        if new_count > old_count {
            for i in old_count..new_count {
                if let Some(p) = desired_lookup_in(&self.guard, i) {
                    p.clear_unknown();
                    self.guard.desired.retain(|d| !Shared::ptr_eq(d, &p));
                    new_partitions.push(p);
                } else {
                    new_partitions.push(Partition::new(owner.keep(), PartitionId::Real(i)));
                }
            }
        } else {
            for i in new_count..old_count {
                let obsolete = self.guard.partitions[i as usize].keep();

                let drained_into_ua = match self.guard.unassigned.as_ref() {
                    Some(ua) => {
                        ua.msgq.move_from(&obsolete.msgq);
                        true
                    }
                    None => false,
                };
                if !drained_into_ua {
                    obsolete.msgq.purge();
                }
                obsolete.xmit_msgq.purge();
                obsolete.fetchq.purge();

                if obsolete.is_desired() {
                    obsolete.set_unknown();
                    self.guard.desired.push(obsolete.keep());
                }

                delegate(self, &obsolete, None);
            }
        }

        self.guard.partitions = new_partitions;

        tracing::debug!(
            target: "PARTCNT",
            topic = %owner.name(),
            old_count,
            new_count,
            "partition count changed"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn fresh() -> Shared<Topic> {
        Topic::new(TopicName::new("t"), TopicConfig::default())
    }

    #[test]
    fn ua_move_msgs_fails_once_unassigned_slot_is_torn_down() {
        let topic = fresh();
        let mq = MessageQueue::new();
        mq.enqueue_tail(Message::new(None, None, 1));

        assert!(topic.write().ua_move_msgs(&mq).is_ok());

        {
            let mut w = topic.write();
            w.remove_all_partitions(&topic);
        }

        let mq2 = MessageQueue::new();
        mq2.enqueue_tail(Message::new(None, None, 2));
        assert_eq!(
            topic.write().ua_move_msgs(&mq2),
            Err(crate::error::Error::NoUnassignedPartition)
        );
    }

    #[test]
    fn invariant_dense_ids_hold_after_grow() {
        let topic = fresh();
        {
            let mut w = topic.write();
            w.resize(&topic, 4);
        }
        let r = topic.read();
        for (i, p) in r.partitions().into_iter().enumerate() {
            assert_eq!(p.id(), PartitionId::Real(i as u32));
        }
    }

    #[test]
    fn grow_adopts_desired_partition() {
        let topic = fresh();
        let p3 = {
            let mut w = topic.write();
            w.desired_add(&topic, 3)
        };

        {
            let mut w = topic.write();
            w.resize(&topic, 4);
        }

        let r = topic.read();
        let installed = r.lookup_partition(PartitionId::Real(3), false).unwrap();
        assert!(Shared::ptr_eq(&installed, &p3));
        assert!(installed.is_desired());
        assert!(!installed.is_unknown());
        assert!(r.desired().is_empty());
    }

    #[test]
    fn shrink_preserves_messages_in_unassigned() {
        let topic = fresh();
        {
            let mut w = topic.write();
            w.resize(&topic, 4);
        }

        {
            let r = topic.read();
            let p2 = r.lookup_partition(PartitionId::Real(2), false).unwrap();
            let p3 = r.lookup_partition(PartitionId::Real(3), false).unwrap();
            p2.msgq.enqueue_tail(Message::new(None, None, 20));
            p3.msgq.enqueue_tail(Message::new(None, None, 30));
            p3.msgq.enqueue_tail(Message::new(None, None, 31));
            p3.msgq.enqueue_tail(Message::new(None, None, 32));
        }

        {
            let mut w = topic.write();
            w.resize(&topic, 2);
        }

        let r = topic.read();
        let ua = r.unassigned().unwrap();
        let drained: Vec<_> = ua.msgq.drain_all().into_iter().map(|m| m.timestamp_ms).collect();
        assert_eq!(drained, vec![20, 30, 31, 32]);
    }

    #[test]
    fn assign_unassigned_keeps_failed_messages_at_head_in_order() {
        use crate::partitioner::Partitioner;

        struct RejectEven;
        impl Partitioner for RejectEven {
            fn partition(&self, _t: &str, key: Option<&[u8]>, available: &[u32]) -> Option<u32> {
                let n: i64 = key
                    .and_then(|k| std::str::from_utf8(k).ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                if n % 2 == 0 {
                    None
                } else {
                    available.first().copied()
                }
            }
        }

        let config = TopicConfig::new(std::sync::Arc::new(RejectEven));
        let topic = Topic::new(TopicName::new("t"), config);
        {
            let mut w = topic.write();
            w.resize(&topic, 1);
        }

        {
            let r = topic.read();
            let ua = r.unassigned().unwrap();
            for n in 0..5 {
                ua.msgq.enqueue_tail(Message::new(
                    Some(bytes::Bytes::from(n.to_string())),
                    None,
                    n,
                ));
            }
        }

        {
            let w = topic.write();
            w.assign_unassigned(&topic);
        }

        let r = topic.read();
        let ua = r.unassigned().unwrap();
        let failed: Vec<_> = ua.msgq.drain_all().into_iter().map(|m| m.timestamp_ms).collect();
        assert_eq!(failed, vec![0, 2, 4]);

        let p0 = r.lookup_partition(PartitionId::Real(0), false).unwrap();
        let routed: Vec<_> = p0.msgq.drain_all().into_iter().map(|m| m.timestamp_ms).collect();
        assert_eq!(routed, vec![1, 3]);
    }
}
