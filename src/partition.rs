//! The per-(topic, partition) state object (component B, "Toppar").

use crate::broker::Broker;
use crate::handle::Shared;
use crate::message::MessageQueue;
use crate::topic::Topic;
use parking_lot::{Mutex, RwLock};

/// The wire sentinel for "unassigned", kept only at this boundary —
/// everywhere else in the core a partition id is the tagged
/// [`PartitionId`] below (§9 design note: replace the sentinel with a
/// tagged variant at every API boundary).
pub const UA_WIRE_ID: i32 = -1;

/// A partition id: either a real, dense index into a topic's partition
/// array, or the unassigned holding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionId {
    Real(u32),
    Unassigned,
}

impl PartitionId {
    pub fn from_wire(id: i32) -> Self {
        if id == UA_WIRE_ID {
            PartitionId::Unassigned
        } else {
            PartitionId::Real(id as u32)
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            PartitionId::Real(n) => n as i32,
            PartitionId::Unassigned => UA_WIRE_ID,
        }
    }

    pub fn is_unassigned(self) -> bool {
        matches!(self, PartitionId::Unassigned)
    }
}

bitflags::bitflags! {
    /// Flags over `{DESIRED, UNKNOWN}` (§3). Other bits are reserved.
    ///
    /// Invariant: a partition is linked into `Topic::desired` iff both
    /// `DESIRED` and `UNKNOWN` are set — enforced at every mutation site
    /// in `topic.rs`, never just at construction.
    #[derive(Default)]
    pub struct PartitionFlags: u8 {
        const DESIRED = 0b0000_0001;
        const UNKNOWN = 0b0000_0010;
    }
}

/// Placeholder for the consumer-side fetch state machine. Its full
/// transition table is a consumer-group concern, out of scope (§1
/// Non-goals) — the core only needs to store and initialize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    None,
    Active,
    Stopping,
}

struct PartitionState {
    flags: PartitionFlags,
    fetch_state: FetchState,
}

/// Per-(topic, partition) state: pending queue, fetch queue, flags,
/// leader link, lock.
pub struct Partition {
    parent: Shared<Topic>,
    id: PartitionId,
    state: Mutex<PartitionState>,
    /// Messages awaiting transmit.
    pub msgq: MessageQueue,
    /// Messages currently handed to the broker for transmit.
    pub xmit_msgq: MessageQueue,
    /// Messages delivered to the application (consumer side).
    pub fetchq: MessageQueue,
    /// Mutated only under the owning `Topic`'s write lock (§5); read
    /// independently by broker I/O threads between queue operations.
    leader: RwLock<Option<Shared<Broker>>>,
}

impl Partition {
    pub fn new(parent: Shared<Topic>, id: PartitionId) -> Shared<Partition> {
        Shared::new(Partition {
            parent,
            id,
            state: Mutex::new(PartitionState {
                flags: PartitionFlags::empty(),
                fetch_state: FetchState::None,
            }),
            msgq: MessageQueue::new(),
            xmit_msgq: MessageQueue::new(),
            fetchq: MessageQueue::new(),
            leader: RwLock::new(None),
        })
    }

    pub fn parent(&self) -> &Shared<Topic> {
        &self.parent
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn flags(&self) -> PartitionFlags {
        self.state.lock().flags
    }

    pub fn is_desired(&self) -> bool {
        self.state.lock().flags.contains(PartitionFlags::DESIRED)
    }

    pub fn is_unknown(&self) -> bool {
        self.state.lock().flags.contains(PartitionFlags::UNKNOWN)
    }

    pub fn fetch_state(&self) -> FetchState {
        self.state.lock().fetch_state
    }

    pub fn set_fetch_state(&self, fetch_state: FetchState) {
        self.state.lock().fetch_state = fetch_state;
    }

    /// Sets `DESIRED`. Returns the flags as they stood *after* the
    /// update, so callers can tell whether the `desired` linkage
    /// invariant (`DESIRED ∧ UNKNOWN`) still needs fixing up.
    pub(crate) fn set_desired(&self) -> PartitionFlags {
        let mut state = self.state.lock();
        state.flags.insert(PartitionFlags::DESIRED);
        state.flags
    }

    pub(crate) fn clear_desired(&self) -> PartitionFlags {
        let mut state = self.state.lock();
        state.flags.remove(PartitionFlags::DESIRED);
        state.flags
    }

    pub(crate) fn set_unknown(&self) {
        self.state.lock().flags.insert(PartitionFlags::UNKNOWN);
    }

    pub(crate) fn clear_unknown(&self) {
        self.state.lock().flags.remove(PartitionFlags::UNKNOWN);
    }

    /// A cheap, eventually-consistent read of the current leader. Safe
    /// to call from any thread without holding the topic lock; the
    /// caller must re-read between separate queue operations rather
    /// than assume it stays unchanged across them (§5).
    pub fn leader(&self) -> Option<Shared<Broker>> {
        self.leader.read().clone()
    }

    /// Mutated only through `crate::broker::delegate`, which requires a
    /// `TopicWriteGuard` witness — never call this directly.
    pub(crate) fn leader_lock(&self) -> &RwLock<Option<Shared<Broker>>> {
        &self.leader
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("id", &self.id)
            .field("flags", &self.flags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopicConfig;
    use crate::wire::TopicName;

    fn fresh_topic() -> Shared<Topic> {
        Topic::new(TopicName::new("t"), TopicConfig::default())
    }

    #[test]
    fn desired_flag_roundtrip() {
        let topic = fresh_topic();
        let p = Partition::new(topic, PartitionId::Real(0));
        assert!(!p.is_desired());
        p.set_desired();
        assert!(p.is_desired());
        p.clear_desired();
        assert!(!p.is_desired());
    }

    #[test]
    fn wire_id_roundtrip() {
        assert_eq!(PartitionId::from_wire(-1), PartitionId::Unassigned);
        assert_eq!(PartitionId::from_wire(3).to_wire(), 3);
    }
}
