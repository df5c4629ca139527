//! Pluggable partitioner (collaborator `msg_partitioner`, §6).
//!
//! A partitioner is given a chance to choose a partition for a message.
//! Returning `None` means "requested partition currently unavailable" —
//! the wire sentinel `-1` from the original protocol is translated to
//! this at the API boundary and never leaks further in.

use crate::partition::PartitionId;
use rand::Rng;
#[cfg(feature = "hash-partitioner")]
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait Partitioner: Send + Sync {
    /// Choose a partition out of `available` for a message with the
    /// given optional key. `available` is the topic's current dense
    /// partition id range; an empty slice means "unavailable".
    fn partition(&self, topic_name: &str, key: Option<&[u8]>, available: &[u32]) -> Option<u32>;
}

/// The default partitioning strategy (§4.D): pick uniformly at random
/// among the topic's currently known partitions.
#[derive(Default)]
pub struct UniformRandomPartitioner;

impl Partitioner for UniformRandomPartitioner {
    fn partition(&self, _topic_name: &str, _key: Option<&[u8]>, available: &[u32]) -> Option<u32> {
        if available.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..available.len());
        Some(available[index])
    }
}

/// An alternate strategy, offered alongside the default: hash the key
/// when present, otherwise round-robin. Enabled with the
/// `hash-partitioner` feature.
#[cfg(feature = "hash-partitioner")]
pub struct HashKeyPartitioner {
    round_robin: AtomicUsize,
}

#[cfg(feature = "hash-partitioner")]
impl Default for HashKeyPartitioner {
    fn default() -> Self {
        HashKeyPartitioner {
            round_robin: AtomicUsize::new(0),
        }
    }
}

#[cfg(feature = "hash-partitioner")]
impl Partitioner for HashKeyPartitioner {
    fn partition(&self, _topic_name: &str, key: Option<&[u8]>, available: &[u32]) -> Option<u32> {
        if available.is_empty() {
            return None;
        }

        let index = if let Some(key) = key {
            use std::hash::Hasher;
            use twox_hash::XxHash;

            let mut hasher = XxHash::with_seed(0);
            hasher.write(key);
            hasher.finish() as usize
        } else {
            self.round_robin.fetch_add(1, Ordering::Relaxed)
        } % available.len();

        Some(available[index])
    }
}

/// Translates a partitioner's pick back into the partition-id sum type
/// used everywhere else in the core.
pub fn resolve(
    partitioner: &dyn Partitioner,
    topic_name: &str,
    key: Option<&[u8]>,
    available: &[u32],
) -> Option<PartitionId> {
    partitioner
        .partition(topic_name, key, available)
        .map(PartitionId::Real)
}
