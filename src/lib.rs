//! Topic/partition metadata and routing core.
//!
//! This crate is the synchronization and ownership hub of a Kafka
//! producer/consumer client: it maps a logical topic onto a set of
//! partitions, each with a leader broker assignment, a pending message
//! queue, and a desired/known lifecycle state, and mediates between the
//! application, the metadata subsystem and the broker subsystem.
//!
//! Wire-level protocol encode/decode, broker TCP connection lifecycle
//! and message payload construction are collaborators, not this
//! crate's concern — see the traits in [`broker`] and [`registry`] for
//! the boundaries this core expects its caller to fill in.

pub mod broker;
pub mod config;
pub mod error;
pub mod handle;
pub mod message;
pub mod metadata;
pub mod partition;
pub mod partitioner;
pub mod registry;
pub mod topic;
pub mod wire;

pub use broker::{Broker, BrokerLookup, NodeId};
pub use config::TopicConfig;
pub use error::{Error, Result};
pub use handle::Shared;
pub use message::{Message, MessageQueue};
pub use partition::{FetchState, Partition, PartitionFlags, PartitionId};
pub use partitioner::{Partitioner, UniformRandomPartitioner};
pub use registry::{Client, MetadataQueryer, NullMetadataQueryer};
pub use topic::{Topic, TopicReadGuard, TopicWriteGuard};
pub use wire::{TopicName, WireString};
