use thiserror::Error;

/// Errors returned by the topic/partition core.
///
/// Lookup misses are *not* represented here — they are returned as
/// `Option::None` per the propagation policy: the core never raises,
/// only configuration errors and unknown-topic/unknown-partition
/// conditions are worth a typed result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Rejected synchronously at topic creation time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Returned by `partition_count_update` / `topic_update` when the
    /// topic name is not present in the client registry.
    #[error("unknown topic")]
    UnknownTopic,

    /// Returned by `ua_move_msgs` when the topic has no unassigned slot
    /// (it was already torn down).
    #[error("no unassigned partition")]
    NoUnassignedPartition,
}

pub type Result<T> = std::result::Result<T, Error>;
