//! The abstract message and message-queue primitives consumed by
//! `Partition`. Payload construction, serialization and the wire codec
//! are collaborators out of scope for this core (§1) — `Message` here
//! is deliberately a minimal stand-in that the core can move, splice
//! and purge without inspecting.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct Message {
    pub key: Option<Bytes>,
    pub payload: Option<Bytes>,
    pub timestamp_ms: i64,
}

impl Message {
    pub fn new(key: Option<Bytes>, payload: Option<Bytes>, timestamp_ms: i64) -> Self {
        Message {
            key,
            payload,
            timestamp_ms,
        }
    }
}

/// A FIFO queue of messages. Every operation locks the queue, mutates,
/// and unlocks — never blocks beyond this mutex, never allocates on a
/// path the caller didn't already allocate for.
#[derive(Default)]
pub struct MessageQueue {
    queue: Mutex<VecDeque<Message>>,
    // Mirrors librdkafka's `rkmq_msg_cnt`: readable without taking the
    // queue lock, at the cost of being eventually (not atomically)
    // consistent with a concurrent multi-message splice.
    msg_cnt: AtomicUsize,
}

impl MessageQueue {
    pub fn new() -> Self {
        MessageQueue {
            queue: Mutex::new(VecDeque::new()),
            msg_cnt: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.msg_cnt.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enqueue_tail(&self, msg: Message) {
        self.queue.lock().push_back(msg);
        self.msg_cnt.fetch_add(1, Ordering::Relaxed);
    }

    pub fn enqueue_head(&self, msg: Message) {
        self.queue.lock().push_front(msg);
        self.msg_cnt.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dequeue(&self) -> Option<Message> {
        let msg = self.queue.lock().pop_front();
        if msg.is_some() {
            self.msg_cnt.fetch_sub(1, Ordering::Relaxed);
        }
        msg
    }

    /// Prepends `other`'s contents onto the head of `self`, emptying
    /// `other`. Used to put failed-to-partition messages back in front
    /// of the unassigned queue, in their original relative order.
    pub fn splice_head(&self, other: &MessageQueue) {
        if other.is_empty() {
            return;
        }
        let mut other_q = other.queue.lock();
        let drained: VecDeque<Message> = other_q.drain(..).collect();
        let n = drained.len();
        other.msg_cnt.fetch_sub(n, Ordering::Relaxed);
        drop(other_q);

        let mut self_q = self.queue.lock();
        for msg in drained.into_iter().rev() {
            self_q.push_front(msg);
        }
        self.msg_cnt.fetch_add(n, Ordering::Relaxed);
    }

    /// Appends `other`'s contents onto the tail of `self`, emptying
    /// `other`. Caller must hold both partitions' locks where `self`
    /// and `other` belong to different partitions. Used during shrink.
    pub fn move_from(&self, other: &MessageQueue) {
        if other.is_empty() {
            return;
        }
        let mut other_q = other.queue.lock();
        let drained: VecDeque<Message> = other_q.drain(..).collect();
        let n = drained.len();
        other.msg_cnt.fetch_sub(n, Ordering::Relaxed);
        drop(other_q);

        let mut self_q = self.queue.lock();
        self_q.extend(drained);
        self.msg_cnt.fetch_add(n, Ordering::Relaxed);
    }

    /// Purges every message in the queue, returning how many were
    /// dropped. The only operation that does not conserve message
    /// totals (invariant 6).
    pub fn purge(&self) -> usize {
        let mut q = self.queue.lock();
        let n = q.len();
        q.clear();
        self.msg_cnt.store(0, Ordering::Relaxed);
        n
    }

    /// Drains the queue into a plain `Vec`, in FIFO order, for tests
    /// and for partitioners that need to walk messages one at a time.
    pub fn drain_all(&self) -> Vec<Message> {
        let mut q = self.queue.lock();
        let drained: Vec<Message> = q.drain(..).collect();
        self.msg_cnt.fetch_sub(drained.len(), Ordering::Relaxed);
        drained
    }
}
