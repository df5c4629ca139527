//! Kafka protocol string handling (§6).
//!
//! On the wire a Kafka string is a 16-bit length followed by exactly that
//! many bytes — never NUL-terminated. [`WireString`] models that shape.
//! A [`TopicName`] is the in-memory form we give a topic's own name: it
//! carries one extra NUL byte *past* its logical length so upper layers
//! that want a C-string view can borrow it directly, without copying.
//! The two must never be compared by NUL-terminated string routines —
//! only by explicit length + bytes.

use bytes::Bytes;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A length-prefixed Kafka protocol string as it appears on the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WireString(Bytes);

impl WireString {
    pub fn from_wire_bytes(bytes: Bytes) -> Self {
        WireString(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WireString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "WireString({:?})", s),
            Err(_) => write!(f, "WireString({:?})", self.0.as_ref()),
        }
    }
}

impl<S: AsRef<str>> From<S> for WireString {
    fn from(s: S) -> Self {
        WireString(Bytes::copy_from_slice(s.as_ref().as_bytes()))
    }
}

/// A topic's own name, stored with a trailing NUL past its logical
/// length so it can be handed to C-string-expecting code without a copy.
/// The NUL is never part of the logical name and must never leak into
/// equality, hashing, or wire comparisons.
#[derive(Clone)]
pub struct TopicName(Bytes);

impl TopicName {
    pub fn new(name: &str) -> Self {
        let mut buf = Vec::with_capacity(name.len() + 1);
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
        TopicName(Bytes::from(buf))
    }

    /// The logical name, excluding the trailing NUL.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0[..self.0.len() - 1])
            .expect("topic name is valid utf-8 by construction")
    }

    fn logical_bytes(&self) -> &[u8] {
        &self.0[..self.0.len() - 1]
    }

    /// Compares against a wire-form string using length + bytes only,
    /// never relying on NUL termination on either side.
    pub fn matches_wire(&self, wire: &WireString) -> bool {
        self.logical_bytes() == wire.as_bytes()
    }
}

impl fmt::Debug for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicName({:?})", self.as_str())
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for TopicName {
    fn eq(&self, other: &Self) -> bool {
        self.logical_bytes() == other.logical_bytes()
    }
}

impl Eq for TopicName {}

impl Hash for TopicName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.logical_bytes().hash(state);
    }
}

impl PartialEq<str> for TopicName {
    fn eq(&self, other: &str) -> bool {
        self.logical_bytes() == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_name_excludes_trailing_nul() {
        let name = TopicName::new("orders");
        assert_eq!(name.as_str(), "orders");
        assert_eq!(name.0.len(), 7);
        assert_eq!(name.0[6], 0);
    }

    #[test]
    fn wire_comparison_ignores_nul() {
        let name = TopicName::new("orders");
        let wire = WireString::from("orders");
        assert!(name.matches_wire(&wire));

        let other = WireString::from("orders2");
        assert!(!name.matches_wire(&other));
    }

    #[test]
    fn equality_and_hash_ignore_nul() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(TopicName::new("t"));
        assert!(set.contains(&TopicName::new("t")));
    }
}
