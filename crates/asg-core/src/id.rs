//! Stable ID newtypes for graph entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `NodeId` cannot be accidentally used where a `StringKey` is
//! expected. The value `0` is reserved in both spaces: it is the on-wire
//! "absent" sentinel and is never issued for a real node or string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier, unique within one [`Factory`](crate::Factory)
/// instance and never reused while that factory is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Interned string key, stable for the lifetime of one
/// [`StringTable`](crate::StringTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StringKey(pub u32);

impl NodeId {
    /// First id a factory will ever allocate.
    pub const FIRST: NodeId = NodeId(1);

    /// Returns the raw index value.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl StringKey {
    /// Returns the raw key value.
    pub fn index(self) -> u32 {
        self.0
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(format!("{}", NodeId(7)), "7");
    }

    #[test]
    fn string_key_display() {
        assert_eq!(format!("{}", StringKey(99)), "99");
    }

    #[test]
    fn id_types_are_distinct() {
        // Same inner value, different types; cannot be confused at compile
        // time. Just verify the values are independent.
        let node = NodeId(1);
        let key = StringKey(1);
        assert_eq!(node.0, key.0);
    }

    #[test]
    fn ids_order_by_value() {
        assert!(NodeId(2) < NodeId(10));
        assert!(StringKey(1) < StringKey(2));
    }

    #[test]
    fn serde_roundtrip() {
        let node = NodeId(42);
        let json = serde_json::to_string(&node).unwrap();
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);

        let key = StringKey(7);
        let json = serde_json::to_string(&key).unwrap();
        let back: StringKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
