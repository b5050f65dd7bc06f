//! The interning string table.
//!
//! Every string a node carries (names, literal text, position paths) is
//! stored once here and referenced by a stable [`StringKey`]. Keys start at
//! 1; key 0 is the wire sentinel for "absent" and is never allocated.
//!
//! Each entry carries a persistence tag: the save path persists tagged
//! entries plus everything live nodes reference, so transient strings
//! (interned defaults, scratch values) do not bloat the stream. Cross-table
//! remapping ([`StringTable::remap_into`]) is the primitive store merges and
//! compaction are built on.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AsgError;
use crate::id::StringKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Row {
    value: String,
    persist: bool,
}

/// Interning table mapping strings to stable `u32` keys and back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringTable {
    /// Row `i` backs `StringKey(i + 1)`.
    rows: Vec<Row>,
    /// Value → key index. IndexMap keeps iteration in insertion order,
    /// which keeps anything derived from iteration deterministic.
    index: IndexMap<String, StringKey>,
}

impl StringTable {
    pub fn new() -> Self {
        StringTable::default()
    }

    /// Number of interned entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Interns `value`, returning the existing key if it was seen before.
    pub fn intern(&mut self, value: &str) -> StringKey {
        if let Some(&key) = self.index.get(value) {
            return key;
        }
        let key = StringKey(self.rows.len() as u32 + 1);
        self.rows.push(Row {
            value: value.to_string(),
            persist: false,
        });
        self.index.insert(value.to_string(), key);
        key
    }

    /// Resolves a key to its string. Total over keys this table issued.
    pub fn lookup(&self, key: StringKey) -> Result<&str, AsgError> {
        self.row(key).map(|row| row.value.as_str())
    }

    /// Returns the key for `value` without interning it.
    pub fn key_of(&self, value: &str) -> Option<StringKey> {
        self.index.get(value).copied()
    }

    /// Flags a key's value as required on the next save.
    pub fn mark_for_persistence(&mut self, key: StringKey) -> Result<(), AsgError> {
        self.row_mut(key)?.persist = true;
        Ok(())
    }

    /// Whether a key's value is flagged for the next save.
    pub fn is_persistent(&self, key: StringKey) -> Result<bool, AsgError> {
        self.row(key).map(|row| row.persist)
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (StringKey, &str)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (StringKey(i as u32 + 1), row.value.as_str()))
    }

    /// Persistence-tagged entries in key order.
    pub fn persistent_entries(&self) -> impl Iterator<Item = (StringKey, &str)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.persist)
            .map(|(i, row)| (StringKey(i as u32 + 1), row.value.as_str()))
    }

    /// Copies every persistence-tagged value into `dest`, preserving the
    /// tag, and returns the old-key → new-key mapping.
    ///
    /// Idempotent per key: identical values never duplicate in `dest`, and
    /// remapping the same source key again yields the same destination key.
    pub fn remap_into(&self, dest: &mut StringTable) -> IndexMap<StringKey, StringKey> {
        let mut mapping = IndexMap::new();
        for (old_key, value) in self.persistent_entries() {
            let new_key = *mapping.entry(old_key).or_insert_with(|| dest.intern(value));
            // intern() dedups values, so the tag lands on the shared row.
            dest.rows[new_key.0 as usize - 1].persist = true;
        }
        mapping
    }

    fn row(&self, key: StringKey) -> Result<&Row, AsgError> {
        if key.0 == 0 {
            return Err(AsgError::UnknownKey { key });
        }
        self.rows
            .get(key.0 as usize - 1)
            .ok_or(AsgError::UnknownKey { key })
    }

    fn row_mut(&mut self, key: StringKey) -> Result<&mut Row, AsgError> {
        if key.0 == 0 {
            return Err(AsgError::UnknownKey { key });
        }
        self.rows
            .get_mut(key.0 as usize - 1)
            .ok_or(AsgError::UnknownKey { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_twice_returns_same_key() {
        let mut table = StringTable::new();
        let a = table.intern("foo");
        let b = table.intern("foo");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(a).unwrap(), "foo");
    }

    #[test]
    fn keys_start_at_one() {
        let mut table = StringTable::new();
        assert_eq!(table.intern("first"), StringKey(1));
        assert_eq!(table.intern("second"), StringKey(2));
    }

    #[test]
    fn lookup_unknown_key_fails() {
        let table = StringTable::new();
        assert!(matches!(
            table.lookup(StringKey(0)),
            Err(AsgError::UnknownKey { .. })
        ));
        assert!(matches!(
            table.lookup(StringKey(7)),
            Err(AsgError::UnknownKey { .. })
        ));
    }

    #[test]
    fn persistence_tag_starts_clear() {
        let mut table = StringTable::new();
        let key = table.intern("foo");
        assert!(!table.is_persistent(key).unwrap());
        table.mark_for_persistence(key).unwrap();
        assert!(table.is_persistent(key).unwrap());
        assert_eq!(table.persistent_entries().count(), 1);
    }

    #[test]
    fn mark_unknown_key_fails() {
        let mut table = StringTable::new();
        assert!(matches!(
            table.mark_for_persistence(StringKey(3)),
            Err(AsgError::UnknownKey { .. })
        ));
    }

    #[test]
    fn remap_copies_only_tagged_entries() {
        let mut src = StringTable::new();
        let foo = src.intern("foo");
        let _bar = src.intern("bar");
        src.mark_for_persistence(foo).unwrap();

        let mut dest = StringTable::new();
        let mapping = src.remap_into(&mut dest);

        assert_eq!(mapping.len(), 1);
        assert_eq!(dest.len(), 1);
        let new_key = mapping[&foo];
        assert_eq!(dest.lookup(new_key).unwrap(), "foo");
        assert!(dest.is_persistent(new_key).unwrap());
    }

    #[test]
    fn remap_is_idempotent_per_key() {
        let mut src = StringTable::new();
        let foo = src.intern("foo");
        src.mark_for_persistence(foo).unwrap();

        let mut dest = StringTable::new();
        let first = src.remap_into(&mut dest);
        let second = src.remap_into(&mut dest);

        assert_eq!(first[&foo], second[&foo]);
        assert_eq!(dest.len(), 1, "no duplicate value rows in dest");
    }

    #[test]
    fn remap_reuses_values_already_in_dest() {
        let mut src = StringTable::new();
        let foo = src.intern("foo");
        src.mark_for_persistence(foo).unwrap();

        let mut dest = StringTable::new();
        let existing = dest.intern("foo");
        let mapping = src.remap_into(&mut dest);

        assert_eq!(mapping[&foo], existing);
        assert_eq!(dest.len(), 1);
    }

    #[test]
    fn serde_roundtrip_keeps_keys_and_tags() {
        let mut table = StringTable::new();
        let foo = table.intern("foo");
        let bar = table.intern("bar");
        table.mark_for_persistence(bar).unwrap();

        let json = serde_json::to_string(&table).unwrap();
        let back: StringTable = serde_json::from_str(&json).unwrap();

        assert_eq!(back.lookup(foo).unwrap(), "foo");
        assert_eq!(back.lookup(bar).unwrap(), "bar");
        assert!(!back.is_persistent(foo).unwrap());
        assert!(back.is_persistent(bar).unwrap());
    }
}
