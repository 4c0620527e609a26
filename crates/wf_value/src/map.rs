use core::fmt;

use wf_utils::hash::HashMap;
use wf_utils::hash::hash_map::Entry;

use crate::Value;

// -----------------------------------------------------------------------------
// ValueMap

/// An insertion-ordered map from text keys to [`Value`]s.
///
/// Entry order is the order keys were first inserted, and it is
/// significant: codecs emit entries in this order, and RPC parameter
/// structs rely on it. Keys are unique; inserting an existing key
/// overwrites the value in place without moving the entry.
///
/// Lookup goes through a side index, so `get` stays O(1) while iteration
/// stays ordered.
///
/// # Examples
///
/// ```
/// use wf_value::{Value, ValueMap};
///
/// let mut map = ValueMap::new();
/// map.insert("b", Value::Int(1));
/// map.insert("a", Value::Int(2));
/// map.insert("b", Value::Int(3)); // overwrite, keeps position
///
/// let keys: Vec<&str> = map.keys().collect();
/// assert_eq!(keys, ["b", "a"]);
/// assert_eq!(map.get("b"), Some(&Value::Int(3)));
/// ```
#[derive(Clone, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
    indices: HashMap<String, usize>,
}

impl ValueMap {
    /// Creates an empty `ValueMap`.
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            indices: HashMap::with_hasher(wf_utils::hash::FixedHashState),
        }
    }

    /// Creates an empty `ValueMap` with at least the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            indices: HashMap::with_capacity_and_hasher(
                capacity,
                wf_utils::hash::FixedHashState,
            ),
        }
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// was already present.
    ///
    /// An existing key keeps its position in the entry order.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.indices.entry(key) {
            Entry::Occupied(slot) => {
                let previous = core::mem::replace(&mut self.entries[*slot.get()].1, value);
                Some(previous)
            }
            Entry::Vacant(slot) => {
                self.entries.push((slot.key().clone(), value));
                slot.insert(self.entries.len() - 1);
                None
            }
        }
    }

    /// Returns a reference to the value for `key`, if present.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.indices.get(key).map(|index| &self.entries[*index].1)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self.indices.get(key) {
            Some(index) => Some(&mut self.entries[*index].1),
            None => None,
        }
    }

    /// Returns the position of `key` in entry order, if present.
    #[inline]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.indices.get(key).copied()
    }

    /// Returns the entry at `index` in entry order, if in bounds.
    #[inline]
    pub fn entry_at(&self, index: usize) -> Option<(&str, &Value)> {
        self.entries.get(index).map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if the map contains `key`.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.indices.contains_key(key)
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates keys in insertion order.
    #[inline]
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates values in insertion order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

// -----------------------------------------------------------------------------
// Traits

impl PartialEq for ValueMap {
    /// Order-sensitive equality: two maps with the same pairs in a
    /// different order are not equal.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(String, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = ValueMap::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Extend<(String, Value)> for ValueMap {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::ValueMap;
    use crate::Value;

    #[test]
    fn insertion_order_is_preserved() {
        let mut map = ValueMap::new();
        map.insert("z", Value::Int(0));
        map.insert("a", Value::Int(1));
        map.insert("m", Value::Int(2));

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let mut map = ValueMap::new();
        map.insert("key", Value::Int(1));
        map.insert("other", Value::Int(2));
        let previous = map.insert("key", Value::Int(3));

        assert_eq!(previous, Some(Value::Int(1)));
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of("key"), Some(0));
        assert_eq!(map.get("key"), Some(&Value::Int(3)));
    }

    #[test]
    fn equality_is_order_sensitive() {
        let mut ab = ValueMap::new();
        ab.insert("a", Value::Int(1));
        ab.insert("b", Value::Int(2));

        let mut ba = ValueMap::new();
        ba.insert("b", Value::Int(2));
        ba.insert("a", Value::Int(1));

        assert_ne!(ab, ba);
    }
}
