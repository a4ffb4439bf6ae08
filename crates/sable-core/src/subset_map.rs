//! A multimap keyed by sets.
//!
//! [`SubsetMap::get`] takes a query set and returns every stored value whose
//! key set is a subset of the query, in insertion order. `@extend` uses it to
//! find every extension whose target is contained in a compound selector.

use std::{collections::HashMap, hash::Hash};

use indexmap::IndexSet;

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: IndexSet<K>,
    key_id: usize,
    value: V,
}

/// A value found by [`SubsetMap::get`].
#[derive(Debug)]
pub struct SubsetMatch<'a, K, V> {
    /// Insertion index of the entry.
    pub index: usize,
    /// Identifier shared by all entries with an equal key set.
    pub key_id: usize,
    pub key: &'a IndexSet<K>,
    pub value: &'a V,
}

/// Insertion-ordered multimap from sets to values.
#[derive(Debug, Clone)]
pub struct SubsetMap<K, V> {
    entries: Vec<Entry<K, V>>,
    by_element: HashMap<K, Vec<usize>>,
}

impl<K, V> Default for SubsetMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_element: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> SubsetMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Store `value` under the set of `key` elements.
    ///
    /// Returns the insertion index, or `None` if the key is empty (an empty
    /// set would be a subset of every query).
    pub fn insert(&mut self, key: impl IntoIterator<Item = K>, value: V) -> Option<usize> {
        let key: IndexSet<K> = key.into_iter().collect();
        if key.is_empty() {
            return None;
        }
        let key_id = self
            .entries
            .iter()
            .find(|entry| entry.key == key)
            .map_or(self.entries.len(), |entry| entry.key_id);
        let index = self.entries.len();
        for element in &key {
            self.by_element
                .entry(element.clone())
                .or_default()
                .push(index);
        }
        self.entries.push(Entry {
            key,
            key_id,
            value,
        });
        Some(index)
    }

    /// Every entry whose key is a subset of `query`, by insertion index.
    pub fn get<'a>(&'a self, query: &[K]) -> Vec<SubsetMatch<'a, K, V>> {
        let query_set: IndexSet<&K> = query.iter().collect();
        let mut indices: Vec<usize> = query
            .iter()
            .filter_map(|element| self.by_element.get(element))
            .flatten()
            .copied()
            .filter(|&index| {
                self.entries[index]
                    .key
                    .iter()
                    .all(|element| query_set.contains(element))
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|index| {
                let entry = &self.entries[index];
                SubsetMatch {
                    index,
                    key_id: entry.key_id,
                    key: &entry.key,
                    value: &entry.value,
                }
            })
            .collect()
    }

    /// Keys and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&IndexSet<K>, &V)> {
        self.entries.iter().map(|entry| (&entry.key, &entry.value))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_get_returns_subsets_in_insertion_order() {
        let mut map = SubsetMap::new();
        map.insert([1, 2], "a");
        map.insert([3], "b");
        map.insert([2], "c");
        map.insert([1, 4], "d");

        let found: Vec<_> = map.get(&[1, 2, 3]).iter().map(|m| *m.value).collect();
        assert_eq!(found, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let mut map: SubsetMap<i32, &str> = SubsetMap::new();
        assert_eq!(map.insert(Vec::new(), "x"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_equal_keys_share_an_id() {
        let mut map = SubsetMap::new();
        map.insert([1, 2], "a");
        map.insert([2, 1], "b");
        map.insert([2], "c");
        let matches = map.get(&[1, 2]);
        assert_eq!(matches[0].key_id, matches[1].key_id);
        assert_ne!(matches[0].key_id, matches[2].key_id);
    }

    proptest! {
        #[test]
        fn prop_get_matches_brute_force(
            keys in proptest::collection::vec(proptest::collection::vec(0u8..6, 1..4), 0..8),
            query in proptest::collection::vec(0u8..6, 0..6),
        ) {
            let mut map = SubsetMap::new();
            for (i, key) in keys.iter().enumerate() {
                map.insert(key.clone(), i);
            }
            let found: Vec<usize> = map.get(&query).iter().map(|m| *m.value).collect();
            let expected: Vec<usize> = keys
                .iter()
                .enumerate()
                .filter(|(_, key)| key.iter().all(|k| query.contains(k)))
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(found, expected);
        }
    }
}
