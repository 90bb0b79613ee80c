//! Historical base: the durable record of the most authoritative
//! occurrence known per delivery key.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use super::Occurrence;

/// Durable mapping from delivery key to its most authoritative occurrence.
///
/// Keys are never removed; iteration order is the key order, so snapshot
/// output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalBase {
    records: BTreeMap<String, Occurrence>,
}

impl HistoricalBase {
    /// Create an empty base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a base from a flat record list, as read from disk.
    ///
    /// Later records win on duplicate keys only when they supersede
    /// earlier ones, so a well-formed file round-trips unchanged.
    pub fn from_records(records: Vec<Occurrence>) -> Self {
        let mut base = Self::new();
        for occurrence in records {
            match base.records.get(&occurrence.key) {
                Some(stored) if !occurrence.supersedes(stored) => {}
                _ => {
                    base.records.insert(occurrence.key.clone(), occurrence);
                }
            }
        }
        base
    }

    /// Number of distinct delivery keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the base holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the stored occurrence for a key.
    pub fn get(&self, key: &str) -> Option<&Occurrence> {
        self.records.get(key)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Insert or replace the occurrence for its key.
    pub fn insert(&mut self, occurrence: Occurrence) {
        self.records.insert(occurrence.key.clone(), occurrence);
    }

    /// Iterate records in key order.
    pub fn iter(&self) -> btree_map::Values<'_, String, Occurrence> {
        self.records.values()
    }

    /// Mutably iterate records in key order.
    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, String, Occurrence> {
        self.records.values_mut()
    }

    /// All keys in order.
    pub fn keys(&self) -> btree_map::Keys<'_, String, Occurrence> {
        self.records.keys()
    }
}
