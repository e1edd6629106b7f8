//! Session-scoped local tier.

use std::collections::{HashMap, VecDeque};

use super::key::CacheKey;
use crate::types::LlmResponse;

/// Bounded key → response map with FIFO eviction.
///
/// When a new key arrives at capacity, the oldest *inserted* key is evicted.
/// Reads do not refresh position (this is not an LRU), and overwriting an
/// existing key keeps its original position.
#[derive(Debug, Clone)]
pub struct LocalCache {
    entries: HashMap<CacheKey, LlmResponse>,
    order: VecDeque<CacheKey>,
    max_entries: usize,
}

impl LocalCache {
    /// `max_entries` is clamped to at least 1.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&LlmResponse> {
        self.entries.get(key)
    }

    /// Insert or overwrite. Returns the evicted key, if any.
    pub fn put(&mut self, key: CacheKey, response: LlmResponse) -> Option<CacheKey> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = response;
            return None;
        }
        let mut evicted = None;
        if self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, response);
        evicted
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<LlmResponse> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Keys from oldest to newest insertion.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(1000)
    }
}
