// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded map with least-recently-used eviction
//!
//! Entries live in a slot map and are threaded on a doubly linked recency
//! list, so lookup, touch, insert and eviction are all O(1).

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::hash::Hash;

new_key_type! {
    struct SlotKey;
}

struct Slot<K, V> {
    key: K,
    value: V,
    /// Towards the most recently used end
    prev: Option<SlotKey>,
    /// Towards the least recently used end
    next: Option<SlotKey>,
}

/// Capacity-bounded map ordered by access recency
pub struct LruMap<K, V> {
    capacity: usize,
    slots: SlotMap<SlotKey, Slot<K, V>>,
    lookup: FxHashMap<K, SlotKey>,
    /// Most recently used
    head: Option<SlotKey>,
    /// Least recently used
    tail: Option<SlotKey>,
}

impl<K: Hash + Eq + Clone, V> LruMap<K, V> {
    /// Create a map holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: SlotMap::with_key(),
            lookup: FxHashMap::default(),
            head: None,
            tail: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lookup.contains_key(key)
    }

    /// Read without changing recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let slot = self.lookup.get(key)?;
        self.slots.get(*slot).map(|s| &s.value)
    }

    /// Read and mark as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = *self.lookup.get(key)?;
        self.touch(slot);
        self.slots.get(slot).map(|s| &s.value)
    }

    /// Mutable read, marking as most recently used
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = *self.lookup.get(key)?;
        self.touch(slot);
        self.slots.get_mut(slot).map(|s| &mut s.value)
    }

    /// Insert or replace an entry and mark it most recently used
    ///
    /// Returns the entry evicted to stay within capacity, if any. Replacing
    /// an existing key never evicts.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&slot) = self.lookup.get(&key) {
            if let Some(existing) = self.slots.get_mut(slot) {
                existing.value = value;
            }
            self.touch(slot);
            return None;
        }

        let slot = self.slots.insert(Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.lookup.insert(key, slot);
        self.push_front(slot);

        if self.lookup.len() > self.capacity {
            self.pop_back()
        } else {
            None
        }
    }

    /// Remove an entry
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.lookup.remove(key)?;
        self.detach(slot);
        self.slots.remove(slot).map(|s| s.value)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.slots.clear();
        self.lookup.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.tail;
        std::iter::from_fn(move || {
            let slot = self.slots.get(cursor?)?;
            cursor = slot.prev;
            Some(&slot.key)
        })
    }

    fn pop_back(&mut self) -> Option<(K, V)> {
        let slot = self.tail?;
        self.detach(slot);
        let removed = self.slots.remove(slot)?;
        self.lookup.remove(&removed.key);
        Some((removed.key, removed.value))
    }

    fn touch(&mut self, slot: SlotKey) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.push_front(slot);
    }

    fn detach(&mut self, slot: SlotKey) {
        let (prev, next) = match self.slots.get(slot) {
            Some(s) => (s.prev, s.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(s) = self.slots.get_mut(p) {
                    s.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slots.get_mut(n) {
                    s.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(s) = self.slots.get_mut(slot) {
            s.prev = None;
            s.next = None;
        }
    }

    fn push_front(&mut self, slot: SlotKey) {
        let old_head = self.head;
        if let Some(s) = self.slots.get_mut(slot) {
            s.prev = None;
            s.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(s) = self.slots.get_mut(h) {
                s.prev = Some(slot);
            }
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
