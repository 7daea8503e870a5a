use crate::error::{Error, Result};
use std::cmp::Ordering as CmpOrdering;

/// Heap key: lower `key` wins, equal keys fall back to insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapKey {
    key: u64,
    seq: u64,
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Clone)]
struct HeapEntry<T> {
    order: HeapKey,
    item: T,
}

/// Bounded, array-backed binary min-heap.
#[derive(Debug, Clone)]
pub struct PriorityHeap<T> {
    entries: Vec<HeapEntry<T>>,
    capacity: usize,
    next_seq: u64,
}

impl<T> PriorityHeap<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    pub fn push(&mut self, key: u64, item: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::Capacity {
                capacity: self.capacity,
            });
        }

        let order = HeapKey {
            key,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.entries.push(HeapEntry { order, item });
        let last = self.entries.len() - 1;
        self.sift_up(last);
        Ok(())
    }

    /// Remove and return the entry with the smallest key.
    pub fn pop(&mut self) -> Option<(u64, T)> {
        if self.entries.is_empty() {
            return None;
        }

        let entry = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some((entry.order.key, entry.item))
    }

    pub fn peek(&self) -> Option<(u64, &T)> {
        self.entries.first().map(|e| (e.order.key, &e.item))
    }

    /// Lower the key of the entry at `index` and restore heap order.
    pub fn decrease_key(&mut self, index: usize, key: u64) -> Result<()> {
        let entry = self.entries.get_mut(index).ok_or_else(|| {
            Error::protocol(format!("heap index {} out of bounds", index))
        })?;

        if key > entry.order.key {
            return Err(Error::protocol(format!(
                "new key {} is larger than current key {}",
                key, entry.order.key
            )));
        }

        entry.order.key = key;
        self.sift_up(index);
        Ok(())
    }

    /// Heap index of the first entry matching `pred`.
    pub fn position<F>(&self, mut pred: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.entries.iter().position(|e| pred(&e.item))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[parent].order <= self.entries[index].order {
                break;
            }
            self.entries.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.entries[left].order < self.entries[smallest].order {
                smallest = left;
            }
            if right < len && self.entries[right].order < self.entries[smallest].order {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.entries.swap(index, smallest);
            index = smallest;
        }
    }
}
