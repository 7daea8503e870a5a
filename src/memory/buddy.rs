//! Binary buddy allocator over a fixed-size simulated arena.
//!
//! The tree is stored as an arena of nodes addressed by [`NodeId`]. A node
//! with no children is an allocated block; every interior node has at least
//! one child. The root only exists while something is allocated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Index of a node inside the allocator's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A reserved block handed out by [`BuddyAllocator::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    node: NodeId,
    generation: u64,
    size: usize,
    start: usize,
}

impl Block {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Inclusive end address.
    pub fn end(&self) -> usize {
        self.start + self.size - 1
    }

    pub fn range(&self) -> BlockRange {
        BlockRange {
            size: self.size,
            start: self.start,
            end: self.end(),
        }
    }
}

/// Plain address range of a block, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub size: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Node {
    size: usize,
    start: usize,
    generation: u64,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[derive(Debug)]
pub struct BuddyAllocator {
    capacity: usize,
    nodes: Vec<Option<Node>>,
    free_slots: Vec<usize>,
    root: Option<NodeId>,
    next_generation: u64,
}

impl BuddyAllocator {
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Create an allocator managing `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(Error::memory(format!(
                "arena capacity must be a non-zero power of two (got {})",
                capacity
            )));
        }

        Ok(Self {
            capacity,
            nodes: Vec::new(),
            free_slots: Vec::new(),
            root: None,
            next_generation: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when nothing is allocated and the tree has fully collapsed.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Size of the block that a request of `size` bytes would occupy.
    pub fn block_size_for(size: usize) -> Option<usize> {
        size.max(1).checked_next_power_of_two()
    }

    /// Reserve a block of at least `size` bytes.
    ///
    /// Returns `None` when the request is larger than the arena or when no
    /// suitably sized buddy slot is free.
    pub fn allocate(&mut self, size: usize) -> Option<Block> {
        let block_size = Self::block_size_for(size)?;
        if block_size > self.capacity {
            return None;
        }

        let node = match self.root {
            None => {
                let root = self.new_node(self.capacity, 0, None);
                self.root = Some(root);
                if block_size == self.capacity {
                    root
                } else {
                    self.split_spine(root, Side::Left, block_size)
                }
            }
            Some(root) => self.search(root, block_size)?,
        };

        Some(self.block_of(node))
    }

    /// Release a block obtained from [`allocate`](Self::allocate).
    pub fn deallocate(&mut self, block: Block) -> Result<()> {
        let mut current = self.validate(block)?;

        loop {
            let parent = self.node(current).parent;
            self.release(current);

            match parent {
                Some(p) => {
                    let parent_node = self.node_mut(p);
                    if parent_node.left == Some(current) {
                        parent_node.left = None;
                    } else {
                        parent_node.right = None;
                    }

                    if !parent_node.is_leaf() {
                        return Ok(());
                    }
                    current = p;
                }
                None => {
                    self.root = None;
                    return Ok(());
                }
            }
        }
    }

    /// All allocated blocks, ordered by start address.
    pub fn allocated_blocks(&self) -> Vec<BlockRange> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_leaves(root, &mut out);
        }
        out
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_blocks().iter().map(|b| b.size).sum()
    }

    /// Number of live tree nodes, interior nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_slots.len()
    }

    fn search(&mut self, id: NodeId, block_size: usize) -> Option<NodeId> {
        let node = self.node(id).clone();

        if node.is_leaf() {
            return None;
        }

        if node.size == 2 * block_size {
            return match (node.left, node.right) {
                (None, _) => Some(self.attach_child(id, Side::Left)),
                (_, None) => Some(self.attach_child(id, Side::Right)),
                _ => None,
            };
        }

        if node.size < 2 * block_size {
            return None;
        }

        match (node.left, node.right) {
            (Some(left), Some(right)) => self
                .search(left, block_size)
                .or_else(|| self.search(right, block_size)),
            (Some(left), None) => self
                .search(left, block_size)
                .or_else(|| Some(self.split_spine(id, Side::Right, block_size))),
            (None, Some(right)) => self
                .search(right, block_size)
                .or_else(|| Some(self.split_spine(id, Side::Left, block_size))),
            (None, None) => None,
        }
    }

    /// Materialize the `side` child of `parent`, then keep halving along the
    /// left edge until a node of `block_size` exists. Returns that node.
    fn split_spine(&mut self, parent: NodeId, side: Side, block_size: usize) -> NodeId {
        let mut current = self.attach_child(parent, side);
        while self.node(current).size > block_size {
            current = self.attach_child(current, Side::Left);
        }
        current
    }

    fn attach_child(&mut self, parent: NodeId, side: Side) -> NodeId {
        let (size, start) = {
            let p = self.node(parent);
            debug_assert!(p.child(side).is_none());
            let half = p.size / 2;
            let start = match side {
                Side::Left => p.start,
                Side::Right => p.start + half,
            };
            (half, start)
        };

        let child = self.new_node(size, start, Some(parent));
        let p = self.node_mut(parent);
        match side {
            Side::Left => p.left = Some(child),
            Side::Right => p.right = Some(child),
        }
        child
    }

    fn new_node(&mut self, size: usize, start: usize, parent: Option<NodeId>) -> NodeId {
        let generation = self.next_generation;
        self.next_generation += 1;

        let node = Node {
            size,
            start,
            generation,
            parent,
            left: None,
            right: None,
        };

        match self.free_slots.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.0] = None;
        self.free_slots.push(id.0);
    }

    fn validate(&self, block: Block) -> Result<NodeId> {
        let node = self
            .nodes
            .get(block.node.0)
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == block.generation)
            .ok_or_else(|| {
                Error::memory(format!(
                    "block {}..={} is not allocated",
                    block.start,
                    block.end()
                ))
            })?;

        if !node.is_leaf() {
            return Err(Error::memory(format!(
                "block {}..={} has been split",
                block.start,
                block.end()
            )));
        }

        Ok(block.node)
    }

    fn block_of(&self, id: NodeId) -> Block {
        let node = self.node(id);
        Block {
            node: id,
            generation: node.generation,
            size: node.size,
            start: node.start,
        }
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<BlockRange>) {
        let node = self.node(id);
        if node.is_leaf() {
            out.push(BlockRange {
                size: node.size,
                start: node.start,
                end: node.start + node.size - 1,
            });
            return;
        }
        if let Some(left) = node.left {
            self.collect_leaves(left, out);
        }
        if let Some(right) = node.right {
            self.collect_leaves(right, out);
        }
    }

    // Live ids only ever come from the tree links, so the slot is occupied.
    fn node(&self, id: NodeId) -> &Node {
        match &self.nodes[id.0] {
            Some(node) => node,
            None => unreachable!("dangling buddy node {:?}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.nodes[id.0] {
            Some(node) => node,
            None => unreachable!("dangling buddy node {:?}", id),
        }
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            nodes: Vec::new(),
            free_slots: Vec::new(),
            root: None,
            next_generation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, end: usize) -> (usize, usize) {
        (start, end)
    }

    fn span(block: &Block) -> (usize, usize) {
        (block.start(), block.end())
    }

    #[test]
    fn test_rejects_bad_capacity() {
        assert!(BuddyAllocator::new(0).is_err());
        assert!(BuddyAllocator::new(1000).is_err());
        assert!(BuddyAllocator::new(1024).is_ok());
    }

    #[test]
    fn test_round_trip_reuses_freed_block() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();

        let first = buddy.allocate(100).unwrap();
        assert_eq!(first.size(), 128);
        assert_eq!(span(&first), range(0, 127));

        let second = buddy.allocate(100).unwrap();
        assert_eq!(span(&second), range(128, 255));

        buddy.deallocate(first).unwrap();
        let third = buddy.allocate(100).unwrap();
        assert_eq!(span(&third), range(0, 127));

        buddy.deallocate(second).unwrap();
        buddy.deallocate(third).unwrap();
        assert!(buddy.is_empty());
        assert_eq!(buddy.node_count(), 0);
    }

    #[test]
    fn test_fragmentation_blocks_larger_request() {
        let mut buddy = BuddyAllocator::new(256).unwrap();
        let blocks: Vec<Block> = (0..4).map(|_| buddy.allocate(64).unwrap()).collect();
        assert_eq!(span(&blocks[3]), range(192, 255));
        assert!(buddy.allocate(1).is_none());

        buddy.deallocate(blocks[0]).unwrap();
        buddy.deallocate(blocks[2]).unwrap();

        assert_eq!(buddy.capacity() - buddy.allocated_bytes(), 128);
        assert!(buddy.allocate(100).is_none());

        // A 64 byte request still fits in either hole.
        let refill = buddy.allocate(64).unwrap();
        assert_eq!(span(&refill), range(0, 63));
    }

    #[test]
    fn test_whole_arena_allocation() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        let all = buddy.allocate(1000).unwrap();
        assert_eq!(span(&all), range(0, 1023));
        assert!(buddy.allocate(1).is_none());

        buddy.deallocate(all).unwrap();
        assert!(buddy.is_empty());
        assert!(buddy.allocate(1024).is_some());
    }

    #[test]
    fn test_oversized_and_zero_requests() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        assert!(buddy.allocate(1025).is_none());
        assert!(buddy.is_empty());

        let tiny = buddy.allocate(0).unwrap();
        assert_eq!(tiny.size(), 1);
        assert_eq!(span(&tiny), range(0, 0));
    }

    #[test]
    fn test_materializes_missing_right_subtree() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        let big = buddy.allocate(512).unwrap();
        assert_eq!(span(&big), range(0, 511));

        let small = buddy.allocate(32).unwrap();
        assert_eq!(span(&small), range(512, 543));

        let medium = buddy.allocate(200).unwrap();
        assert_eq!(span(&medium), range(768, 1023));
    }

    #[test]
    fn test_coalescing_stops_at_live_buddy() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        let a = buddy.allocate(128).unwrap();
        let b = buddy.allocate(128).unwrap();
        let c = buddy.allocate(256).unwrap();
        assert_eq!(span(&c), range(256, 511));

        buddy.deallocate(a).unwrap();
        buddy.deallocate(b).unwrap();
        assert!(!buddy.is_empty());
        assert_eq!(buddy.allocated_blocks(), vec![c.range()]);

        // The freed 256 bytes at the bottom coalesced back into one slot.
        let d = buddy.allocate(256).unwrap();
        assert_eq!(span(&d), range(0, 255));
    }

    #[test]
    fn test_double_free_is_reported() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        let a = buddy.allocate(64).unwrap();
        let _b = buddy.allocate(64).unwrap();
        buddy.deallocate(a).unwrap();
        assert!(matches!(buddy.deallocate(a), Err(Error::Memory(_))));
    }

    #[test]
    fn test_stale_block_after_slot_reuse() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        let a = buddy.allocate(64).unwrap();
        buddy.deallocate(a).unwrap();
        let b = buddy.allocate(64).unwrap();
        assert_eq!(span(&a), span(&b));
        assert!(buddy.deallocate(a).is_err());
        assert!(buddy.deallocate(b).is_ok());
    }

    #[test]
    fn test_allocated_blocks_are_ordered() {
        let mut buddy = BuddyAllocator::new(1024).unwrap();
        buddy.allocate(300).unwrap();
        buddy.allocate(10).unwrap();
        buddy.allocate(100).unwrap();

        let blocks = buddy.allocated_blocks();
        let starts: Vec<usize> = blocks.iter().map(|b| b.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(buddy.allocated_bytes(), 512 + 16 + 128);
    }
}
