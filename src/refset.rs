//! A list's back-pointer set: every [`RefId`] that targets it, used by the reachability collector
//! to walk toward a root (spec component E, data model §3's "back-pointer set").
//!
//! The original implementation keeps this set itself node-chunked (`trotListRefListNode`, capacity
//! `REF_LIST_NODE_SIZE`) rather than as one flat growable array, presumably to keep any single
//! allocation small and because its bump/free-list node allocator was already on hand. `RefChunkSet`
//! reproduces that shape: a chain of small fixed-capacity chunks, new ones appended only once the
//! last is full, with O(chunk) removal by swapping in the last occupied slot.

use alloc::vec::Vec;

use crate::handle::RefId;

/// Capacity of each chunk, mirroring the original's `REF_LIST_NODE_SIZE`.
pub(crate) const REF_LIST_NODE_SIZE: usize = 16;

#[derive(Default)]
pub(crate) struct RefChunkSet {
    chunks: Vec<Vec<RefId>>,
    len: usize,
}

impl RefChunkSet {
    pub(crate) fn new() -> Self {
        RefChunkSet { chunks: Vec::new(), len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether inserting one more entry will need a fresh chunk, for memory accounting ahead of
    /// `insert`.
    pub(crate) fn insert_needs_new_chunk(&self) -> bool {
        match self.chunks.last() {
            Some(chunk) => chunk.len() >= REF_LIST_NODE_SIZE,
            None => true,
        }
    }

    pub(crate) fn insert(&mut self, id: RefId) {
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < REF_LIST_NODE_SIZE => chunk.push(id),
            _ => {
                let mut chunk = Vec::with_capacity(REF_LIST_NODE_SIZE);
                chunk.push(id);
                self.chunks.push(chunk);
            }
        }
        self.len += 1;
    }

    /// Removes one occurrence of `id`. Whether the removal also frees an emptied chunk (for
    /// accounting) is reported via the return value.
    pub(crate) fn remove(&mut self, id: RefId) -> bool {
        for chunk in self.chunks.iter_mut() {
            if let Some(pos) = chunk.iter().position(|&r| r == id) {
                chunk.swap_remove(pos);
                self.len -= 1;
                let chunk_freed = chunk.is_empty();
                if chunk_freed {
                    let idx = self.chunks.iter().position(|c| c.is_empty()).unwrap();
                    self.chunks.remove(idx);
                }
                return chunk_freed;
            }
        }
        false
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = RefId> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut set = RefChunkSet::new();
        for i in 0..40u32 {
            set.insert(RefId::from_raw(i));
        }
        assert_eq!(set.len(), 40);

        assert!(set.remove(RefId::from_raw(5)));
        assert_eq!(set.len(), 39);
        assert!(!set.iter().any(|r| r == RefId::from_raw(5)));

        assert!(!set.remove(RefId::from_raw(5)));
    }

    #[test]
    fn empties_fully() {
        let mut set = RefChunkSet::new();
        set.insert(RefId::from_raw(1));
        set.insert(RefId::from_raw(2));
        set.remove(RefId::from_raw(1));
        set.remove(RefId::from_raw(2));
        assert!(set.is_empty());
    }
}
