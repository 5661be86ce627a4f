//! The node-chunk store (spec component B): a doubly linked sequence of fixed-capacity nodes, each
//! holding either a packed run of `Int`s or a packed run of child [`RefId`](crate::handle::RefId)s.
//!
//! This is a from-scratch arena rather than a generic `Storage`/`Store` abstraction, because every
//! node here stores exactly one of two concrete element kinds, never an arbitrary `T`. Slot reuse
//! follows the free-list-over-a-slab shape used throughout the example pack's arena allocators: a
//! stack of freed indices, popped before the slab grows.

use alloc::vec::Vec;

use crate::handle::RefId;

/// 1-based logical index into a list's children, after negative indices have been normalized.
pub(crate) type Index = i64;

/// Which of the two payload shapes a node (or a single child) holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Int,
    Ref,
}

/// A single child value, kind-tagged.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Elem {
    Int(i64),
    Ref(RefId),
}

impl Elem {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Elem::Int(_) => NodeKind::Int,
            Elem::Ref(_) => NodeKind::Ref,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Ints(Vec<i64>),
    Refs(Vec<RefId>),
}

impl NodeData {
    fn kind(&self) -> NodeKind {
        match self {
            NodeData::Ints(_) => NodeKind::Int,
            NodeData::Refs(_) => NodeKind::Ref,
        }
    }

    fn count(&self) -> usize {
        match self {
            NodeData::Ints(v) => v.len(),
            NodeData::Refs(v) => v.len(),
        }
    }

    fn get(&self, offset: usize) -> Elem {
        match self {
            NodeData::Ints(v) => Elem::Int(v[offset]),
            NodeData::Refs(v) => Elem::Ref(v[offset]),
        }
    }

    fn set(&mut self, offset: usize, elem: Elem) {
        match (self, elem) {
            (NodeData::Ints(v), Elem::Int(n)) => v[offset] = n,
            (NodeData::Refs(v), Elem::Ref(r)) => v[offset] = r,
            _ => unreachable!("set() called with mismatched kind"),
        }
    }

    fn push(&mut self, elem: Elem) {
        match (self, elem) {
            (NodeData::Ints(v), Elem::Int(n)) => v.push(n),
            (NodeData::Refs(v), Elem::Ref(r)) => v.push(r),
            _ => unreachable!("push() called with mismatched kind"),
        }
    }

    fn insert(&mut self, offset: usize, elem: Elem) {
        match (self, elem) {
            (NodeData::Ints(v), Elem::Int(n)) => v.insert(offset, n),
            (NodeData::Refs(v), Elem::Ref(r)) => v.insert(offset, r),
            _ => unreachable!("insert() called with mismatched kind"),
        }
    }

    fn remove(&mut self, offset: usize) -> Elem {
        match self {
            NodeData::Ints(v) => Elem::Int(v.remove(offset)),
            NodeData::Refs(v) => Elem::Ref(v.remove(offset)),
        }
    }

    /// Splits off everything from `offset` onward into a fresh `NodeData` of the same kind.
    fn split_off(&mut self, offset: usize) -> NodeData {
        match self {
            NodeData::Ints(v) => NodeData::Ints(v.split_off(offset)),
            NodeData::Refs(v) => NodeData::Refs(v.split_off(offset)),
        }
    }

    fn iter(&self) -> impl Iterator<Item = Elem> + '_ {
        (0..self.count()).map(move |i| self.get(i))
    }
}

struct Slot {
    prev: Option<u32>,
    next: Option<u32>,
    data: NodeData,
}

enum SlabEntry {
    Used(Slot),
    Free(Option<u32>),
}

/// The node-chunk store for a single list. Owned exclusively by its list; never shared.
pub(crate) struct NodeArena {
    slots: Vec<SlabEntry>,
    free_head: Option<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    /// `NODE_SIZE`: the capacity of every node in this arena, taken from the owning
    /// [`Program`](crate::Program)'s [`ProgramConfig`](crate::ProgramConfig) at list-creation time.
    node_size: usize,
}

/// Where a logical index falls, used internally to link or relink the node chain at a boundary.
struct Boundary {
    prev: Option<u32>,
    next: Option<u32>,
}

impl NodeArena {
    pub(crate) fn new(node_size: usize) -> Self {
        NodeArena { slots: Vec::new(), free_head: None, head: None, tail: None, node_size }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn alloc_slot(&mut self, slot: Slot) -> u32 {
        if let Some(idx) = self.free_head {
            let prev = core::mem::replace(&mut self.slots[idx as usize], SlabEntry::Used(slot));
            let SlabEntry::Free(next) = prev else {
                unreachable!("free_head did not point at a free slot");
            };
            self.free_head = next;
            idx
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(SlabEntry::Used(slot));
            idx
        }
    }

    fn free_slot(&mut self, idx: u32) -> NodeData {
        let prev = core::mem::replace(&mut self.slots[idx as usize], SlabEntry::Free(self.free_head));
        self.free_head = Some(idx);
        match prev {
            SlabEntry::Used(slot) => slot.data,
            SlabEntry::Free(_) => unreachable!("double free of node slot"),
        }
    }

    fn slot(&self, idx: u32) -> &Slot {
        match &self.slots[idx as usize] {
            SlabEntry::Used(s) => s,
            SlabEntry::Free(_) => unreachable!("dangling node index"),
        }
    }

    fn slot_mut(&mut self, idx: u32) -> &mut Slot {
        match &mut self.slots[idx as usize] {
            SlabEntry::Used(s) => s,
            SlabEntry::Free(_) => unreachable!("dangling node index"),
        }
    }

    pub(crate) fn node_count(&self, idx: u32) -> usize {
        self.slot(idx).data.count()
    }

    pub(crate) fn node_kind(&self, idx: u32) -> NodeKind {
        self.slot(idx).data.kind()
    }

    /// Locates the node and 0-based offset holding the element currently at 1-based `index`
    /// (`1..=count`). Does not mutate.
    fn locate(&self, index: Index) -> (u32, usize) {
        let mut remaining = index - 1;
        let mut cur = self.head.expect("locate() called on an empty arena");
        loop {
            let n = self.node_count(cur);
            if (remaining as usize) < n {
                return (cur, remaining as usize);
            }
            remaining -= n as i64;
            cur = self.slot(cur).next.expect("index out of bounds in locate()");
        }
    }

    /// Locates the insertion boundary for 1-based insertion position `index` (`1..=count+1`),
    /// splitting a node first if `index` falls in its interior. Returns the (possibly new)
    /// immediate neighbours of the boundary.
    fn locate_boundary(&mut self, index: Index, count: i64) -> Boundary {
        if count == 0 {
            return Boundary { prev: None, next: None };
        }
        if index == count + 1 {
            return Boundary { prev: self.tail, next: None };
        }

        let (node, offset) = self.locate(index);
        if offset == 0 {
            let prev = self.slot(node).prev;
            return Boundary { prev, next: Some(node) };
        }
        if offset == self.node_count(node) {
            let next = self.slot(node).next;
            return Boundary { prev: Some(node), next };
        }

        self.split(node, offset);
        let next = self.slot(node).next.expect("split() must link a successor");
        Boundary { prev: Some(node), next: Some(next) }
    }

    /// Splits `node` so that everything at and after `offset` moves into a freshly linked
    /// successor node of the same kind.
    fn split(&mut self, node: u32, offset: usize) {
        let suffix = self.slot_mut(node).data.split_off(offset);
        let next = self.slot(node).next;
        let new_idx = self.alloc_slot(Slot { prev: Some(node), next, data: suffix });
        if let Some(next) = next {
            self.slot_mut(next).prev = Some(new_idx);
        } else {
            self.tail = Some(new_idx);
        }
        self.slot_mut(node).next = Some(new_idx);
    }

    /// Whether inserting an element of `kind` at 1-based position `index` will need to allocate a
    /// fresh node, computed read-only so callers can price (and mem-limit-check) the operation
    /// before committing to the mutating `insert` call against the same `(index, count)`.
    pub(crate) fn insert_needs_new_node_for(&self, index: Index, count: i64, kind: NodeKind) -> bool {
        if count == 0 {
            return true;
        }
        if index == count + 1 {
            return !matches!(self.tail, Some(t) if self.node_kind(t) == kind && self.node_count(t) < self.node_size);
        }

        let (node, offset) = self.locate(index);
        if offset == 0 {
            let prev_ok = matches!(self.slot(node).prev, Some(p) if self.node_kind(p) == kind && self.node_count(p) < self.node_size);
            let here_ok = self.node_kind(node) == kind && self.node_count(node) < self.node_size;
            return !(prev_ok || here_ok);
        }
        if offset == self.node_count(node) {
            let next_ok = matches!(self.slot(node).next, Some(n) if self.node_kind(n) == kind && self.node_count(n) < self.node_size);
            let here_ok = self.node_kind(node) == kind && self.node_count(node) < self.node_size;
            return !(here_ok || next_ok);
        }

        // Interior offset: `insert` will split `node` into two pieces of `node`'s own kind, each
        // with spare room immediately after the split. A new node is only needed if the inserted
        // element's kind doesn't match the node being split.
        self.node_kind(node) != kind
    }

    fn link_between(&mut self, prev: Option<u32>, next: Option<u32>, new_idx: u32) {
        self.slot_mut(new_idx).prev = prev;
        self.slot_mut(new_idx).next = next;
        match prev {
            Some(p) => self.slot_mut(p).next = Some(new_idx),
            None => self.head = Some(new_idx),
        }
        match next {
            Some(n) => self.slot_mut(n).prev = Some(new_idx),
            None => self.tail = Some(new_idx),
        }
    }

    /// Inserts `elem` at 1-based position `index` (`1..=count+1`). `count` is the list's current
    /// child count, passed in rather than tracked here since the arena doesn't own it.
    pub(crate) fn insert(&mut self, index: Index, count: i64, elem: Elem) {
        let boundary = self.locate_boundary(index, count);
        let kind = elem.kind();

        if let Some(prev) = boundary.prev {
            if self.node_kind(prev) == kind && self.node_count(prev) < self.node_size {
                self.slot_mut(prev).data.push(elem);
                return;
            }
        }
        if let Some(next) = boundary.next {
            if self.node_kind(next) == kind && self.node_count(next) < self.node_size {
                self.slot_mut(next).data.insert(0, elem);
                return;
            }
        }

        let data = Self::singleton(elem);
        let new_idx = self.alloc_slot(Slot { prev: None, next: None, data });
        self.link_between(boundary.prev, boundary.next, new_idx);
    }

    fn singleton(elem: Elem) -> NodeData {
        match elem {
            Elem::Int(n) => NodeData::Ints(alloc::vec![n]),
            Elem::Ref(r) => NodeData::Refs(alloc::vec![r]),
        }
    }

    /// Reads the element at 1-based `index` without mutating.
    pub(crate) fn get(&self, index: Index) -> Elem {
        let (node, offset) = self.locate(index);
        self.slot(node).data.get(offset)
    }

    /// Overwrites the element at 1-based `index` in place. `elem` must be the same kind as what's
    /// already there; callers needing a kind change must `remove` then `insert`.
    pub(crate) fn set(&mut self, index: Index, elem: Elem) {
        let (node, offset) = self.locate(index);
        self.slot_mut(node).data.set(offset, elem);
    }

    /// Removes and returns the element at 1-based `index`, freeing its node if it becomes empty.
    pub(crate) fn remove(&mut self, index: Index) -> Elem {
        let (node, offset) = self.locate(index);
        let elem = self.slot_mut(node).data.remove(offset);
        if self.node_count(node) == 0 {
            self.unlink_and_free(node);
        }
        elem
    }

    fn unlink_and_free(&mut self, node: u32) {
        let (prev, next) = {
            let s = self.slot(node);
            (s.prev, s.next)
        };
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
        self.free_slot(node);
    }

    /// Whether removing the element at 1-based `index` will also free its node (for accounting).
    pub(crate) fn remove_frees_node(&self, index: Index) -> bool {
        let (node, _) = self.locate(index);
        self.node_count(node) == 1
    }

    /// Counts the physical nodes currently linked in this arena. Used for memory accounting when
    /// a chain of nodes moves between arenas verbatim (`enlist`/`delist`), where the per-node
    /// overhead charge needs to move with it rather than being re-derived from element counts.
    pub(crate) fn node_chain_len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head;
        while let Some(idx) = cur {
            n += 1;
            cur = self.slot(idx).next;
        }
        n
    }

    /// Iterates every child in order, without mutating.
    pub(crate) fn iter(&self) -> impl Iterator<Item = Elem> + '_ {
        let mut cur = self.head;
        core::iter::from_fn(move || {
            let idx = cur?;
            cur = self.slot(idx).next;
            Some(idx)
        })
        .flat_map(move |idx| self.slot(idx).data.iter())
    }

    /// Iterates the inclusive 1-based `[start, end]` range without mutating. Linear in `start`,
    /// matching the original's own node-walking `copySpan`.
    pub(crate) fn iter_range(&self, start: Index, end: Index) -> impl Iterator<Item = Elem> + '_ {
        let skip = (start - 1) as usize;
        let take = (end - start + 1) as usize;
        self.iter().skip(skip).take(take)
    }

    /// Appends a whole run of same-kind elements to the tail, chunking into `node_size`-capacity
    /// nodes. Used to build fresh arenas (copy, decode) without going through per-element insert.
    pub(crate) fn append_run_ints(&mut self, values: impl Iterator<Item = i64>) {
        self.append_run(values.map(Elem::Int));
    }

    pub(crate) fn append_run_refs(&mut self, values: impl Iterator<Item = RefId>) {
        self.append_run(values.map(Elem::Ref));
    }

    fn append_run(&mut self, values: impl Iterator<Item = Elem>) {
        for elem in values {
            if let Some(tail) = self.tail {
                if self.node_kind(tail) == elem.kind() && self.node_count(tail) < self.node_size {
                    self.slot_mut(tail).data.push(elem);
                    continue;
                }
            }
            let data = Self::singleton(elem);
            let new_idx = self.alloc_slot(Slot { prev: self.tail, next: None, data });
            match self.tail {
                Some(t) => self.slot_mut(t).next = Some(new_idx),
                None => self.head = Some(new_idx),
            }
            self.tail = Some(new_idx);
        }
    }

    /// Detaches the inclusive 1-based `[start, end]` node-chain from `self` (splitting node
    /// boundaries as needed) and returns it as a standalone arena along with the element count
    /// moved. `self`'s own `head`/`tail`/counts are repaired to no longer include the range.
    pub(crate) fn extract_subchain(&mut self, start: Index, end: Index, count: i64) -> (NodeArena, i64) {
        let start_boundary = self.locate_boundary(start, count);
        let start_node = start_boundary.next.expect("non-empty range must have a start node");

        // Splitting at `start` never changes the total element count, so `count` is still valid
        // for locating the end boundary.
        let end_boundary = self.locate_boundary(end + 1, count);
        let end_node = end_boundary.prev.expect("non-empty range must have an end node");

        let before = self.slot(start_node).prev;
        let after = self.slot(end_node).next;

        match before {
            Some(p) => self.slot_mut(p).next = after,
            None => self.head = after,
        }
        match after {
            Some(n) => self.slot_mut(n).prev = before,
            None => self.tail = before,
        }

        let mut extracted = NodeArena::new(self.node_size);
        let mut moved: i64 = 0;
        let mut cur = Some(start_node);
        let mut prev_new: Option<u32> = None;
        while let Some(idx) = cur {
            let next = self.slot(idx).next;
            moved += self.node_count(idx) as i64;
            let data = self.free_slot(idx);
            let new_idx = extracted.alloc_slot(Slot { prev: prev_new, next: None, data });
            if let Some(p) = prev_new {
                extracted.slot_mut(p).next = Some(new_idx);
            } else {
                extracted.head = Some(new_idx);
            }
            extracted.tail = Some(new_idx);
            prev_new = Some(new_idx);
            cur = if idx == end_node { None } else { next };
        }

        (extracted, moved)
    }

    /// Splices a detached chain `other` in as a whole, at the boundary for 1-based insertion
    /// position `index`. `other` is consumed; its nodes are adopted into `self`'s slab as-is (no
    /// attempt is made to merge its edge nodes into `self`'s neighbouring nodes — per spec N2,
    /// adjacent nodes needn't be of distinct kinds or merged).
    pub(crate) fn splice_in(&mut self, index: Index, count: i64, other: NodeArena) {
        let Some(other_head) = other.head else { return };
        let other_tail = other.tail.expect("non-empty arena must have a tail");

        let boundary = self.locate_boundary(index, count);

        let base = self.slots.len() as u32;
        for slot in other.slots {
            match slot {
                SlabEntry::Used(s) => self.slots.push(SlabEntry::Used(Slot {
                    prev: s.prev.map(|i| i + base),
                    next: s.next.map(|i| i + base),
                    data: s.data,
                })),
                SlabEntry::Free(_) => self.slots.push(SlabEntry::Free(None)),
            }
        }
        let new_head = other_head + base;
        let new_tail = other_tail + base;

        match boundary.prev {
            Some(p) => self.slot_mut(p).next = Some(new_head),
            None => self.head = Some(new_head),
        }
        self.slot_mut(new_head).prev = boundary.prev;

        match boundary.next {
            Some(n) => self.slot_mut(n).prev = Some(new_tail),
            None => self.tail = Some(new_tail),
        }
        self.slot_mut(new_tail).next = boundary.next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> NodeArena {
        let mut arena = NodeArena::new(4);
        arena.append_run_ints(values.iter().copied());
        arena
    }

    #[test]
    fn append_and_iter_roundtrip() {
        let arena = ints(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let got: Vec<i64> = arena
            .iter()
            .map(|e| match e {
                Elem::Int(n) => n,
                Elem::Ref(_) => unreachable!(),
            })
            .collect();
        assert_eq!(got, alloc::vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn insert_at_every_position() {
        let mut arena = NodeArena::new(4);
        let mut count = 0i64;
        for n in 1..=20 {
            arena.insert(count + 1, count, Elem::Int(n));
            count += 1;
        }
        let got: Vec<i64> = arena
            .iter()
            .map(|e| match e {
                Elem::Int(n) => n,
                Elem::Ref(_) => unreachable!(),
            })
            .collect();
        assert_eq!(got, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn remove_from_front_back_and_middle() {
        let mut arena = ints(&[1, 2, 3, 4, 5]);
        assert_eq!(arena.remove(1), Elem::Int(1));
        assert_eq!(arena.remove(4), Elem::Int(5));
        assert_eq!(arena.remove(2), Elem::Int(3));
        let got: Vec<i64> = arena
            .iter()
            .map(|e| match e {
                Elem::Int(n) => n,
                Elem::Ref(_) => unreachable!(),
            })
            .collect();
        assert_eq!(got, alloc::vec![2, 4]);
    }

    #[test]
    fn split_preserves_contents() {
        let mut arena = ints(&[1, 2, 3, 4, 5, 6, 7, 8]);
        arena.split(0, 3);
        let got: Vec<i64> = arena
            .iter()
            .map(|e| match e {
                Elem::Int(n) => n,
                Elem::Ref(_) => unreachable!(),
            })
            .collect();
        assert_eq!(got, alloc::vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn extract_and_splice_roundtrip() {
        let mut arena = ints(&[1, 2, 3, 4, 5]);
        let (chain, moved) = arena.extract_subchain(2, 4, 5);
        assert_eq!(moved, 3);
        let remaining: Vec<i64> = arena
            .iter()
            .map(|e| match e {
                Elem::Int(n) => n,
                Elem::Ref(_) => unreachable!(),
            })
            .collect();
        assert_eq!(remaining, alloc::vec![1, 5]);

        arena.splice_in(2, 2, chain);
        let got: Vec<i64> = arena
            .iter()
            .map(|e| match e {
                Elem::Int(n) => n,
                Elem::Ref(_) => unreachable!(),
            })
            .collect();
        assert_eq!(got, alloc::vec![1, 2, 3, 4, 5]);
    }
}
