//! The list object (spec component C): header metadata plus the node-chunk store and back-pointer
//! set that back it.

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::node::NodeArena;
use crate::program::Program;
use crate::refset::RefChunkSet;

/// Identifies one list in a [`Program`](crate::Program)'s arena. Never exposed to callers — the
/// only thing callers ever hold is a [`Handle`](crate::Handle).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ListId(u32);

impl ListId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ListId(raw)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

/// The list object itself: header, node-chunk store, and back-pointer set.
pub(crate) struct ListBody {
    pub(crate) type_: i64,
    pub(crate) tag: i64,
    pub(crate) child_count: i64,
    pub(crate) nodes: NodeArena,
    pub(crate) back_pointers: RefChunkSet,
    /// Total bytes this list has charged against the owning Program's accountant (header + every
    /// node and element currently live). Freed in one shot when the list is reclaimed.
    pub(crate) bytes_charged: usize,
    /// Transient marker used by the reachability walk to avoid revisiting a list within one walk;
    /// meaningless outside of a walk in progress.
    pub(crate) visit_mark: u32,
}

impl ListBody {
    pub(crate) fn new(node_size: usize, type_: i64, tag: i64) -> Self {
        ListBody {
            type_,
            tag,
            child_count: 0,
            nodes: NodeArena::new(node_size),
            back_pointers: RefChunkSet::new(),
            bytes_charged: 0,
            visit_mark: 0,
        }
    }
}

impl Program {
    /// Number of children in the list `h` points at (spec §4.F `getCount`); O(1).
    pub fn get_count(&self, h: Handle) -> i64 {
        crate::ops::primary::get_count(self, h)
    }

    /// This list's user-chosen `type` (spec §4.C `getType`); O(1).
    pub fn get_type(&self, h: Handle) -> i64 {
        let target = self.refs.get(h.id.raw()).target;
        self.lists.get(target.raw()).type_
    }

    /// Sets this list's `type`, bounded to `[TYPE_MIN, TYPE_MAX]` (spec §4.C `setType`).
    pub fn set_type(&mut self, h: Handle, type_: i64) -> Result<()> {
        if type_ < self.config.type_min || type_ > self.config.type_max {
            return Err(Error::BadType);
        }
        let target = self.refs.get(h.id.raw()).target;
        self.lists.get_mut(target.raw()).type_ = type_;
        Ok(())
    }

    /// This list's user-chosen `tag` (spec §4.C `getTag`); unbounded, O(1).
    pub fn get_tag(&self, h: Handle) -> i64 {
        let target = self.refs.get(h.id.raw()).target;
        self.lists.get(target.raw()).tag
    }

    /// Sets this list's `tag` (spec §4.C `setTag`); unbounded, O(1).
    pub fn set_tag(&mut self, h: Handle, tag: i64) {
        let target = self.refs.get(h.id.raw()).target;
        self.lists.get_mut(target.raw()).tag = tag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_is_bounded_tag_is_not() {
        let mut program = Program::new();
        let h = program.init(0, 0).unwrap();
        assert_eq!(program.set_type(h, -1), Err(Error::BadType));
        program.set_type(h, 5).unwrap();
        assert_eq!(program.get_type(h), 5);

        program.set_tag(h, -999);
        assert_eq!(program.get_tag(h), -999);
    }
}
