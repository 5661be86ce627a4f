//! Handles: client-visible references to lists (spec component D), and the back-pointer registry
//! they're drawn from.
//!
//! Every reference to a list anywhere — held by the embedder, or stored inside another list's
//! reference nodes — is represented the same way: a [`RefId`] indexing into the
//! [`Program`](crate::Program)'s `refs` slab. What distinguishes a "root" handle from one stored
//! inside a list is just its [`Parent`] tag. A [`Handle`] is nothing more than a `Copy` wrapper
//! around the `RefId` that the embedder is allowed to hold; the engine never hands out a bare
//! `RefId` to a caller.

use crate::error::Result;
use crate::list::{ListBody, ListId};
use crate::program::{Program, LIST_HEADER_BYTES, REF_CHUNK_OVERHEAD_BYTES, REF_ENTRY_BYTES};

/// Identifies one back-pointer entry: a single registered reference to a list, whether held as a
/// root by the embedder or stored inside another list's reference node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RefId(u32);

impl RefId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        RefId(raw)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }
}

/// Whether a [`RefId`] is held by the embedder (a root) or stored inside another list's reference
/// node (and if so, which list).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Parent {
    Root,
    Inside(ListId),
}

/// One entry in the global reference table: what list this reference targets, and where it lives.
pub(crate) struct RefEntry {
    pub(crate) target: ListId,
    pub(crate) parent: Parent,
}

/// A client-visible reference to a [`List`](crate::list). Two handles compare equal (via
/// [`Program::ref_compare`](crate::Program::ref_compare), not `==`) when they target the same
/// list — `Handle` itself intentionally has no `PartialEq`, since handle identity (which back-
/// pointer entry this is) and target identity (which list it points at) are different questions,
/// and conflating them is a common source of bugs when porting a C API with two pointers per
/// reference (`lParent`/`lPointsTo`) into one value.
#[derive(Copy, Clone, Debug)]
pub struct Handle {
    pub(crate) id: RefId,
}

impl Handle {
    pub(crate) fn from_ref_id(id: RefId) -> Self {
        Handle { id }
    }
}

/// Whether a child is an integer or another list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Int,
    List,
}

impl Program {
    /// Creates a new, empty list and returns a root handle to it (spec §4.A `init`). `type_` and
    /// `tag` are caller-chosen metadata, not interpreted by the engine itself.
    pub fn init(&mut self, type_: i64, tag: i64) -> Result<Handle> {
        if type_ < self.config.type_min || type_ > self.config.type_max {
            return Err(crate::error::Error::BadType);
        }
        self.charge(LIST_HEADER_BYTES)?;
        let target = ListId::from_raw(self.lists.insert(ListBody::new(self.config.node_size, type_, tag)));
        match self.new_root(target) {
            Ok(h) => Ok(h),
            Err(e) => {
                self.release(LIST_HEADER_BYTES);
                self.lists.remove(target.raw());
                Err(e)
            }
        }
    }

    /// Registers a fresh root handle pointing at `target`, charging and recording its back-pointer.
    /// Charges `REF_CHUNK_OVERHEAD_BYTES` too when the insert will need a fresh back-pointer chunk,
    /// symmetric with the chunk-overhead release on the other end (`drop_handle`,
    /// `collector::reclaim`, the `remove_int`/`remove_list` paths).
    pub(crate) fn new_root(&mut self, target: ListId) -> Result<Handle> {
        self.charge(REF_ENTRY_BYTES)?;
        let needs_new_chunk = self.lists.get(target.raw()).back_pointers.insert_needs_new_chunk();
        if needs_new_chunk {
            if let Err(e) = self.charge(REF_CHUNK_OVERHEAD_BYTES) {
                self.release(REF_ENTRY_BYTES);
                return Err(e);
            }
        }
        let id = RefId::from_raw(self.refs.insert(RefEntry { target, parent: Parent::Root }));
        self.lists.get_mut(target.raw()).back_pointers.insert(id);
        Ok(Handle::from_ref_id(id))
    }

    /// Creates a second root handle to the same list `h` points at (spec §4.F `twin`). The two
    /// handles are independent: dropping one never affects the other's validity.
    pub fn twin(&mut self, h: Handle) -> Result<Handle> {
        let target = self.refs.get(h.id.raw()).target;
        self.new_root(target)
    }

    /// Whether `a` and `b` currently reference the same list (spec §4.G `compare`, identity case).
    pub fn ref_compare(&self, a: Handle, b: Handle) -> bool {
        self.refs.get(a.id.raw()).target == self.refs.get(b.id.raw()).target
    }

    /// Drops a root handle (spec §4.A `drop`), deregisters its back-pointer, and runs the
    /// reachability walk from the list it pointed at so any now-unreachable cycle is reclaimed.
    pub fn drop_handle(&mut self, h: Handle) {
        let entry = self.refs.remove(h.id.raw());
        debug_assert_eq!(entry.parent, Parent::Root, "drop_handle called with a non-root RefId");
        self.release(REF_ENTRY_BYTES);
        let chunk_freed = self.lists.get_mut(entry.target.raw()).back_pointers.remove(h.id);
        if chunk_freed {
            self.release(crate::program::REF_CHUNK_OVERHEAD_BYTES);
        }
        crate::collector::collect_from(self, entry.target);
    }
}
