//! The Program: the memory accountant (spec component A) and the arena that owns every list and
//! handle created under it. Every operation in this crate is a method on `Program`, mirroring the
//! teacher crate's convention that all storage operations route through one `Store`/`Storage`
//! value rather than through free functions.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::handle::RefEntry;
use crate::list::ListBody;

/// Tunable constants for a [`Program`], generalizing the original implementation's preprocessor
/// constants (`NODE_SIZE`, `REF_LIST_NODE_SIZE`) and the data model's `[TYPE_MIN, TYPE_MAX]` and
/// `MAX_CHILDREN` bounds into one builder-style config, passed to [`Program::with_config`].
#[derive(Copy, Clone, Debug)]
pub struct ProgramConfig {
    /// Capacity of each data node (`NODE_SIZE` in the original; must be at least 4).
    pub node_size: usize,
    /// Upper bound on any one list's child count.
    pub max_children: i64,
    /// Lower bound (inclusive) of a list's `type`.
    pub type_min: i64,
    /// Upper bound (inclusive) of a list's `type`.
    pub type_max: i64,
    /// Byte ceiling for this Program's memory accountant. `usize::MAX` means unlimited.
    pub mem_limit: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            node_size: 64,
            max_children: i32::MAX as i64,
            type_min: 0,
            type_max: i32::MAX as i64,
            mem_limit: usize::MAX,
        }
    }
}

/// Approximate accounting costs. These aren't meant to mirror any particular allocator's real
/// overhead exactly, only to be internally consistent: whatever `alloc` charges for a structure,
/// `free` later recovers exactly when that structure is torn down.
pub(crate) const LIST_HEADER_BYTES: usize = 64;
pub(crate) const REF_ENTRY_BYTES: usize = 24;
pub(crate) const NODE_OVERHEAD_BYTES: usize = 32;
pub(crate) const INT_ELEM_BYTES: usize = 8;
pub(crate) const REF_ELEM_BYTES: usize = 8;
pub(crate) const REF_CHUNK_OVERHEAD_BYTES: usize = 16;

enum Slot<T> {
    Used(T),
    Free(Option<u32>),
}

pub(crate) struct Slab<T> {
    entries: Vec<Slot<T>>,
    free_head: Option<u32>,
}

impl<T> Slab<T> {
    fn new() -> Self {
        Slab { entries: Vec::new(), free_head: None }
    }

    pub(crate) fn insert(&mut self, value: T) -> u32 {
        if let Some(idx) = self.free_head {
            let prev = core::mem::replace(&mut self.entries[idx as usize], Slot::Used(value));
            let Slot::Free(next) = prev else { unreachable!("free_head pointed at a used slot") };
            self.free_head = next;
            idx
        } else {
            let idx = self.entries.len() as u32;
            self.entries.push(Slot::Used(value));
            idx
        }
    }

    pub(crate) fn remove(&mut self, idx: u32) -> T {
        let prev = core::mem::replace(&mut self.entries[idx as usize], Slot::Free(self.free_head));
        self.free_head = Some(idx);
        match prev {
            Slot::Used(v) => v,
            Slot::Free(_) => unreachable!("double free of slab slot"),
        }
    }

    pub(crate) fn get(&self, idx: u32) -> &T {
        match &self.entries[idx as usize] {
            Slot::Used(v) => v,
            Slot::Free(_) => unreachable!("dangling slab index"),
        }
    }

    pub(crate) fn get_mut(&mut self, idx: u32) -> &mut T {
        match &mut self.entries[idx as usize] {
            Slot::Used(v) => v,
            Slot::Free(_) => unreachable!("dangling slab index"),
        }
    }
}

/// The owner of every list and handle in one embedding: the memory accountant (§4.A) plus the
/// arenas that back [`ListId`](crate::list::ListId) and `RefId`. All core operations are methods
/// on `Program`; see `ops::primary`, `ops::secondary`, [`crate::intop`], [`crate::unicode`] and
/// [`crate::text`] for the rest of the surface.
pub struct Program {
    pub(crate) config: ProgramConfig,
    used: usize,
    pub(crate) lists: Slab<ListBody>,
    pub(crate) refs: Slab<RefEntry>,
    /// Bumped on every reachability walk so each list's `visit_mark` can be compared against it
    /// instead of being explicitly cleared between walks.
    pub(crate) walk_generation: u32,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// Creates a Program with the default configuration (matching the original implementation's
    /// `NODE_SIZE = 64`, unlimited memory).
    pub fn new() -> Self {
        Self::with_config(ProgramConfig::default())
    }

    /// Creates a Program with an explicit configuration.
    pub fn with_config(config: ProgramConfig) -> Self {
        Program { config, used: 0, lists: Slab::new(), refs: Slab::new(), walk_generation: 0 }
    }

    /// Bytes currently charged against this Program's memory limit.
    pub fn mem_get_used(&self) -> i64 {
        self.used as i64
    }

    /// Sets a new memory limit. Per spec §5, lowering the limit below current usage does not
    /// reclaim anything — it only makes subsequent allocations fail until usage drops below the
    /// new limit.
    pub fn mem_set_limit(&mut self, limit: i64) -> Result<()> {
        if limit < 0 {
            return Err(Error::Precondition);
        }
        self.config.mem_limit = limit as usize;
        Ok(())
    }

    /// Charges `bytes` against the limit, or fails with `mem-limit` without mutating `used`.
    pub(crate) fn charge(&mut self, bytes: usize) -> Result<()> {
        let next = self.used.checked_add(bytes).ok_or(Error::MemLimit)?;
        if next > self.config.mem_limit {
            log::warn!(
                "mem-limit: used={} requested={} limit={}",
                self.used,
                bytes,
                self.config.mem_limit
            );
            return Err(Error::MemLimit);
        }
        self.used = next;
        Ok(())
    }

    /// Releases `bytes` previously charged. Always succeeds, per spec §4.A.
    pub(crate) fn release(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_respects_limit() {
        let mut program = Program::with_config(ProgramConfig { mem_limit: 100, ..ProgramConfig::default() });
        assert!(program.charge(60).is_ok());
        assert_eq!(program.mem_get_used(), 60);
        assert_eq!(program.charge(60), Err(Error::MemLimit));
        assert_eq!(program.mem_get_used(), 60);
        program.release(60);
        assert_eq!(program.mem_get_used(), 0);
    }

    #[test]
    fn lowering_limit_does_not_reclaim() {
        let mut program = Program::new();
        program.charge(500).unwrap();
        program.mem_set_limit(100).unwrap();
        assert_eq!(program.mem_get_used(), 500);
        assert_eq!(program.charge(1), Err(Error::MemLimit));
    }
}
