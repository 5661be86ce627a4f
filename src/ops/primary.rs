//! Primary operations (spec §4.F): the operations every list supports regardless of `type`, and
//! the only ones that touch a list's node-chunk store directly. Every secondary operation in
//! [`super::secondary`] is built out of these.

use crate::error::{Error, Result};
use crate::handle::{Handle, Kind};
use crate::node::{Elem, NodeKind};
use crate::ops::{normalize_index, normalize_insert_index, Child};
use crate::program::{Program, INT_ELEM_BYTES, NODE_OVERHEAD_BYTES, REF_ELEM_BYTES};

fn elem_bytes(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Int => INT_ELEM_BYTES,
        NodeKind::Ref => REF_ELEM_BYTES,
    }
}

fn child_to_elem(child: Child) -> Elem {
    match child {
        Child::Int(n) => Elem::Int(n),
        Child::List(h) => Elem::Ref(h.id),
    }
}

fn elem_to_child(program: &mut Program, elem: Elem) -> Result<Child> {
    match elem {
        Elem::Int(n) => Ok(Child::Int(n)),
        Elem::Ref(id) => {
            let target = program.refs.get(id.raw()).target;
            program.new_root(target).map(Child::List)
        }
    }
}

fn kind_of(k: Kind) -> NodeKind {
    match k {
        Kind::Int => NodeKind::Int,
        Kind::List => NodeKind::Ref,
    }
}

/// Number of children in the list `h` points at (spec §4.F `getCount`).
pub(crate) fn get_count(program: &Program, h: Handle) -> i64 {
    let target = program.refs.get(h.id.raw()).target;
    program.lists.get(target.raw()).child_count
}

/// Whether the child at `index` (positive or negative, spec §4.B) is an `Int` or a `List` (spec
/// §4.F `getKind`).
pub(crate) fn get_kind(program: &Program, h: Handle, index: i64) -> Result<Kind> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let index = normalize_index(index, body.child_count)?;
    Ok(body.nodes.get(index).kind().into())
}

impl From<NodeKind> for Kind {
    fn from(k: NodeKind) -> Self {
        match k {
            NodeKind::Int => Kind::Int,
            NodeKind::Ref => Kind::List,
        }
    }
}

/// Inserts `child` at `index` (`1..=count+1`, or the matching negative range; `-1` appends after
/// the last child — spec §4.B) into the list `h` points at (spec §4.F `insert`). If `child` is a
/// `List`, the handle it carries is consumed: its reference is reparented into `h`'s list and must
/// not be used as a root afterward.
pub(crate) fn insert(program: &mut Program, h: Handle, index: i64, child: Child) -> Result<()> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let count = body.child_count;
    let index = normalize_insert_index(index, count)?;
    if count >= program.config.max_children {
        return Err(Error::ListOverflow);
    }

    let kind = kind_of(child.kind());
    let needs_new_node = body.nodes.insert_needs_new_node_for(index, count, kind);
    let cost = elem_bytes(kind) + if needs_new_node { NODE_OVERHEAD_BYTES } else { 0 };
    program.charge(cost)?;

    let elem = child_to_elem(child);
    let body = program.lists.get_mut(target.raw());
    body.nodes.insert(index, count, elem);
    body.bytes_charged += cost;
    body.child_count += 1;

    if let Child::List(inner) = child {
        program.refs.get_mut(inner.id.raw()).parent = crate::handle::Parent::Inside(target);
    }
    Ok(())
}

/// Appends `child` to the end of the list `h` points at (spec §4.F `append`), equivalent to
/// `insert` at `getCount(h) + 1`.
pub(crate) fn append(program: &mut Program, h: Handle, child: Child) -> Result<()> {
    let count = get_count(program, h);
    insert(program, h, count + 1, child)
}

/// Reads the child at 1-based `index` without removing it (spec §4.F `get`). If it's a `List`, a
/// fresh root handle is minted — the caller owns it independently and must eventually drop it.
pub(crate) fn get(program: &mut Program, h: Handle, index: i64) -> Result<Child> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let index = normalize_index(index, body.child_count)?;
    let elem = body.nodes.get(index);
    elem_to_child(program, elem)
}

/// Removes and returns the child at 1-based `index` (spec §4.F `remove`). A removed `List` child
/// comes back as a fresh root handle; the list it referenced is re-checked for reachability only
/// through the handle the caller now owns, so it is never reclaimed out from under the caller.
pub(crate) fn remove(program: &mut Program, h: Handle, index: i64) -> Result<Child> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let index = normalize_index(index, body.child_count)?;
    let frees_node = body.nodes.remove_frees_node(index);

    let body = program.lists.get_mut(target.raw());
    let elem = body.nodes.remove(index);
    body.child_count -= 1;
    let freed = elem_bytes(elem.kind()) + if frees_node { NODE_OVERHEAD_BYTES } else { 0 };
    body.bytes_charged -= freed;
    program.release(freed);

    if let Elem::Ref(id) = elem {
        let child_target = program.refs.get(id.raw()).target;
        program.refs.remove(id.raw());
        program.release(crate::program::REF_ENTRY_BYTES);
        let chunk_freed = program.lists.get_mut(child_target.raw()).back_pointers.remove(id);
        if chunk_freed {
            program.release(crate::program::REF_CHUNK_OVERHEAD_BYTES);
        }
        return program.new_root(child_target).map(Child::List);
    }
    Ok(Child::Int(match elem {
        Elem::Int(n) => n,
        Elem::Ref(_) => unreachable!(),
    }))
}

/// Replaces the child at 1-based `index` with `child`, returning the old value (spec §4.F
/// `replace`). Priced and mutated as a single atomic step: either both the removal and the
/// insertion happen, or neither does.
pub(crate) fn replace(program: &mut Program, h: Handle, index: i64, child: Child) -> Result<Child> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let count = body.child_count;
    let index = normalize_index(index, count)?;

    let new_kind = kind_of(child.kind());
    let needs_new_node = body.nodes.insert_needs_new_node_for(index, count, new_kind);
    let new_cost = elem_bytes(new_kind) + if needs_new_node { NODE_OVERHEAD_BYTES } else { 0 };
    program.charge(new_cost)?;

    let frees_node = program.lists.get(target.raw()).nodes.remove_frees_node(index);
    let body = program.lists.get_mut(target.raw());
    let old_elem = body.nodes.remove(index);
    let old_cost = elem_bytes(old_elem.kind()) + if frees_node { NODE_OVERHEAD_BYTES } else { 0 };
    program.release(old_cost);

    let new_elem = child_to_elem(child);
    let body = program.lists.get_mut(target.raw());
    body.nodes.insert(index, count - 1, new_elem);
    body.bytes_charged = body.bytes_charged + new_cost - old_cost;

    if let Child::List(inner) = child {
        program.refs.get_mut(inner.id.raw()).parent = crate::handle::Parent::Inside(target);
    }

    if let Elem::Ref(id) = old_elem {
        let child_target = program.refs.get(id.raw()).target;
        program.refs.remove(id.raw());
        program.release(crate::program::REF_ENTRY_BYTES);
        let chunk_freed = program.lists.get_mut(child_target.raw()).back_pointers.remove(id);
        if chunk_freed {
            program.release(crate::program::REF_CHUNK_OVERHEAD_BYTES);
        }
        return program.new_root(child_target).map(Child::List);
    }
    Ok(Child::Int(match old_elem {
        Elem::Int(n) => n,
        Elem::Ref(_) => unreachable!(),
    }))
}

/// Checks the kind of the child at `index` without mutating or minting a handle, for callers that
/// need to fail *before* committing to a mutating path (spec §7: "observable half-mutations are
/// forbidden").
fn peek_kind(program: &Program, h: Handle, index: i64) -> Result<(i64, NodeKind)> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let index = normalize_index(index, body.child_count)?;
    Ok((index, body.nodes.get(index).kind()))
}

/// Drops a handle that a caller never took ownership of, e.g. the old value of a
/// `replace_with_int`/`replace_with_list` call whose return type discards it. Runs the same
/// reachability walk a normal `drop` would.
fn drop_unused(program: &mut Program, child: Child) {
    if let Child::List(h) = child {
        program.drop_handle(h);
    }
}

impl Program {
    /// Whether the child at `index` is an `Int` or a `List` (spec §4.F `getKind`).
    pub fn get_kind(&self, h: Handle, index: i64) -> Result<Kind> {
        get_kind(self, h, index)
    }

    /// Appends an `Int` to the end of the list `h` points at (spec §4.F `append_int`).
    pub fn append_int(&mut self, h: Handle, value: i64) -> Result<()> {
        append(self, h, Child::Int(value))
    }

    /// Inserts an `Int` at `index` (spec §4.F `insert_int`).
    pub fn insert_int(&mut self, h: Handle, index: i64, value: i64) -> Result<()> {
        insert(self, h, index, Child::Int(value))
    }

    /// Appends a twin of `list` to the end of the list `h` points at (spec §4.F
    /// `append_list`). `list` is consumed: after this call it is reparented and must not be
    /// dropped by the caller as a root.
    pub fn append_list(&mut self, h: Handle, list: Handle) -> Result<()> {
        append(self, h, Child::List(list))
    }

    /// Inserts a reference to `list` at `index` (spec §4.F `insert_list`). `list` is consumed in
    /// the same way as [`Program::append_list`].
    pub fn insert_list(&mut self, h: Handle, index: i64, list: Handle) -> Result<()> {
        insert(self, h, index, Child::List(list))
    }

    /// Reads the `Int` at `index` (spec §4.F `get_int`). Fails `wrong-kind` if that child is a
    /// list, without mutating anything.
    pub fn get_int(&mut self, h: Handle, index: i64) -> Result<i64> {
        let (index, kind) = peek_kind(self, h, index)?;
        if kind != NodeKind::Int {
            return Err(Error::WrongKind);
        }
        match get(self, h, index)? {
            Child::Int(n) => Ok(n),
            Child::List(_) => unreachable!("peek_kind confirmed Int"),
        }
    }

    /// Reads the list at `index` as a fresh handle the caller now owns (spec §4.F `get_list`).
    /// Fails `wrong-kind` if that child is an int, without minting anything.
    pub fn get_list(&mut self, h: Handle, index: i64) -> Result<Handle> {
        let (index, kind) = peek_kind(self, h, index)?;
        if kind != NodeKind::List {
            return Err(Error::WrongKind);
        }
        match get(self, h, index)? {
            Child::List(h) => Ok(h),
            Child::Int(_) => unreachable!("peek_kind confirmed List"),
        }
    }

    /// Removes and returns the child at `index`, whichever kind it is (spec §4.F `remove`).
    pub fn remove(&mut self, h: Handle, index: i64) -> Result<Child> {
        remove(self, h, index)
    }

    /// Removes the `Int` at `index` (spec §4.F `remove_int`). Fails `wrong-kind` if that child is
    /// a list, without removing anything.
    pub fn remove_int(&mut self, h: Handle, index: i64) -> Result<i64> {
        let (index, kind) = peek_kind(self, h, index)?;
        if kind != NodeKind::Int {
            return Err(Error::WrongKind);
        }
        match remove(self, h, index)? {
            Child::Int(n) => Ok(n),
            Child::List(_) => unreachable!("peek_kind confirmed Int"),
        }
    }

    /// Removes the list reference at `index`, returning a fresh handle the caller now owns (spec
    /// §4.F `remove_list`). Fails `wrong-kind` if that child is an int.
    pub fn remove_list(&mut self, h: Handle, index: i64) -> Result<Handle> {
        let (index, kind) = peek_kind(self, h, index)?;
        if kind != NodeKind::List {
            return Err(Error::WrongKind);
        }
        match remove(self, h, index)? {
            Child::List(h) => Ok(h),
            Child::Int(_) => unreachable!("peek_kind confirmed List"),
        }
    }

    /// Replaces the child at `index` with an `Int` (spec §4.F `replace_with_int`). The old value,
    /// if it was a list reference, is dropped on the caller's behalf so it isn't leaked.
    pub fn replace_with_int(&mut self, h: Handle, index: i64, value: i64) -> Result<()> {
        let old = replace(self, h, index, Child::Int(value))?;
        drop_unused(self, old);
        Ok(())
    }

    /// Replaces the child at `index` with a reference to `list` (spec §4.F `replace_with_list`).
    /// `list` is consumed the same way as [`Program::append_list`]; the old value, if it was a
    /// list reference, is dropped on the caller's behalf.
    pub fn replace_with_list(&mut self, h: Handle, index: i64, list: Handle) -> Result<()> {
        let old = replace(self, h, index, Child::List(list))?;
        drop_unused(self, old);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Kind;

    #[test]
    fn append_and_get_ints() {
        let mut program = Program::new();
        let h = program.init(0, 0).unwrap();
        for n in 1..=5 {
            append(&mut program, h, Child::Int(n)).unwrap();
        }
        assert_eq!(get_count(&program, h), 5);
        for n in 1..=5 {
            match get(&mut program, h, n).unwrap() {
                Child::Int(v) => assert_eq!(v, n),
                Child::List(_) => panic!("expected int"),
            }
        }
        assert_eq!(get_kind(&program, h, 1).unwrap(), Kind::Int);
    }

    #[test]
    fn insert_bad_index_is_rejected() {
        let mut program = Program::new();
        let h = program.init(0, 0).unwrap();
        assert_eq!(insert(&mut program, h, 0, Child::Int(1)), Err(Error::BadIndex));
        assert_eq!(insert(&mut program, h, 2, Child::Int(1)), Err(Error::BadIndex));
    }

    #[test]
    fn remove_and_replace_round_trip() {
        let mut program = Program::new();
        let h = program.init(0, 0).unwrap();
        append(&mut program, h, Child::Int(10)).unwrap();
        append(&mut program, h, Child::Int(20)).unwrap();
        let removed = remove(&mut program, h, 1).unwrap();
        assert!(matches!(removed, Child::Int(10)));
        assert_eq!(get_count(&program, h), 1);

        let old = replace(&mut program, h, 1, Child::Int(99)).unwrap();
        assert!(matches!(old, Child::Int(20)));
        match get(&mut program, h, 1).unwrap() {
            Child::Int(v) => assert_eq!(v, 99),
            Child::List(_) => panic!("expected int"),
        }
    }

    #[test]
    fn appending_a_list_reparents_it() {
        let mut program = Program::new();
        let parent = program.init(0, 0).unwrap();
        let child = program.init(0, 0).unwrap();
        append(&mut program, parent, Child::List(child)).unwrap();
        assert_eq!(get_count(&program, parent), 1);
        match get(&mut program, parent, 1).unwrap() {
            Child::List(h2) => {
                program.drop_handle(h2);
            }
            Child::Int(_) => panic!("expected list"),
        }
    }
}
