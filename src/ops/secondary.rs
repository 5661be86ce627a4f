//! Secondary operations (spec §4.G): `copy`, `copySpan`, `removeSpan`, `enlist`, `delist`, and
//! structural `compare`. Everything here is built out of [`super::primary`] and [`NodeArena`]'s
//! chain-level primitives rather than touching the node slab directly, except `enlist`/`delist`,
//! which move whole node chains between arenas to avoid the original's one-at-a-time reparenting
//! cost (spec.md's supplemented feature: "bulk re-parenting, not naive remove+insert").

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::error::{Error, Result};
use crate::handle::{Handle, Parent};
use crate::list::ListId;
use crate::node::{Elem, NodeArena};
use crate::ops::{normalize_index, primary, Child};
use crate::program::{Program, INT_ELEM_BYTES, NODE_OVERHEAD_BYTES, REF_ELEM_BYTES};

/// Bytes a whole detached node chain represents, for moving accounting custody between two lists'
/// `bytes_charged` without any net change to the Program's `used` counter.
fn chain_bytes(chain: &NodeArena) -> usize {
    let mut bytes = chain.node_chain_len() * NODE_OVERHEAD_BYTES;
    for elem in chain.iter() {
        bytes += match elem {
            Elem::Int(_) => INT_ELEM_BYTES,
            Elem::Ref(_) => REF_ELEM_BYTES,
        };
    }
    bytes
}

/// Normalizes and orders a `[start, end]` span against `count` (spec §4.B indexing, with the
/// "swap if end < start" rule from §4.G span ops).
fn normalize_span(start: i64, end: i64, count: i64) -> Result<(i64, i64)> {
    let mut start = normalize_index(start, count)?;
    let mut end = normalize_index(end, count)?;
    if end < start {
        core::mem::swap(&mut start, &mut end);
    }
    Ok((start, end))
}

/// Copies the inclusive span `[start, end]` into a fresh list (spec §4.G `copySpan`). Integer
/// children are copied by value; list children get a fresh twin handle registered in the child's
/// back-pointer set. The source is never modified; its `type`/`tag` are copied onto the result.
pub(crate) fn copy_span(program: &mut Program, h: Handle, start: i64, end: i64) -> Result<Handle> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    let (start, end) = normalize_span(start, end, body.child_count)?;
    let (type_, tag) = (body.type_, body.tag);

    let elems: Vec<Elem> = body.nodes.iter_range(start, end).collect();
    let new_handle = program.init(type_, tag)?;

    for elem in elems {
        let result = match elem {
            Elem::Int(n) => primary::append(program, new_handle, Child::Int(n)),
            Elem::Ref(id) => {
                let child_target = program.refs.get(id.raw()).target;
                program
                    .new_root(child_target)
                    .and_then(|twin| primary::append(program, new_handle, Child::List(twin)))
            }
        };
        if let Err(e) = result {
            program.drop_handle(new_handle);
            return Err(e);
        }
    }

    Ok(new_handle)
}

/// Copies the whole list (spec §4.G `copy`). An empty source short-circuits to a fresh `init`
/// carrying its `type`/`tag` rather than calling `copySpan` on an empty range, matching the
/// original's `trotListRefCopy`.
pub(crate) fn copy(program: &mut Program, h: Handle) -> Result<Handle> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    if body.child_count == 0 {
        let (type_, tag) = (body.type_, body.tag);
        return program.init(type_, tag);
    }
    copy_span(program, h, 1, -1)
}

/// Core of `enlist`: validates and moves the span, returning the 1-based position the new sublist
/// now occupies (so [`remove_span`] can reuse it without re-deriving the index).
///
/// The new sublist is inserted into `h` *before* the span is extracted from it, not after: `insert`
/// is the one step here that can fail part-way through (`ListOverflow`/`MemLimit`), so it has to run
/// while the only mutation it could leave behind, on failure, is the as-yet-unattached `new_handle`
/// itself -- cleaned up by dropping it. Every step after that (`extract_subchain`/`splice_in`) is an
/// infallible node-chain move, so once `insert` succeeds the whole operation is guaranteed to finish.
fn enlist_impl(program: &mut Program, h: Handle, start: i64, end: i64) -> Result<i64> {
    let target = program.refs.get(h.id.raw()).target;
    let count = program.lists.get(target.raw()).child_count;
    let (start, end) = normalize_span(start, end, count)?;

    // The new sublist gets default type/tag, not the parent's -- it didn't exist before this
    // call, matching `trotListRefInit`'s defaults in the original's `trotListRefEnlist`.
    let default_type = program.config.type_min;
    let new_handle = program.init(default_type, 0)?;
    let new_target = program.refs.get(new_handle.id.raw()).target;

    if let Err(e) = primary::insert(program, h, start, Child::List(new_handle)) {
        program.drop_handle(new_handle);
        return Err(e);
    }

    // The span being enlisted now sits one position further right, displaced by the (still empty)
    // sublist reference just inserted ahead of it.
    let target = program.refs.get(h.id.raw()).target;
    let new_count = count + 1;
    let (chain, moved) =
        program.lists.get_mut(target.raw()).nodes.extract_subchain(start + 1, end + 1, new_count);
    let moved_bytes = chain_bytes(&chain);

    for id in chain_ref_ids(&chain) {
        program.refs.get_mut(id.raw()).parent = Parent::Inside(new_target);
    }

    {
        let old_body = program.lists.get_mut(target.raw());
        old_body.child_count -= moved;
        old_body.bytes_charged -= moved_bytes;
    }
    {
        let new_body = program.lists.get_mut(new_target.raw());
        new_body.nodes.splice_in(1, 0, chain);
        new_body.child_count = moved;
        new_body.bytes_charged += moved_bytes;
    }

    Ok(start)
}

fn chain_ref_ids(chain: &NodeArena) -> Vec<crate::handle::RefId> {
    chain
        .iter()
        .filter_map(|elem| match elem {
            Elem::Ref(id) => Some(id),
            Elem::Int(_) => None,
        })
        .collect()
}

/// Removes the inclusive span `[start, end]` and replaces it, at the same position, with a
/// single new child list holding exactly those elements in order (spec §4.G `enlist`).
pub(crate) fn enlist(program: &mut Program, h: Handle, start: i64, end: i64) -> Result<()> {
    enlist_impl(program, h, start, end).map(|_| ())
}

/// Removes the inclusive span `[start, end]` entirely (spec §4.G `removeSpan`), implemented as
/// `enlist` followed by dropping the sublist it produced -- the original's own
/// `trotListRefRemoveSpan` does exactly this via `trotListRefEnlist` + `trotListRefRemoveList`.
pub(crate) fn remove_span(program: &mut Program, h: Handle, start: i64, end: i64) -> Result<()> {
    let pos = enlist_impl(program, h, start, end)?;
    let sublist = program.remove_list(h, pos)?;
    program.drop_handle(sublist);
    Ok(())
}

/// Splices the list at `index`'s children inline into `h`'s list at that same position (spec
/// §4.G `delist`). The addressed child must be a list; its own children become `h`'s children
/// directly, and the (now emptied) inner list is reclaimed if nothing else references it.
pub(crate) fn delist(program: &mut Program, h: Handle, index: i64) -> Result<()> {
    let target = program.refs.get(h.id.raw()).target;
    let count = program.lists.get(target.raw()).child_count;
    let index = normalize_index(index, count)?;

    let elem = program.lists.get(target.raw()).nodes.get(index);
    let Elem::Ref(inner_id) = elem else {
        return Err(Error::WrongKind);
    };
    let inner_target = program.refs.get(inner_id.raw()).target;
    let inner_count = program.lists.get(inner_target.raw()).child_count;

    if count - 1 + inner_count > program.config.max_children {
        return Err(Error::ListOverflow);
    }

    let moved = if inner_count > 0 {
        let (chain, moved) =
            program.lists.get_mut(inner_target.raw()).nodes.extract_subchain(1, inner_count, inner_count);
        let moved_bytes = chain_bytes(&chain);
        for id in chain_ref_ids(&chain) {
            program.refs.get_mut(id.raw()).parent = Parent::Inside(target);
        }
        {
            let inner_body = program.lists.get_mut(inner_target.raw());
            inner_body.child_count = 0;
            inner_body.bytes_charged -= moved_bytes;
        }
        Some((chain, moved, moved_bytes))
    } else {
        None
    };

    let inner_handle = program.remove_list(h, index)?;
    program.drop_handle(inner_handle);

    if let Some((chain, moved, moved_bytes)) = moved {
        let new_count = count - 1;
        let body = program.lists.get_mut(target.raw());
        body.nodes.splice_in(index, new_count, chain);
        body.child_count += moved;
        body.bytes_charged += moved_bytes;
    }

    Ok(())
}

/// Total ordering over list values (spec §4.G `compare`): mismatched kinds order `Int` before
/// `List`; same-kind children compare by value or recurse. Identity-equal lists short-circuit to
/// `Equal` in O(1). An explicit stack of `(a, b)` pairs currently being compared -- not a global
/// visited set -- breaks cycles: re-entering a pair already being compared on this path is treated
/// as equal-so-far, matching the original's iterative `trotStack`-based `trotListRefCompare`.
pub(crate) fn compare(program: &Program, a: Handle, b: Handle) -> Ordering {
    struct Frame {
        a: ListId,
        b: ListId,
        index: i64,
    }

    let target_a = program.refs.get(a.id.raw()).target;
    let target_b = program.refs.get(b.id.raw()).target;
    if target_a == target_b {
        return Ordering::Equal;
    }

    let mut stack = alloc::vec![Frame { a: target_a, b: target_b, index: 0 }];
    let mut on_stack: Vec<(ListId, ListId)> = alloc::vec![(target_a, target_b)];

    loop {
        let top = stack.last_mut().expect("stack is never empty mid-loop");
        top.index += 1;
        let (la, lb, index) = (top.a, top.b, top.index);

        let count_a = program.lists.get(la.raw()).child_count;
        let count_b = program.lists.get(lb.raw()).child_count;

        if index > count_a && index > count_b {
            stack.pop();
            on_stack.pop();
            match stack.last_mut() {
                Some(_) => continue,
                None => return Ordering::Equal,
            }
        }
        if index > count_a {
            return Ordering::Less;
        }
        if index > count_b {
            return Ordering::Greater;
        }

        let elem_a = program.lists.get(la.raw()).nodes.get(index);
        let elem_b = program.lists.get(lb.raw()).nodes.get(index);

        match (elem_a, elem_b) {
            (Elem::Int(na), Elem::Int(nb)) => match na.cmp(&nb) {
                Ordering::Equal => continue,
                other => return other,
            },
            (Elem::Int(_), Elem::Ref(_)) => return Ordering::Less,
            (Elem::Ref(_), Elem::Int(_)) => return Ordering::Greater,
            (Elem::Ref(ra), Elem::Ref(rb)) => {
                let sub_a = program.refs.get(ra.raw()).target;
                let sub_b = program.refs.get(rb.raw()).target;
                if sub_a == sub_b || on_stack.contains(&(sub_a, sub_b)) {
                    continue;
                }
                stack.push(Frame { a: sub_a, b: sub_b, index: 0 });
                on_stack.push((sub_a, sub_b));
            }
        }
    }
}

impl Program {
    /// Copies the whole list `h` points at, producing a new root handle (spec §4.G `copy`).
    pub fn copy(&mut self, h: Handle) -> Result<Handle> {
        copy(self, h)
    }

    /// Copies the inclusive span `[start, end]` into a new list (spec §4.G `copySpan`).
    pub fn copy_span(&mut self, h: Handle, start: i64, end: i64) -> Result<Handle> {
        copy_span(self, h, start, end)
    }

    /// Removes the inclusive span `[start, end]` from the list `h` points at (spec §4.G
    /// `removeSpan`).
    pub fn remove_span(&mut self, h: Handle, start: i64, end: i64) -> Result<()> {
        remove_span(self, h, start, end)
    }

    /// Groups the inclusive span `[start, end]` into a single new child list at the same position
    /// (spec §4.G `enlist`).
    pub fn enlist(&mut self, h: Handle, start: i64, end: i64) -> Result<()> {
        enlist(self, h, start, end)
    }

    /// Splices the list child at `index` inline into `h`'s list (spec §4.G `delist`).
    pub fn delist(&mut self, h: Handle, index: i64) -> Result<()> {
        delist(self, h, index)
    }

    /// Total ordering between the lists `a` and `b` point at (spec §4.G `compare`).
    pub fn compare(&self, a: Handle, b: Handle) -> Ordering {
        compare(self, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(program: &mut Program, values: &[i64]) -> Handle {
        let h = program.init(0, 0).unwrap();
        for &v in values {
            program.append_int(h, v).unwrap();
        }
        h
    }

    #[test]
    fn copy_span_is_independent_of_source() {
        let mut program = Program::new();
        let h = build(&mut program, &[1, 2, 3, 4, 5]);
        let span = copy_span(&mut program, h, 2, 4).unwrap();
        assert_eq!(program.get_count(span), 3);
        assert_eq!(program.get_int(span, 1).unwrap(), 2);
        assert_eq!(program.get_int(span, 3).unwrap(), 4);

        program.append_int(h, 6).unwrap();
        assert_eq!(program.get_count(span), 3);
    }

    #[test]
    fn copy_of_empty_list_preserves_type_and_tag() {
        let mut program = Program::new();
        let h = program.init(3, 7).unwrap();
        let copied = copy(&mut program, h).unwrap();
        assert_eq!(program.get_count(copied), 0);
        assert_eq!(program.get_type(copied), 3);
        assert_eq!(program.get_tag(copied), 7);
    }

    #[test]
    fn enlist_then_delist_round_trips() {
        let mut program = Program::new();
        let h = build(&mut program, &[1, 2, 3, 4, 5]);
        program.enlist(h, 2, 4).unwrap();
        assert_eq!(program.get_count(h), 3);
        let sub = program.get_list(h, 2).unwrap();
        assert_eq!(program.get_count(sub), 3);
        assert_eq!(program.get_int(sub, 1).unwrap(), 2);
        program.drop_handle(sub);

        program.delist(h, 2).unwrap();
        assert_eq!(program.get_count(h), 5);
        for (i, expected) in (1..=5).enumerate() {
            assert_eq!(program.get_int(h, i as i64 + 1).unwrap(), expected);
        }
    }

    #[test]
    fn delist_on_int_child_is_wrong_kind() {
        let mut program = Program::new();
        let h = build(&mut program, &[1, 2, 3]);
        assert_eq!(delist(&mut program, h, 1), Err(Error::WrongKind));
    }

    #[test]
    fn enlist_rolls_back_whole_when_attaching_the_new_sublist_hits_the_memory_limit() {
        use crate::program::{LIST_HEADER_BYTES, REF_CHUNK_OVERHEAD_BYTES, REF_ENTRY_BYTES};

        let mut program = Program::new();
        let h = build(&mut program, &[1, 2, 3, 4, 5]);
        let used = program.mem_get_used();

        // Enough headroom for `enlist`'s internal `init` (the new sublist's own header, root
        // entry, and first back-pointer chunk) and nothing left for attaching it to `h`.
        let headroom = (LIST_HEADER_BYTES + REF_ENTRY_BYTES + REF_CHUNK_OVERHEAD_BYTES) as i64;
        program.mem_set_limit(used + headroom).unwrap();

        assert_eq!(enlist(&mut program, h, 2, 4), Err(Error::MemLimit));
        assert_eq!(program.mem_get_used(), used, "the new sublist must be rolled back, not leaked");
        assert_eq!(program.get_count(h), 5);
        for (i, expected) in (1..=5).enumerate() {
            assert_eq!(program.get_int(h, i as i64 + 1).unwrap(), expected);
        }
    }

    #[test]
    fn compare_orders_by_value_then_length_then_kind() {
        let mut program = Program::new();
        let a = build(&mut program, &[1, 2, 3]);
        let b = build(&mut program, &[1, 2, 4]);
        assert_eq!(program.compare(a, b), Ordering::Less);

        let c = build(&mut program, &[1, 2]);
        assert_eq!(program.compare(c, a), Ordering::Less);

        let d = program.init(0, 0).unwrap();
        let e = build(&mut program, &[1]);
        program.append_list(d, e).unwrap();
        let f = build(&mut program, &[1, 1]);
        assert_eq!(program.compare(d, f), Ordering::Less);
    }

    #[test]
    fn compare_is_reflexive_on_self_referencing_lists() {
        let mut program = Program::new();
        let a = program.init(0, 0).unwrap();
        let a_twin = program.twin(a).unwrap();
        primary::append(&mut program, a, Child::List(a_twin)).unwrap();
        assert_eq!(program.compare(a, a), Ordering::Equal);
    }

    #[test]
    fn remove_span_deletes_the_whole_range() {
        let mut program = Program::new();
        let h = build(&mut program, &[1, 2, 3, 4, 5]);
        program.remove_span(h, 2, 4).unwrap();
        assert_eq!(program.get_count(h), 2);
        assert_eq!(program.get_int(h, 1).unwrap(), 1);
        assert_eq!(program.get_int(h, 2).unwrap(), 5);
    }
}
