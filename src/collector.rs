//! The reachability collector (spec component E): a non-recursive, on-demand walk that runs every
//! time a reference is dropped, deciding whether the list it pointed at — and anything only
//! reachable through it — has become garbage.
//!
//! Lists never get reference-counted directly. Dropping the last *root* handle to a two-list cycle
//! still leaves each list's back-pointer set non-empty (each points at the other), so a naive
//! refcount would never reach zero. Instead, every time a handle is dropped we walk backward from
//! the list it pointed at, through back-pointers, toward whichever lists hold the corresponding
//! forward references. If that walk ever reaches a root, the list is reachable and nothing happens.
//! If the walk exhausts its frontier without finding one, every list it visited is unreachable from
//! any root and the whole group is reclaimed together, breaking the cycle.

use alloc::vec::Vec;

use crate::handle::{Parent, RefId};
use crate::list::ListId;
use crate::node::Elem;
use crate::program::{Program, LIST_HEADER_BYTES, REF_CHUNK_OVERHEAD_BYTES, REF_ENTRY_BYTES};

/// Runs the reachability walk starting from `start`, reclaiming it (and anything only reachable
/// through it) if nothing roots it. Called after a back-pointer to `start` has just been removed.
pub(crate) fn collect_from(program: &mut Program, start: ListId) {
    program.walk_generation = program.walk_generation.wrapping_add(1);
    let generation = program.walk_generation;

    let mut frontier = alloc::vec![start];
    let mut visited = alloc::vec![start];
    program.lists.get_mut(start.raw()).visit_mark = generation;

    let mut rooted = false;
    while let Some(cur) = frontier.pop() {
        let back_pointers: Vec<RefId> = program.lists.get(cur.raw()).back_pointers.iter().collect();
        for id in back_pointers {
            match program.refs.get(id.raw()).parent {
                Parent::Root => {
                    rooted = true;
                    break;
                }
                Parent::Inside(parent) => {
                    if program.lists.get(parent.raw()).visit_mark != generation {
                        program.lists.get_mut(parent.raw()).visit_mark = generation;
                        visited.push(parent);
                        frontier.push(parent);
                    }
                }
            }
        }
        if rooted {
            break;
        }
    }

    log::trace!("reachability walk from {:?}: {} lists visited, rooted={}", start, visited.len(), rooted);

    if rooted {
        return;
    }

    reclaim(program, visited);
}

/// Tears down a closed group of mutually-unreachable lists, then follows any reference one of them
/// held into a list outside the group and re-checks reachability there too.
fn reclaim(program: &mut Program, visited: Vec<ListId>) {
    let mut bytes_freed = 0usize;
    let mut outgoing: Vec<(ListId, RefId)> = Vec::new();
    for &list_id in &visited {
        for elem in program.lists.get(list_id.raw()).nodes.iter() {
            if let Elem::Ref(id) = elem {
                let target = program.refs.get(id.raw()).target;
                if !visited.contains(&target) {
                    outgoing.push((list_id, id));
                }
            }
        }
    }

    for &list_id in &visited {
        let back_pointers: Vec<RefId> = program.lists.get(list_id.raw()).back_pointers.iter().collect();
        for id in back_pointers {
            program.refs.remove(id.raw());
            program.release(REF_ENTRY_BYTES);
        }
        let body = program.lists.remove(list_id.raw());
        bytes_freed += body.bytes_charged + LIST_HEADER_BYTES;
        program.release(body.bytes_charged);
        program.release(LIST_HEADER_BYTES);
    }

    log::debug!("reclaimed {} lists, {} bytes", visited.len(), bytes_freed);

    for (_, id) in outgoing {
        let target = program.refs.remove(id.raw()).target;
        program.release(REF_ENTRY_BYTES);
        let chunk_freed = program.lists.get_mut(target.raw()).back_pointers.remove(id);
        if chunk_freed {
            program.release(REF_CHUNK_OVERHEAD_BYTES);
        }
        collect_from(program, target);
    }
}

#[cfg(test)]
mod tests {
    use crate::program::Program;

    #[test]
    fn dropping_only_root_frees_single_list() {
        let mut program = Program::new();
        let h = program.init(0, 0).unwrap();
        let before = program.mem_get_used();
        assert!(before > 0);
        program.drop_handle(h);
        assert_eq!(program.mem_get_used(), 0);
    }

    #[test]
    fn self_reference_is_collected_on_drop() {
        use crate::ops::{primary, Child};
        let mut program = Program::new();
        let a = program.init(0, 0).unwrap();
        let a2 = program.twin(a).unwrap();
        primary::append(&mut program, a, Child::List(a2)).unwrap();
        program.drop_handle(a);
        assert_eq!(program.mem_get_used(), 0);
    }

    #[test]
    fn two_cycle_is_collected_when_both_roots_drop() {
        use crate::ops::{primary, Child};
        let mut program = Program::new();
        let a = program.init(0, 0).unwrap();
        let b = program.init(0, 0).unwrap();
        let a_twin = program.twin(a).unwrap();
        let b_twin = program.twin(b).unwrap();
        primary::append(&mut program, a, Child::List(b_twin)).unwrap();
        primary::append(&mut program, b, Child::List(a_twin)).unwrap();
        program.drop_handle(a);
        assert!(program.mem_get_used() > 0);
        program.drop_handle(b);
        assert_eq!(program.mem_get_used(), 0);
    }
}
