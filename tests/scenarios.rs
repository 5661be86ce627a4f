//! End-to-end scenarios exercising the public API across whole operation sequences, rather than
//! one operation at a time.

use trot::{Error, IntOp, Program};

#[test]
fn empty_list_round_trips_through_text() {
    let mut program = Program::new();
    let h = program.init(0, 0).unwrap();
    let bytes = program.encode(h).unwrap();
    let back = program.decode(bytes).unwrap();
    assert_eq!(program.get_count(back), 0);
    assert_eq!(program.compare(h, back), core::cmp::Ordering::Equal);
}

#[test]
fn integer_vector_supports_index_duality_end_to_end() {
    let mut program = Program::new();
    let h = program.init(0, 0).unwrap();
    for i in 1..=200i64 {
        program.append_int(h, i).unwrap();
    }
    assert_eq!(program.get_count(h), 200);

    // Negative indices count from the end: -1 is the last element.
    assert_eq!(program.get_int(h, -1).unwrap(), 200);
    assert_eq!(program.get_int(h, -200).unwrap(), 1);
    assert_eq!(program.get_int(h, 1).unwrap(), program.get_int(h, -200).unwrap());

    // Remove the last element via a negative index, then the new last via a positive one.
    let removed = program.remove_int(h, -1).unwrap();
    assert_eq!(removed, 200);
    assert_eq!(program.get_count(h), 199);
    let removed = program.remove_int(h, 199).unwrap();
    assert_eq!(removed, 199);
    assert_eq!(program.get_count(h), 198);

    assert_eq!(program.get_int(h, -1).unwrap(), 198);
}

#[test]
fn self_referencing_list_is_collected_when_its_only_root_drops() {
    let mut program = Program::new();
    let h = program.init(0, 0).unwrap();
    let twin = program.twin(h).unwrap();
    program.append_list(h, twin).unwrap();

    assert_eq!(program.get_count(h), 1);
    let used_before = program.mem_get_used();
    program.drop_handle(h);
    assert!(program.mem_get_used() < used_before);
}

#[test]
fn two_list_cycle_is_collected_only_after_both_roots_drop() {
    let mut program = Program::new();
    let a = program.init(0, 0).unwrap();
    let b = program.init(0, 0).unwrap();
    let b_twin = program.twin(b).unwrap();
    let a_twin = program.twin(a).unwrap();
    program.append_list(a, b_twin).unwrap();
    program.append_list(b, a_twin).unwrap();

    program.drop_handle(a);
    // b is still rooted, so the a<->b cycle should still be reachable through it.
    let still_reachable = program.get_list(b, 1);
    assert!(still_reachable.is_ok());
    program.drop_handle(still_reachable.unwrap());

    let used_before = program.mem_get_used();
    program.drop_handle(b);
    assert!(program.mem_get_used() < used_before);
}

#[test]
fn enlist_then_delist_is_a_no_op_on_structure() {
    let mut program = Program::new();
    let h = program.init(0, 0).unwrap();
    for i in 1..=5i64 {
        program.append_int(h, i).unwrap();
    }
    let before = program.copy(h).unwrap();

    program.enlist(h, 2, 4).unwrap();
    assert_eq!(program.get_count(h), 3);
    let sub = program.get_list(h, 2).unwrap();
    assert_eq!(program.get_count(sub), 3);
    program.drop_handle(sub);

    program.delist(h, 2).unwrap();
    assert_eq!(program.get_count(h), 5);
    assert_eq!(program.compare(h, before), core::cmp::Ordering::Equal);
    program.drop_handle(before);
}

#[test]
fn integer_operator_add_and_divide_by_zero() {
    let mut program = Program::new();
    let h = program.init(0, 0).unwrap();
    program.append_int(h, 7).unwrap();
    program.append_int(h, 35).unwrap();
    program.int_operate(h, IntOp::Add).unwrap();
    assert_eq!(program.get_count(h), 1);
    assert_eq!(program.get_int(h, 1).unwrap(), 42);

    program.append_int(h, 0).unwrap();
    let err = program.int_operate(h, IntOp::Div).unwrap_err();
    assert_eq!(err, Error::DivideByZero);
    // Failure leaves the list untouched: still [42, 0].
    assert_eq!(program.get_count(h), 2);
    assert_eq!(program.get_int(h, 1).unwrap(), 42);
    assert_eq!(program.get_int(h, 2).unwrap(), 0);
}
