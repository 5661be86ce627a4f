//! The integer operator (spec component H): consumes the last one or two `Int` children of a list
//! and pushes the result, or leaves the list completely untouched on any failure.
//!
//! Grounded on `original_source/trot/src/trotLib/trotListInt.c`'s `trotListIntOperand`/
//! `trotListIntOperandValue` pair: check the trailing int(s) are actually ints, do the arithmetic,
//! then commit. `LT`/`GT`/`EQ` aren't in that revision of the original (an earlier one than the
//! `spec.md` opcode list was drawn from) but follow the same shape trivially.
//!
//! Arithmetic wraps (`wrapping_add`/`wrapping_neg`/...) rather than panicking, matching the
//! original's plain C operators on a fixed-width int: overflow on valid `Int` children is host
//! default behavior, not a reportable error kind.

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::node::{Elem, NodeKind};
use crate::ops::primary;
use crate::program::Program;

/// One of the opcodes the integer operator accepts (spec §4.H).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    And,
    Or,
    Not,
    Lt,
    Gt,
    Eq,
}

impl IntOp {
    fn is_unary(self) -> bool {
        matches!(self, IntOp::Neg | IntOp::Not)
    }
}

fn as_bool(n: i64) -> bool {
    n != 0
}

fn from_bool(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

fn apply_unary(op: IntOp, value: i64) -> i64 {
    match op {
        IntOp::Neg => value.wrapping_neg(),
        IntOp::Not => from_bool(!as_bool(value)),
        _ => unreachable!("apply_unary called with a binary opcode"),
    }
}

fn apply_binary(op: IntOp, lhs: i64, rhs: i64) -> Result<i64> {
    Ok(match op {
        IntOp::Add => lhs.wrapping_add(rhs),
        IntOp::Sub => lhs.wrapping_sub(rhs),
        IntOp::Mul => lhs.wrapping_mul(rhs),
        IntOp::Div => {
            if rhs == 0 {
                return Err(Error::DivideByZero);
            }
            lhs.wrapping_div(rhs)
        }
        IntOp::Mod => {
            if rhs == 0 {
                return Err(Error::DivideByZero);
            }
            lhs.wrapping_rem(rhs)
        }
        IntOp::And => from_bool(as_bool(lhs) && as_bool(rhs)),
        IntOp::Or => from_bool(as_bool(lhs) || as_bool(rhs)),
        IntOp::Lt => from_bool(lhs < rhs),
        IntOp::Gt => from_bool(lhs > rhs),
        IntOp::Eq => from_bool(lhs == rhs),
        IntOp::Neg | IntOp::Not => unreachable!("apply_binary called with a unary opcode"),
    })
}

/// Runs `op` on the trailing one or two `Int` children of the list `h` points at, replacing them
/// with the single result (spec §4.H). Unary opcodes (`Neg`, `Not`) need only the last child to
/// be an int; binary opcodes need the last two. Every failure mode -- wrong kind, divide by zero
/// -- is checked before any child is removed, so a failing call leaves the list exactly as it was.
pub(crate) fn apply(program: &mut Program, h: Handle, op: IntOp) -> Result<()> {
    let count = primary::get_count(program, h);

    if op.is_unary() {
        if count < 1 {
            return Err(Error::BadIndex);
        }
        let last = peek_int(program, h, count)?;
        let result = apply_unary(op, last);
        program.remove_int(h, count)?;
        program.append_int(h, result)
    } else {
        if count < 2 {
            return Err(Error::BadIndex);
        }
        let lhs = peek_int(program, h, count - 1)?;
        let rhs = peek_int(program, h, count)?;
        let result = apply_binary(op, lhs, rhs)?;
        program.remove_int(h, count)?;
        program.remove_int(h, count - 1)?;
        program.append_int(h, result)
    }
}

/// Reads an `Int` at 1-based `index` without mutating, failing `wrong-kind` (not `bad-index`) on
/// a list-kind child since the index itself is always in range here.
fn peek_int(program: &Program, h: Handle, index: i64) -> Result<i64> {
    let target = program.refs.get(h.id.raw()).target;
    let body = program.lists.get(target.raw());
    match body.nodes.get(index).kind() {
        NodeKind::Int => match body.nodes.get(index) {
            Elem::Int(n) => Ok(n),
            Elem::Ref(_) => unreachable!(),
        },
        NodeKind::Ref => Err(Error::WrongKind),
    }
}

impl Program {
    /// Runs the integer operator `op` against the trailing int(s) of the list `h` points at (spec
    /// §4.H). See [`IntOp`] for the opcode set and their arities.
    pub fn int_operate(&mut self, h: Handle, op: IntOp) -> Result<()> {
        apply(self, h, op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(program: &mut Program, values: &[i64]) -> Handle {
        let h = program.init(0, 0).unwrap();
        for &v in values {
            program.append_int(h, v).unwrap();
        }
        h
    }

    #[test]
    fn add_replaces_trailing_pair() {
        let mut program = Program::new();
        let h = list_of(&mut program, &[3, -5]);
        program.int_operate(h, IntOp::Add).unwrap();
        assert_eq!(program.get_count(h), 1);
        assert_eq!(program.get_int(h, 1).unwrap(), -2);
    }

    #[test]
    fn divide_by_zero_leaves_list_untouched() {
        let mut program = Program::new();
        let h = list_of(&mut program, &[5, 0]);
        assert_eq!(program.int_operate(h, IntOp::Div), Err(Error::DivideByZero));
        assert_eq!(program.get_count(h), 2);
        assert_eq!(program.get_int(h, 1).unwrap(), 5);
        assert_eq!(program.get_int(h, 2).unwrap(), 0);
    }

    #[test]
    fn neg_is_unary() {
        let mut program = Program::new();
        let h = list_of(&mut program, &[1, 2, 7]);
        program.int_operate(h, IntOp::Neg).unwrap();
        assert_eq!(program.get_count(h), 3);
        assert_eq!(program.get_int(h, 3).unwrap(), -7);
    }

    #[test]
    fn wrong_kind_on_list_child_is_rejected_without_mutation() {
        let mut program = Program::new();
        let h = program.init(0, 0).unwrap();
        let inner = program.init(0, 0).unwrap();
        program.append_list(h, inner).unwrap();
        assert_eq!(program.int_operate(h, IntOp::Neg), Err(Error::WrongKind));
        assert_eq!(program.get_count(h), 1);
    }

    #[test]
    fn comparisons_produce_booleans() {
        let mut program = Program::new();
        let h = list_of(&mut program, &[3, 5]);
        program.int_operate(h, IntOp::Lt).unwrap();
        assert_eq!(program.get_int(h, 1).unwrap(), 1);
    }
}
