//! Textual encode/decode (spec §6): `encode(list) -> byte_list`, `decode(byte_list) -> list`.
//!
//! `spec.md §9` (Open Question a) explicitly leaves the grammar unspecified, binding only the
//! round-trip law (P5) and the fixed-point law ("canonical after one decode/encode"). This module
//! picks a simple recursive-descent grammar: a whitespace-separated token stream where a list is
//! `D <label> <type> <tag> <count> <child>*`, a child is an integer literal, a nested `D ...` block
//! (first time a list is visited), or `U <label>` (a back-reference to an already-`D`-declared
//! list). Labels are assigned in DFS visitation order, so decoding never needs to resolve a `U`
//! before seeing its `D` -- self-reference and cycles fall out for free, since a list's own label
//! is declared before any of its children (including itself) are serialized.
//!
//! Canonicalization is automatic: the label a list gets only depends on DFS visitation order over
//! its own (now-decoded) structure, so `encode(decode(b))` always reassigns labels the same way
//! regardless of what labels `b` happened to use, giving the required fixed point after one round
//! trip.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::handle::{Handle, Kind};
use crate::list::ListId;
use crate::node::Elem;
use crate::ops::{primary, Child};
use crate::program::Program;

fn push_token(out: &mut Vec<u8>, token: &str) {
    if !out.is_empty() {
        out.push(b' ');
    }
    out.extend_from_slice(token.as_bytes());
}

fn push_int(out: &mut Vec<u8>, n: i64) {
    push_token(out, &alloc::format!("{n}"));
}

struct Encoder<'p> {
    program: &'p Program,
    labels: BTreeMap<u32, i64>,
    next_label: i64,
    out: Vec<u8>,
}

impl<'p> Encoder<'p> {
    fn encode_list(&mut self, target: ListId) {
        if let Some(&label) = self.labels.get(&target.raw()) {
            push_token(&mut self.out, "U");
            push_int(&mut self.out, label);
            return;
        }

        let label = self.next_label;
        self.next_label += 1;
        self.labels.insert(target.raw(), label);

        let body = self.program.lists.get(target.raw());
        push_token(&mut self.out, "D");
        push_int(&mut self.out, label);
        push_int(&mut self.out, body.type_);
        push_int(&mut self.out, body.tag);
        push_int(&mut self.out, body.child_count);
        let elems: Vec<Elem> = body.nodes.iter().collect();

        for elem in elems {
            match elem {
                Elem::Int(n) => push_int(&mut self.out, n),
                Elem::Ref(id) => {
                    let child_target = self.program.refs.get(id.raw()).target;
                    self.encode_list(child_target);
                }
            }
        }
    }
}

/// Serializes the whole list graph reachable from `h` into a fresh byte list (spec §6 `encode`).
pub(crate) fn encode(program: &mut Program, h: Handle) -> Result<Handle> {
    let target = program.refs.get(h.id.raw()).target;
    let mut encoder = Encoder { program, labels: BTreeMap::new(), next_label: 1, out: Vec::new() };
    encoder.encode_list(target);
    let bytes = encoder.out;

    let out_handle = program.init(0, 0)?;
    for b in bytes {
        if let Err(e) = program.append_int(out_handle, b as i64) {
            program.drop_handle(out_handle);
            return Err(e);
        }
    }
    Ok(out_handle)
}

type Tokens<'a> = core::iter::Peekable<core::str::SplitWhitespace<'a>>;

fn read_int(tokens: &mut Tokens) -> Result<i64> {
    tokens.next().ok_or(Error::Decode)?.parse::<i64>().map_err(|_| Error::Decode)
}

fn decode_child(tokens: &mut Tokens, program: &mut Program, labels: &mut BTreeMap<i64, ListId>) -> Result<Child> {
    match tokens.peek().copied() {
        Some("D") => decode_list(tokens, program, labels).map(Child::List),
        Some("U") => {
            tokens.next();
            let label = read_int(tokens)?;
            let target = *labels.get(&label).ok_or(Error::Decode)?;
            Ok(Child::List(program.new_root(target)?))
        }
        Some(_) => Ok(Child::Int(read_int(tokens)?)),
        None => Err(Error::Decode),
    }
}

fn decode_list(tokens: &mut Tokens, program: &mut Program, labels: &mut BTreeMap<i64, ListId>) -> Result<Handle> {
    if tokens.next() != Some("D") {
        return Err(Error::Decode);
    }
    let label = read_int(tokens)?;
    let type_ = read_int(tokens)?;
    let tag = read_int(tokens)?;
    let count = read_int(tokens)?;
    if count < 0 || labels.contains_key(&label) {
        return Err(Error::Decode);
    }

    // The label is registered *before* any child is decoded, so a `U <label>` referencing this
    // list from inside its own children (self-reference) or from a list being built further down
    // the stack (a cycle) resolves correctly.
    let handle = program.init(type_, tag)?;
    labels.insert(label, program.refs.get(handle.id.raw()).target);

    for _ in 0..count {
        let child = match decode_child(tokens, program, labels) {
            Ok(c) => c,
            Err(e) => {
                program.drop_handle(handle);
                return Err(e);
            }
        };
        if let Err(e) = primary::append(program, handle, child) {
            program.drop_handle(handle);
            return Err(e);
        }
    }

    Ok(handle)
}

/// Parses a byte list produced by [`encode`] (or any list conforming to this module's grammar)
/// back into a list graph (spec §6 `decode`). Rejects with `decode` on any grammar violation: an
/// unparsable token, an out-of-range `type`, a `U` referencing an undeclared label, a child-count
/// mismatch, or trailing data after the root list closes.
pub(crate) fn decode(program: &mut Program, bytes: Handle) -> Result<Handle> {
    let count = program.get_count(bytes);
    let mut raw = Vec::with_capacity(count.max(0) as usize);
    for i in 1..=count {
        if program.get_kind(bytes, i)? != Kind::Int {
            return Err(Error::Decode);
        }
        let b = program.get_int(bytes, i)?;
        if !(0..=255).contains(&b) {
            return Err(Error::Decode);
        }
        raw.push(b as u8);
    }

    let text = core::str::from_utf8(&raw).map_err(|_| Error::Decode)?;
    let mut tokens = text.split_whitespace().peekable();
    let mut labels = BTreeMap::new();

    let root = decode_list(&mut tokens, program, &mut labels)?;
    if tokens.next().is_some() {
        program.drop_handle(root);
        return Err(Error::Decode);
    }
    Ok(root)
}

impl Program {
    /// Serializes the list graph reachable from `h` into a fresh byte list (spec §6 `encode`).
    pub fn encode(&mut self, h: Handle) -> Result<Handle> {
        encode(self, h)
    }

    /// Parses a byte list produced by [`Program::encode`] back into a list graph (spec §6
    /// `decode`).
    pub fn decode(&mut self, bytes: Handle) -> Result<Handle> {
        decode(self, bytes)
    }
}
