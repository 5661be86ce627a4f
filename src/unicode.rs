//! UTF-8 conversion between lists of code points and lists of bytes (spec §6), plus the documented
//! whitespace predicate.
//!
//! Both directions operate entirely on lists of `Int`s -- there's no byte or `char` type in this
//! engine's data model. Validation is delegated to `core`'s own UTF-8 and `char` machinery
//! (`core::str::from_utf8`, `char::from_u32`), which already rejects exactly the cases `spec.md §6`
//! calls out by name (surrogate halves, overlong forms, out-of-range code points, truncated or
//! misaligned continuation bytes) -- reimplementing that validation by hand would just be a worse
//! copy of what `core` already guarantees.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::handle::{Handle, Kind};
use crate::program::Program;

/// Converts a list of bytes (`Int`s in `0..=255`) into a list of Unicode code points (spec §6
/// `utf8_to_chars`). Rejects with `unicode` on any malformed sequence and `wrong-kind` if any
/// element isn't an `Int`.
pub(crate) fn utf8_to_chars(program: &mut Program, h: Handle) -> Result<Handle> {
    let count = program.get_count(h);
    let mut bytes = Vec::with_capacity(count.max(0) as usize);
    for i in 1..=count {
        if program.get_kind(h, i)? != Kind::Int {
            return Err(Error::WrongKind);
        }
        let b = program.get_int(h, i)?;
        if !(0..=255).contains(&b) {
            return Err(Error::Unicode);
        }
        bytes.push(b as u8);
    }

    let text = core::str::from_utf8(&bytes).map_err(|_| Error::Unicode)?;

    let out = program.init(0, 0)?;
    for c in text.chars() {
        if let Err(e) = program.append_int(out, c as i64) {
            program.drop_handle(out);
            return Err(e);
        }
    }
    Ok(out)
}

/// Converts a list of Unicode code points into a list of UTF-8 bytes (spec §6 `chars_to_utf8`).
/// Rejects with `unicode` on a surrogate half or a value outside `0..=0x10FFFF`, and `wrong-kind`
/// if any element isn't an `Int`.
pub(crate) fn chars_to_utf8(program: &mut Program, h: Handle) -> Result<Handle> {
    let count = program.get_count(h);
    let out = program.init(0, 0)?;
    let mut buf = [0u8; 4];

    for i in 1..=count {
        if program.get_kind(h, i)? != Kind::Int {
            program.drop_handle(out);
            return Err(Error::WrongKind);
        }
        let cp = program.get_int(h, i)?;
        let c = u32::try_from(cp).ok().and_then(char::from_u32);
        let c = match c {
            Some(c) => c,
            None => {
                program.drop_handle(out);
                return Err(Error::Unicode);
            }
        };
        for b in c.encode_utf8(&mut buf).bytes() {
            if let Err(e) = program.append_int(out, b as i64) {
                program.drop_handle(out);
                return Err(e);
            }
        }
    }
    Ok(out)
}

/// Whether `code_point` is in the documented whitespace set (spec §6). Every other code point,
/// valid or not, is non-whitespace.
pub fn is_whitespace(code_point: i64) -> bool {
    matches!(
        code_point,
        0x0009
            | 0x000A
            | 0x000B
            | 0x000C
            | 0x000D
            | 0x0020
            | 0x0085
            | 0x00A0
            | 0x1680
            | 0x180E
            | 0x2000..=0x200A
            | 0x2028
            | 0x2029
            | 0x202F
            | 0x205F
            | 0x3000
    )
}

impl Program {
    /// Converts a list of bytes into a list of Unicode code points (spec §6 `utf8_to_chars`).
    pub fn utf8_to_chars(&mut self, h: Handle) -> Result<Handle> {
        utf8_to_chars(self, h)
    }

    /// Converts a list of Unicode code points into a list of UTF-8 bytes (spec §6 `chars_to_utf8`).
    pub fn chars_to_utf8(&mut self, h: Handle) -> Result<Handle> {
        chars_to_utf8(self, h)
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
    fn round_trips_ascii_and_multibyte() {
        let mut program = Program::new();
        let chars = list_of(&mut program, &['h' as i64, 'i' as i64, 0x1F600, 0x00E9]);
        let bytes = program.chars_to_utf8(chars).unwrap();
        let back = program.utf8_to_chars(bytes).unwrap();
        assert_eq!(program.get_count(back), 4);
        assert_eq!(program.get_int(back, 1).unwrap(), 'h' as i64);
        assert_eq!(program.get_int(back, 3).unwrap(), 0x1F600);
    }

    #[test]
    fn surrogate_code_point_is_rejected() {
        let mut program = Program::new();
        let chars = list_of(&mut program, &[0xD800]);
        assert_eq!(program.chars_to_utf8(chars), Err(Error::Unicode));
    }

    #[test]
    fn overlong_encoding_is_rejected() {
        let mut program = Program::new();
        // 0xC0 0x80 is an overlong two-byte encoding of NUL.
        let bytes = list_of(&mut program, &[0xC0, 0x80]);
        assert_eq!(program.utf8_to_chars(bytes), Err(Error::Unicode));
    }

    #[test]
    fn truncated_continuation_is_rejected() {
        let mut program = Program::new();
        let bytes = list_of(&mut program, &[0xE2, 0x82]);
        assert_eq!(program.utf8_to_chars(bytes), Err(Error::Unicode));
    }

    #[test]
    fn whitespace_predicate_matches_documented_set() {
        assert!(is_whitespace(0x0020));
        assert!(is_whitespace(0x3000));
        assert!(is_whitespace(0x2005));
        assert!(!is_whitespace('a' as i64));
        assert!(!is_whitespace(0x2030));
    }
}
