//! The error taxonomy operations in this crate return.
//!
//! Every kind here is part of the public interface: callers are expected to switch on it, not just
//! propagate it with `?`. None of these are recoverable internally — an operation either completes
//! or reports one of these kinds, and it never leaves a half-mutated list behind when it does.

use core::fmt;

/// Why an operation failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A documented parameter contract (aliasing, an out-of-range enum value, ...) was violated.
    /// State is unchanged.
    Precondition,
    /// An index was outside the range this operation allows.
    BadIndex,
    /// A type value fell outside `[TYPE_MIN, TYPE_MAX]`.
    BadType,
    /// The child at the addressed index was the other kind (an `Int` where a list was required, or
    /// vice versa).
    WrongKind,
    /// The operation would have pushed a list's child count above `MAX_CHILDREN`.
    ListOverflow,
    /// An integer operator divided or modulo'd by zero.
    DivideByZero,
    /// An integer opcode outside the enumerated set was requested.
    InvalidOp,
    /// The allocation would exceed the [`Program`](crate::Program)'s configured memory limit.
    MemLimit,
    /// The underlying allocator refused to provide memory.
    AllocFail,
    /// UTF-8 or code point validation failed.
    Unicode,
    /// The text decoder rejected its input.
    Decode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Precondition => "precondition violated",
            Error::BadIndex => "index out of range",
            Error::BadType => "type out of range",
            Error::WrongKind => "child is the wrong kind",
            Error::ListOverflow => "list would exceed MAX_CHILDREN",
            Error::DivideByZero => "integer operator divided by zero",
            Error::InvalidOp => "unknown integer opcode",
            Error::MemLimit => "allocation would exceed the memory limit",
            Error::AllocFail => "allocator refused the request",
            Error::Unicode => "invalid UTF-8 or code point",
            Error::Decode => "malformed encoded list",
        };
        f.write_str(msg)
    }
}

/// Shorthand for `Result<T, Error>`, the return type of every fallible operation in this crate.
pub type Result<T> = core::result::Result<T, Error>;
