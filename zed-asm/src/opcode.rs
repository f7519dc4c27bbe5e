use std::fmt;

use crate::encode::DecodeError;

/// A single bytecode opcode.
///
/// Each event program is a flat byte string; every instruction begins with
/// one of these, optionally followed by fixed or variable-width operands (see
/// the per-opcode documentation below and [`crate::BytecodeWriter`]).
///
/// Binary operators push their operands *left then right*; `call` and
/// `builtin` push arguments in reverse order (last arg first) so the
/// interpreter can pop them off in natural left-to-right order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Op {
    /// Discard the top of the value stack.
    Pop = 0x00,
    /// Push `true`. Operands: `off(2)`.
    BoolTrue = 0x01,
    /// Push `false`. Operands: `off(2)`.
    BoolFalse = 0x02,
    /// Push `nil`. Operands: `off(2)`.
    Nil = 0x03,
    /// Push a 64-bit float. Operands: 8 raw bytes.
    Float = 0x04,
    /// Push a 64-bit signed int. Operands: 8 raw bytes.
    Int = 0x05,
    /// Push a 64-bit unsigned int. Operands: 8 raw bytes.
    Uint = 0x06,
    /// Push a literal string segment. Operands: bytes, nul-terminated.
    Plain = 0x07,
    /// Push a format spec applying to the preceding interpolation result.
    /// Operands: `off(2)`, bytes, nul-terminated.
    Format = 0x08,
    /// Pop `len` segments and concatenate into one string.
    /// Operands: `len(2)`.
    String = 0x09,
    /// Enter a lexical scope. Operands: scope-type(1), see [`crate::ScopeType`].
    ScopeIn = 0x0a,
    /// Exit a lexical scope. Operands: scope-type(1).
    ScopeOut = 0x0b,
    /// Call a built-in by id.
    /// Operands: `builtin_id(1) off(2) argc(1)`.
    Builtin = 0x0c,
    /// Call the value beneath `argc` arguments on the stack.
    /// Operands: `off(2) argc(1)`.
    Call = 0x0d,
    /// Define a function literal.
    ///
    /// Operands: `skip(2) hash(8) name\0 paramc(2) (paramN\0)* bodylen(2) body`.
    /// `skip` is the byte count of everything from just after itself through
    /// the end of `body`, so a cached closure can fast-forward past it.
    Func = 0x0e,
    /// Return from the current function call.
    FuncReturn = 0x0f,
    /// Bind a new local. Operands: `off(2) name\0`.
    Define = 0x10,
    /// Load a local by name. Operands: `off(2) name\0`.
    Load = 0x11,
    /// Store into an existing local. Operands: `off(2) combo(1) name\0`.
    Store = 0x12,
    /// Indexed-container assignment; expects `idx, container, rvalue` on the
    /// stack. Operands: `off(2) combo(1)`.
    Set = 0x13,
    /// Read a predefined global. Operands: `global_id(1)`.
    Global = 0x14,
    /// Write a predefined global. Operands: `off(2) global_id(1)`.
    Gstore = 0x15,
    /// `left + right`. Operands: `off(2)`.
    Add = 0x16,
    /// `left - right`. Operands: `off(2)`.
    Sub = 0x17,
    /// `left * right`. Operands: `off(2)`.
    Mul = 0x18,
    /// `left / right`. Operands: `off(2)`.
    Div = 0x19,
    /// `left % right`. Operands: `off(2)`.
    Mod = 0x1a,
    /// `left < right`. Operands: `off(2)`.
    Lt = 0x1b,
    /// `left <= right`. Operands: `off(2)`.
    Lte = 0x1c,
    /// `left > right`. Operands: `off(2)`.
    Gt = 0x1d,
    /// `left >= right`. Operands: `off(2)`.
    Gte = 0x1e,
    /// `left == right`. Operands: `off(2)`.
    Eq = 0x1f,
    /// `left != right`. Operands: `off(2)`.
    Neq = 0x20,
    /// String concatenation. Operands: `off(2)`.
    Concat = 0x21,
    /// String/list repetition. Operands: `off(2)`.
    Repeat = 0x22,
    /// Unary negation. Operands: `off(2)`.
    Neg = 0x23,
    /// Logical not. Operands: `off(2)`.
    Not = 0x24,
    /// Build a list from the top `len` stack slots. Operands: `len(2)`.
    List = 0x25,
    /// Build a map from the top `2*len` stack slots. Operands: `off(2) len(2)`.
    Map = 0x26,
    /// Build a range from `from, to`. Operands: `off(2) inclusive(1)`.
    Range = 0x27,
    /// Index into a container; expects `idx, container`. Operands: `off(2)`.
    Subscript = 0x28,
    /// Unconditional jump. Operands: `target(2)`, absolute within the event.
    Jump = 0x29,
    /// Jump if top-of-stack is truthy. Operands: `target(2)`.
    JumpTrue = 0x2a,
    /// Jump if top-of-stack is falsy. Operands: `target(2)`.
    JumpFalse = 0x2b,
    /// A record-range rule guard.
    ///
    /// Operands: `id(1) exclusive(1) actionlen(2) action-bytes has_from(1)
    /// has_to(1)`, optionally followed by the `to` and `from` expressions
    /// compiled inline before this opcode (see the compiler).
    RecRange = 0x2c,
    /// Redirect the preceding value to a file target.
    /// Operands: `off(2) clobber(1)`.
    Redir = 0x2d,
    /// Format-and-append, used in place of a regular `call` when redirecting
    /// a call to `print`. Operands: `off(2) argc(1)`.
    Sprint = 0x2e,
}

impl Op {
    /// Decode an opcode byte, failing on anything not in the instruction set.
    pub fn try_from_u8(byte: u8) -> Result<Self, DecodeError> {
        Op::from_repr(byte).ok_or(DecodeError::UnknownOpcode(byte))
    }
}

impl From<Op> for u8 {
    fn from(op: Op) -> u8 {
        op as u8
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
