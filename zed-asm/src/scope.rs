use crate::encode::DecodeError;

/// The kind of lexical scope a `scope_in`/`scope_out` pair delimits.
///
/// `Loop` scopes are unwound specially by `break`/`continue`, which emit a
/// `scope_out(Loop)` before jumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ScopeType {
    /// A lexical block, e.g. the arm of a conditional.
    Block = 0,
    /// The body of a loop.
    Loop = 1,
    /// A function call frame.
    Function = 2,
}

impl ScopeType {
    /// Decode a scope-type byte as emitted by the compiler.
    pub fn try_from_u8(byte: u8) -> Result<Self, DecodeError> {
        ScopeType::from_repr(byte).ok_or(DecodeError::UnknownScopeType(byte))
    }
}

impl From<ScopeType> for u8 {
    fn from(s: ScopeType) -> u8 {
        s as u8
    }
}
