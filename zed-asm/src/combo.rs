use crate::encode::DecodeError;

/// The compound-assignment tag carried by `store`/`set` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ComboOp {
    /// `=`
    Assign = 0,
    /// `+=`
    Add = 1,
    /// `-=`
    Sub = 2,
    /// `*=`
    Mul = 3,
    /// `/=`
    Div = 4,
    /// `%=`
    Mod = 5,
    /// `?=` — assign only if the current value is nil.
    Cond = 6,
}

impl ComboOp {
    /// Decode a combo-op byte as emitted by the compiler.
    pub fn try_from_u8(byte: u8) -> Result<Self, DecodeError> {
        ComboOp::from_repr(byte).ok_or(DecodeError::UnknownCombo(byte))
    }
}

impl From<ComboOp> for u8 {
    fn from(c: ComboOp) -> u8 {
        c as u8
    }
}
