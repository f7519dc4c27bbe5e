use crate::encode::DecodeError;

/// A built-in function recognized directly by the compiler rather than going
/// through a general `call`.
///
/// The set is intentionally small; anything not listed here compiles as an
/// ordinary identifier call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BuiltinId {
    /// `print(..)` — write arguments to the output buffer.
    Print = 0,
    /// `printf(fmt, ..)`.
    Printf = 1,
    /// `length(x)` — string, list, or map length.
    Length = 2,
    /// `split(s, sep)` — split a string into a list.
    Split = 3,
    /// `join(list, sep)` — join a list of strings.
    Join = 4,
    /// `substr(s, start, len)`.
    Substr = 5,
    /// `type(x)` — returns a type name string.
    Type = 6,
    /// `keys(map)`.
    Keys = 7,
    /// `has(container, key)`.
    Has = 8,
    /// `delete(map, key)`.
    Delete = 9,
    /// `int(x)` — numeric coercion.
    Int = 10,
    /// `float(x)` — numeric coercion.
    Float = 11,
    /// `str(x)` — string coercion.
    Str = 12,
    /// `exit(code)` — terminate the process after running the exit event.
    Exit = 13,
}

impl BuiltinId {
    /// Looks up a builtin by the identifier spelling a call used for its callee.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "print" => BuiltinId::Print,
            "printf" => BuiltinId::Printf,
            "length" => BuiltinId::Length,
            "split" => BuiltinId::Split,
            "join" => BuiltinId::Join,
            "substr" => BuiltinId::Substr,
            "type" => BuiltinId::Type,
            "keys" => BuiltinId::Keys,
            "has" => BuiltinId::Has,
            "delete" => BuiltinId::Delete,
            "int" => BuiltinId::Int,
            "float" => BuiltinId::Float,
            "str" => BuiltinId::Str,
            "exit" => BuiltinId::Exit,
            _ => return None,
        })
    }

    /// Decode a builtin id byte as emitted by the compiler.
    pub fn try_from_u8(byte: u8) -> Result<Self, DecodeError> {
        BuiltinId::from_repr(byte).ok_or(DecodeError::UnknownBuiltin(byte))
    }
}

impl From<BuiltinId> for u8 {
    fn from(b: BuiltinId) -> u8 {
        b as u8
    }
}
