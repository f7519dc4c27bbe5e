use crate::encode::DecodeError;

/// One of the predefined globals a Zed program may read or write.
///
/// `File`, `Frnum`, and `Rnum` are read-only: they are set by the driver and
/// an assignment to them is a compile error (see
/// [`crate::ComboOp`] and the compiler's `ReadOnlyGlobal` diagnostic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Global {
    /// `@cols` — list of strings, the current record split into fields.
    Cols = 0,
    /// `@file` — name of the file currently being processed. Read-only.
    File = 1,
    /// `@frnum` — 1-based record number within the current file. Read-only.
    Frnum = 2,
    /// `@ics` — input column separator. Default `,`.
    Ics = 3,
    /// `@irs` — input record separator. Default `\n`.
    Irs = 4,
    /// `@ocs` — output column separator. Default `,`.
    Ocs = 5,
    /// `@ors` — output record separator. Default `\n`.
    Ors = 6,
    /// `@rec` — the current record's raw bytes.
    Rec = 7,
    /// `@rnum` — 1-based record number across all files. Read-only.
    Rnum = 8,
}

impl Global {
    /// Looks up a global by its `@name` spelling, without the leading `@`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "cols" => Global::Cols,
            "file" => Global::File,
            "frnum" => Global::Frnum,
            "ics" => Global::Ics,
            "irs" => Global::Irs,
            "ocs" => Global::Ocs,
            "ors" => Global::Ors,
            "rec" => Global::Rec,
            "rnum" => Global::Rnum,
            _ => return None,
        })
    }

    /// Whether an assignment to this global must be rejected at compile time.
    pub const fn is_read_only(self) -> bool {
        matches!(self, Global::File | Global::Frnum | Global::Rnum)
    }

    /// Decode a global id byte as emitted by the compiler.
    pub fn try_from_u8(byte: u8) -> Result<Self, DecodeError> {
        Global::from_repr(byte).ok_or(DecodeError::UnknownGlobal(byte))
    }
}

impl From<Global> for u8 {
    fn from(g: Global) -> u8 {
        g as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn read_only_set_matches_spec() {
        assert!(Global::File.is_read_only());
        assert!(Global::Frnum.is_read_only());
        assert!(Global::Rnum.is_read_only());
        assert!(!Global::Rec.is_read_only());
        assert!(!Global::Irs.is_read_only());
    }

    #[test]
    fn every_global_round_trips_through_byte_and_name() {
        for g in Global::iter() {
            let byte: u8 = g.into();
            assert_eq!(Global::try_from_u8(byte).unwrap(), g);
        }
        assert_eq!(Global::iter().count(), 9);
    }

    #[test]
    fn name_lookup_round_trips() {
        assert_eq!(Global::from_name("ics"), Some(Global::Ics));
        assert_eq!(Global::from_name("nope"), None);
    }
}
