use std::fmt::{Display, Formatter};
use strum::{EnumIter, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpcodeMapError {
    #[error("{byte:#04X}: opcode already present | current={current} new={new}")]
    Duplicate {
        byte: u8,
        current: OpcodeEntry,
        new: OpcodeEntry,
    },
}

/// Addressing modes by their table symbol.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, EnumString, EnumIter)]
pub enum AddressingMode {
    /// A
    #[strum(serialize = "A")]
    Accumulator,
    /// impl
    #[strum(serialize = "impl")]
    Implied,
    /// rel
    #[strum(serialize = "rel")]
    ProgramCounterRelative,
    /// \#
    #[strum(serialize = "#")]
    Immediate,
    /// zpg
    #[strum(serialize = "zpg")]
    ZeroPage,
    /// zpg,X
    #[strum(serialize = "zpg,X")]
    ZeroPageIndexedX,
    /// zpg,Y
    #[strum(serialize = "zpg,Y")]
    ZeroPageIndexedY,
    /// abs
    #[strum(serialize = "abs")]
    Absolute,
    /// abs,X
    #[strum(serialize = "abs,X")]
    AbsoluteIndexedX,
    /// abs,Y
    #[strum(serialize = "abs,Y")]
    AbsoluteIndexedY,
    /// ind
    #[strum(serialize = "ind")]
    AbsoluteIndirect,
    /// X,ind
    #[strum(serialize = "X,ind")]
    ZeroPageIndexedIndirectX,
    /// ind,Y
    #[strum(serialize = "ind,Y")]
    ZeroPageIndirectIndexedY,
    /// (zpg), 65C02 only
    #[strum(serialize = "(zpg)")]
    ZeroPageIndirect,
    /// (abs,X), 65C02 only
    #[strum(serialize = "(abs,X)")]
    AbsoluteIndexedIndirectX,
}

impl AddressingMode {
    /// Table symbol of this mode, e.g. `abs,X`.
    pub fn symbol(&self) -> &'static str {
        match self {
            AddressingMode::Accumulator => "A",
            AddressingMode::Implied => "impl",
            AddressingMode::ProgramCounterRelative => "rel",
            AddressingMode::Immediate => "#",
            AddressingMode::ZeroPage => "zpg",
            AddressingMode::ZeroPageIndexedX => "zpg,X",
            AddressingMode::ZeroPageIndexedY => "zpg,Y",
            AddressingMode::Absolute => "abs",
            AddressingMode::AbsoluteIndexedX => "abs,X",
            AddressingMode::AbsoluteIndexedY => "abs,Y",
            AddressingMode::AbsoluteIndirect => "ind",
            AddressingMode::ZeroPageIndexedIndirectX => "X,ind",
            AddressingMode::ZeroPageIndirectIndexedY => "ind,Y",
            AddressingMode::ZeroPageIndirect => "(zpg)",
            AddressingMode::AbsoluteIndexedIndirectX => "(abs,X)",
        }
    }

    /// Number of operand bytes following the opcode.
    pub fn width(&self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ProgramCounterRelative
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageIndexedX
            | AddressingMode::ZeroPageIndexedY
            | AddressingMode::ZeroPageIndirect
            | AddressingMode::ZeroPageIndexedIndirectX
            | AddressingMode::ZeroPageIndirectIndexedY => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteIndexedX
            | AddressingMode::AbsoluteIndexedY
            | AddressingMode::AbsoluteIndirect
            | AddressingMode::AbsoluteIndexedIndirectX => 2,
        }
    }
}

impl Display for AddressingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OpcodeEntry {
    pub byte: u8,
    pub mnemonic: String,
    pub addressing_mode: AddressingMode,
    /// Only present in the 65C02 instruction set
    pub extended_only: bool,
}

impl OpcodeEntry {
    pub fn new(
        byte: u8,
        mnemonic: impl Into<String>,
        addressing_mode: AddressingMode,
        extended_only: bool,
    ) -> Self {
        Self {
            byte,
            mnemonic: mnemonic.into(),
            addressing_mode,
            extended_only,
        }
    }

    pub fn base(byte: u8, mnemonic: impl Into<String>, addressing_mode: AddressingMode) -> Self {
        Self::new(byte, mnemonic, addressing_mode, false)
    }

    pub fn extended(
        byte: u8,
        mnemonic: impl Into<String>,
        addressing_mode: AddressingMode,
    ) -> Self {
        Self::new(byte, mnemonic, addressing_mode, true)
    }
}

impl Display for OpcodeEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02X} : {} {}",
            self.byte, self.mnemonic, self.addressing_mode
        )?;
        if self.extended_only {
            write!(f, " (65C02 only)")?;
        }
        Ok(())
    }
}

/// Lookup table for instructions by opcode byte
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OpcodeMap {
    entries: [Option<OpcodeEntry>; 256],
}

impl OpcodeMap {
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| None),
        }
    }

    /// Builds a map from hand-constructed entries, rejecting duplicate bytes.
    pub fn from_entries(
        entries: impl IntoIterator<Item = OpcodeEntry>,
    ) -> Result<Self, OpcodeMapError> {
        let mut map = Self::new();
        for entry in entries {
            if let Some(current) = map.get(entry.byte) {
                return Err(OpcodeMapError::Duplicate {
                    byte: entry.byte,
                    current: current.clone(),
                    new: entry,
                });
            }
            map.insert(entry);
        }
        Ok(map)
    }

    /// Stores `entry`, returning the entry previously stored for its byte.
    pub fn insert(&mut self, entry: OpcodeEntry) -> Option<OpcodeEntry> {
        let n = entry.byte as usize;
        self.entries[n].replace(entry)
    }

    pub fn get(&self, byte: u8) -> Option<&OpcodeEntry> {
        self.entries[byte as usize].as_ref()
    }

    /// Implemented entries in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = &OpcodeEntry> {
        self.entries.iter().flatten()
    }

    /// All entries sharing `mnemonic`, in ascending byte order.
    pub fn get_instructions<'a>(
        &'a self,
        mnemonic: &'a str,
    ) -> impl Iterator<Item = &'a OpcodeEntry> + 'a {
        self.iter().filter(move |e| e.mnemonic == mnemonic)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for OpcodeMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_symbol_roundtrip() {
        for mode in AddressingMode::iter() {
            assert_eq!(AddressingMode::from_str(mode.symbol()).unwrap(), mode);
            assert_eq!(mode.to_string(), mode.symbol());
        }
    }

    #[test]
    fn test_unknown_symbol() {
        assert!(AddressingMode::from_str("zzz").is_err());
        assert!(AddressingMode::from_str("abs, X").is_err());
    }

    #[test]
    fn test_duplicate_byte() {
        let result = OpcodeMap::from_entries([
            OpcodeEntry::base(0x69, "ADC", AddressingMode::Immediate),
            OpcodeEntry::base(0x69, "SBC", AddressingMode::Immediate),
        ]);
        match result {
            Err(OpcodeMapError::Duplicate { byte, current, new }) => {
                assert_eq!(byte, 0x69);
                assert_eq!(current.mnemonic, "ADC");
                assert_eq!(new.mnemonic, "SBC");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_iter_ascending() {
        let map = OpcodeMap::from_entries([
            OpcodeEntry::base(0xEA, "NOP", AddressingMode::Implied),
            OpcodeEntry::base(0x00, "BRK", AddressingMode::Implied),
            OpcodeEntry::extended(0x80, "BRA", AddressingMode::ProgramCounterRelative),
        ])
        .unwrap();
        let bytes: Vec<u8> = map.iter().map(|e| e.byte).collect();
        assert_eq!(bytes, [0x00, 0x80, 0xEA]);
        assert_eq!(map.len(), 3);
        assert!(map.get(0x01).is_none());
    }
}
