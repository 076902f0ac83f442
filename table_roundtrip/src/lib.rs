use anyhow::Context;
use cpu6502_gen::opcode::{AddressingMode, OpcodeEntry, OpcodeMap};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCase {
    pub name: String,
    pub entries: Vec<Entry>,
    pub expected: Expected,
}

impl TableCase {
    pub fn opcode_map(&self) -> anyhow::Result<OpcodeMap> {
        let entries = self
            .entries
            .iter()
            .map(Entry::to_opcode_entry)
            .collect::<anyhow::Result<Vec<_>>>()?;
        OpcodeMap::from_entries(entries).context(self.name.clone())
    }
}

/// `[byte, mnemonic, mode, extended]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry(u8, String, String, bool);

impl Entry {
    pub fn byte(&self) -> u8 {
        self.0
    }

    pub fn mnemonic(&self) -> &str {
        &self.1
    }

    pub fn mode(&self) -> &str {
        &self.2
    }

    pub fn extended(&self) -> bool {
        self.3
    }

    pub fn to_opcode_entry(&self) -> anyhow::Result<OpcodeEntry> {
        let mode = AddressingMode::from_str(self.mode())
            .with_context(|| format!("{:#04X}: addressing mode {}", self.byte(), self.mode()))?;
        Ok(OpcodeEntry::new(
            self.byte(),
            self.mnemonic(),
            mode,
            self.extended(),
        ))
    }
}

/// Verifier counts over the generated output
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Expected {
    pub cases: usize,
    pub matched: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_parse() {
        for json in [
            include_str!("../cases/modes.json"),
            include_str!("../cases/extended.json"),
        ] {
            let case: TableCase = serde_json::from_str(json).unwrap();
            let map = case.opcode_map().unwrap();
            assert_eq!(map.len(), case.entries.len());
            assert_eq!(case.expected.cases, case.entries.len());
        }
    }

    #[test]
    fn test_unknown_mode() {
        let entry: Entry = serde_json::from_str(r#"[3, "LDA", "zzz", false]"#).unwrap();
        assert!(entry.to_opcode_entry().is_err());
    }
}
