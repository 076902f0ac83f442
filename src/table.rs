//! Instruction table loading.
//!
//! The base instruction set comes as a text grid with one row per high nibble.
//! After the row label every row holds 16 slots, each either a
//! `MNEMONIC MODE` pair or the `---` placeholder of an unimplemented opcode.
//! The 65C02 additions are merged on top from [`EXTENDED_OVERLAY`].

use crate::opcode::{AddressingMode, OpcodeEntry, OpcodeMap};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// The documented NMOS 6502 opcodes
pub const BASE_TABLE: &str = include_str!("../tables/6502.txt");

const PLACEHOLDER: &str = "---";
const SLOTS_PER_ROW: usize = 16;
const ROWS: usize = 16;

/// Opcodes only present in the 65C02
pub static EXTENDED_OVERLAY: [(u8, &str, &str); 27] = [
    (0x72, "ADC", "(zpg)"),
    (0x32, "AND", "(zpg)"),
    (0xD2, "CMP", "(zpg)"),
    (0x52, "EOR", "(zpg)"),
    (0xB2, "LDA", "(zpg)"),
    (0x12, "ORA", "(zpg)"),
    (0xF2, "SBC", "(zpg)"),
    (0x92, "STA", "(zpg)"),
    (0x89, "BIT", "#"),
    (0x34, "BIT", "zpg,X"),
    (0x3C, "BIT", "abs,X"),
    (0x3A, "DEC", "A"),
    (0x1A, "INC", "A"),
    (0x7C, "JMP", "(abs,X)"),
    (0x80, "BRA", "rel"),
    (0xDA, "PHX", "impl"),
    (0x5A, "PHY", "impl"),
    (0xFA, "PLX", "impl"),
    (0x7A, "PLY", "impl"),
    (0x64, "STZ", "zpg"),
    (0x74, "STZ", "zpg,X"),
    (0x9C, "STZ", "abs"),
    (0x9E, "STZ", "abs,X"),
    (0x14, "TRB", "zpg"),
    (0x1C, "TRB", "abs"),
    (0x04, "TSB", "zpg"),
    (0x0C, "TSB", "abs"),
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unknown addressing mode \"{symbol}\" for opcode {byte:#04X} ({mnemonic})")]
    UnknownAddressingMode {
        byte: u8,
        mnemonic: String,
        symbol: String,
    },
    #[error("line {line}: mnemonic {mnemonic} in slot {slot} has no addressing mode")]
    MissingAddressingMode {
        line: usize,
        slot: usize,
        mnemonic: String,
    },
    #[error("line {line}: row has {slots} slots, expected 16")]
    ShortRow { line: usize, slots: usize },
    #[error("line {line}: unexpected token \"{token}\" after 16 slots")]
    TrailingToken { line: usize, token: String },
    #[error("line {line}: more than 16 rows")]
    TooManyRows { line: usize },
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

fn parse_entry(
    byte: u8,
    mnemonic: &str,
    symbol: &str,
    extended_only: bool,
) -> Result<OpcodeEntry, LoadError> {
    let addressing_mode =
        AddressingMode::from_str(symbol).map_err(|_| LoadError::UnknownAddressingMode {
            byte,
            mnemonic: mnemonic.to_string(),
            symbol: symbol.to_string(),
        })?;
    Ok(OpcodeEntry::new(byte, mnemonic, addressing_mode, extended_only))
}

fn parse_row(line_number: usize, row: usize, line: &str) -> Result<Vec<OpcodeEntry>, LoadError> {
    let mut tokens = line.split_whitespace().skip(1); // row label
    let mut entries = vec![];
    for slot in 0..SLOTS_PER_ROW {
        let byte = (row * SLOTS_PER_ROW + slot) as u8;
        let Some(mnemonic) = tokens.next() else {
            return Err(LoadError::ShortRow {
                line: line_number,
                slots: slot,
            });
        };
        if mnemonic == PLACEHOLDER {
            continue;
        }
        let Some(symbol) = tokens.next() else {
            return Err(LoadError::MissingAddressingMode {
                line: line_number,
                slot,
                mnemonic: mnemonic.to_string(),
            });
        };
        if symbol == PLACEHOLDER {
            // mnemonic without a mode is treated as unimplemented
            continue;
        }
        entries.push(parse_entry(byte, mnemonic, symbol, false)?);
    }
    if let Some(token) = tokens.next() {
        return Err(LoadError::TrailingToken {
            line: line_number,
            token: token.to_string(),
        });
    }
    Ok(entries)
}

/// Parses the base grid. Blank lines and lines starting with `;` are skipped;
/// rows fill the opcode space from `0x00` upwards.
pub fn parse_base_table(text: &str) -> Result<Vec<OpcodeEntry>, LoadError> {
    let mut entries = vec![];
    let rows = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with(';'));
    for (row, (line_number, line)) in rows.enumerate() {
        if row >= ROWS {
            return Err(LoadError::TooManyRows { line: line_number });
        }
        entries.extend(parse_row(line_number, row, line)?);
    }
    Ok(entries)
}

/// Parses the extended overlay, marking every entry as 65C02 only.
pub fn parse_overlay(overlay: &[(u8, &str, &str)]) -> Result<Vec<OpcodeEntry>, LoadError> {
    overlay
        .iter()
        .map(|&(byte, mnemonic, symbol)| parse_entry(byte, mnemonic, symbol, true))
        .collect()
}

/// Builds the unified opcode map. Overlay entries are merged last and win on
/// collision.
pub fn load(base: &str, overlay: &[(u8, &str, &str)]) -> Result<OpcodeMap, LoadError> {
    let base_entries = parse_base_table(base)?;
    let overlay_entries = parse_overlay(overlay)?;

    let mut map = OpcodeMap::new();
    for entry in base_entries {
        debug!("{entry}");
        map.insert(entry);
    }
    for entry in overlay_entries {
        debug!("{entry}");
        if let Some(previous) = map.insert(entry) {
            warn!("{:#04X}: overlay replaces base entry {previous}", previous.byte);
        }
    }
    info!("Loaded {} opcodes", map.len());
    Ok(map)
}

/// The built-in 6502 grid with the 65C02 overlay.
pub fn load_standard() -> Result<OpcodeMap, LoadError> {
    load(BASE_TABLE, &EXTENDED_OVERLAY)
}

/// Reads a base grid from `path` and merges the 65C02 overlay.
pub fn load_file(path: impl AsRef<Path>) -> Result<OpcodeMap, LoadError> {
    let path = path.as_ref();
    info!("Loading instruction table {}", path.display());
    let text = fs::read_to_string(path)?;
    load(&text, &EXTENDED_OVERLAY)
}
