//! Addressing consistency check over dispatch source text.
//!
//! Every dispatch case header (`case 0xNN:` or `0xNN =>`) declares an
//! addressing mode in its trailing `// MNEMONIC mode` comment. Until the next
//! header, some line must call the resolution procedure of that mode.

use crate::addressing::{ABSOLUTE_INDEXED_INDIRECT, Procedure, Resolution};
use crate::opcode::{AddressingMode, OpcodeMap};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

/// Modes whose cases have to call a resolution procedure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, EnumIter)]
pub enum DeclaredMode {
    #[strum(serialize = "absolute")]
    Absolute,
    #[strum(serialize = "absolute indexed X")]
    AbsoluteIndexedX,
    #[strum(serialize = "absolute indexed Y")]
    AbsoluteIndexedY,
    #[strum(serialize = "absolute indexed indirect")]
    AbsoluteIndexedIndirect,
    #[strum(serialize = "indexed indirect")]
    IndexedIndirect,
    #[strum(serialize = "indirect indexed")]
    IndirectIndexed,
    #[strum(serialize = "indirect")]
    Indirect,
    #[strum(serialize = "zeropage indirect")]
    ZeroPageIndirect,
    #[strum(serialize = "zeropage")]
    ZeroPage,
    #[strum(serialize = "zeropage indexed X")]
    ZeroPageIndexedX,
    #[strum(serialize = "zeropage indexed Y")]
    ZeroPageIndexedY,
}

impl DeclaredMode {
    pub fn addressing_mode(&self) -> AddressingMode {
        match self {
            DeclaredMode::Absolute => AddressingMode::Absolute,
            DeclaredMode::AbsoluteIndexedX => AddressingMode::AbsoluteIndexedX,
            DeclaredMode::AbsoluteIndexedY => AddressingMode::AbsoluteIndexedY,
            DeclaredMode::AbsoluteIndexedIndirect => AddressingMode::AbsoluteIndexedIndirectX,
            DeclaredMode::IndexedIndirect => AddressingMode::ZeroPageIndexedIndirectX,
            DeclaredMode::IndirectIndexed => AddressingMode::ZeroPageIndirectIndexedY,
            DeclaredMode::Indirect => AddressingMode::AbsoluteIndirect,
            DeclaredMode::ZeroPageIndirect => AddressingMode::ZeroPageIndirect,
            DeclaredMode::ZeroPage => AddressingMode::ZeroPage,
            DeclaredMode::ZeroPageIndexedX => AddressingMode::ZeroPageIndexedX,
            DeclaredMode::ZeroPageIndexedY => AddressingMode::ZeroPageIndexedY,
        }
    }

    /// The expectation a table entry of `mode` carries, `None` for the
    /// accumulator, immediate, implied and relative forms.
    pub fn of(mode: AddressingMode) -> Option<Self> {
        DeclaredMode::iter().find(|declared| declared.addressing_mode() == mode)
    }

    /// The procedure a case of this mode has to call.
    pub fn procedure(&self) -> Procedure {
        match self.addressing_mode().resolution() {
            Resolution::Generic(procedure) => procedure,
            Resolution::SpeciallyHandled => ABSOLUTE_INDEXED_INDIRECT,
        }
    }
}

/// Result of classifying a header comment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Classification {
    Expect(DeclaredMode),
    /// Accumulator, immediate, implied, relative or no mode at all
    NoMode,
    Unknown,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("line {line}: case but no case 0x: {text}")]
    MalformedCase { line: usize, text: String },
    #[error("didn't match {mode} for {case}, last was \"{last_line}\"")]
    Unmatched {
        mode: DeclaredMode,
        case: String,
        last_line: String,
    },
}

/// A header whose mode could not be classified.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownMode {
    pub line: usize,
    pub header: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VerifyReport {
    /// Case headers seen
    pub cases: usize,
    /// Expectations cleared by a procedure call
    pub matched: usize,
    pub unknown: Vec<UnknownMode>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty()
    }
}

lazy_static! {
    static ref C_HEADER: Regex =
        Regex::new(r"^\s*case\s+0x([0-9A-Fa-f]{2})\s*:").expect("invalid header pattern");
    static ref RUST_HEADER: Regex =
        Regex::new(r"^\s*0x([0-9A-Fa-f]{2})\s*=>").expect("invalid header pattern");
    static ref ANY_CASE: Regex = Regex::new(r"case.*:").expect("invalid case pattern");
    static ref COMMENT: Regex = Regex::new(r"//\s*(.*)$").expect("invalid comment pattern");
    static ref EXTENDED_SUFFIX: Regex =
        Regex::new(r",\s*65C02.*$").expect("invalid suffix pattern");
    static ref MNEMONIC: Regex =
        Regex::new(r"^[A-Z]{3}(\s+|$)").expect("invalid mnemonic pattern");

    /// Ordered rules, first match wins
    static ref RULES: Vec<(Regex, Classification)> = {
        use Classification::{Expect, NoMode};
        use DeclaredMode::*;
        [
            (r"\(abs,\s*[Xx]\)", Expect(AbsoluteIndexedIndirect)),
            (r"abs,\s*[Xx]", Expect(AbsoluteIndexedX)),
            (r"abs,\s*[Yy]", Expect(AbsoluteIndexedY)),
            (r"zpg,\s*[Xx]", Expect(ZeroPageIndexedX)),
            (r"zpg,\s*[Yy]", Expect(ZeroPageIndexedY)),
            (r"\(ind,\s*[Xx]\)|[Xx],\s*ind", Expect(IndexedIndirect)),
            (r"\(ind\),\s*[Yy]|ind,\s*[Yy]", Expect(IndirectIndexed)),
            (r"\(zpg\)", Expect(ZeroPageIndirect)),
            (r"\bind\b", Expect(Indirect)),
            (r"^A\b", NoMode),
            (r"#|\bimm\b", NoMode),
            (r"\bimpl\b", NoMode),
            (r"\brel\b", NoMode),
            (r"\bzpg\b", Expect(ZeroPage)),
            (r"\babs\b", Expect(Absolute)),
        ]
        .into_iter()
        .map(|(pattern, class)| (Regex::new(pattern).expect("invalid mode pattern"), class))
        .collect()
    };

    static ref CALLS: HashMap<DeclaredMode, Regex> = DeclaredMode::iter()
        .map(|mode| {
            let pattern = format!(r"\b{}\(", regex::escape(mode.procedure().name));
            (mode, Regex::new(&pattern).expect("invalid call pattern"))
        })
        .collect();
}

/// Classifies the mode written in a header comment such as `LDA abs, X` or
/// `STZ abs,X, 65C02`.
pub fn classify(comment: &str) -> Classification {
    let comment = EXTENDED_SUFFIX.replace(comment.trim(), "");
    let mode = MNEMONIC.replace(&comment, "");
    let mode = mode.trim();
    if mode.is_empty() {
        return Classification::NoMode;
    }
    RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(mode))
        .map_or(Classification::Unknown, |&(_, class)| class)
}

struct Header<'a> {
    byte: u8,
    text: &'a str,
    comment: &'a str,
}

fn parse_header(line_number: usize, line: &str) -> Result<Option<Header<'_>>, VerifyError> {
    let Some(captures) = C_HEADER
        .captures(line)
        .or_else(|| RUST_HEADER.captures(line))
    else {
        if ANY_CASE.is_match(line) {
            return Err(VerifyError::MalformedCase {
                line: line_number,
                text: line.trim().to_string(),
            });
        }
        return Ok(None);
    };
    let byte = u8::from_str_radix(&captures[1], 16).map_err(|_| VerifyError::MalformedCase {
        line: line_number,
        text: line.trim().to_string(),
    })?;
    let comment = COMMENT
        .captures(line)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str());
    Ok(Some(Header {
        byte,
        text: line.trim(),
        comment,
    }))
}

struct Pending {
    mode: DeclaredMode,
    case: String,
}

fn run(
    text: &str,
    classify_header: impl Fn(&Header<'_>) -> Classification,
) -> Result<VerifyReport, VerifyError> {
    let mut report = VerifyReport::default();
    let mut pending: Option<Pending> = None;
    let mut last_line = "";

    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        let Some(header) = parse_header(line_number, line)? else {
            if let Some(p) = &pending
                && CALLS.get(&p.mode).is_some_and(|call| call.is_match(line))
            {
                debug!("matched {} with {}", p.mode, line.trim());
                report.matched += 1;
                pending = None;
            }
            if !line.trim().is_empty() {
                last_line = line.trim();
            }
            continue;
        };

        if let Some(p) = pending.take() {
            return Err(VerifyError::Unmatched {
                mode: p.mode,
                case: p.case,
                last_line: last_line.to_string(),
            });
        }
        report.cases += 1;
        match classify_header(&header) {
            Classification::Expect(mode) => {
                debug!("{}: expecting {mode}", header.text);
                pending = Some(Pending {
                    mode,
                    case: header.text.to_string(),
                });
            }
            Classification::NoMode => {}
            Classification::Unknown => {
                warn!("unknown addressing mode: {}", header.text);
                report.unknown.push(UnknownMode {
                    line: line_number,
                    header: header.text.to_string(),
                });
            }
        }
        last_line = header.text;
    }

    match pending {
        Some(p) => Err(VerifyError::Unmatched {
            mode: p.mode,
            case: p.case,
            last_line: last_line.to_string(),
        }),
        None => Ok(report),
    }
}

/// Verifies dispatch source using the modes declared in header comments.
pub fn verify(text: &str) -> Result<VerifyReport, VerifyError> {
    run(text, |header| classify(header.comment))
}

/// Verifies dispatch source using the modes of `map`. Headers for bytes
/// missing from the map are reported as unknown.
pub fn verify_with_map(text: &str, map: &OpcodeMap) -> Result<VerifyReport, VerifyError> {
    run(text, |header| match map.get(header.byte) {
        Some(entry) => DeclaredMode::of(entry.addressing_mode)
            .map_or(Classification::NoMode, Classification::Expect),
        None => Classification::Unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpcodeEntry;

    #[test]
    fn test_classify_generated_comments() {
        use Classification::{Expect, NoMode};
        use DeclaredMode::*;
        let cases = [
            ("ADC abs,X", Expect(AbsoluteIndexedX)),
            ("LDX abs,Y", Expect(AbsoluteIndexedY)),
            ("JMP (abs,X), 65C02", Expect(AbsoluteIndexedIndirect)),
            ("LDA X,ind", Expect(IndexedIndirect)),
            ("LDA ind,Y", Expect(IndirectIndexed)),
            ("LDA (zpg), 65C02", Expect(ZeroPageIndirect)),
            ("JMP ind", Expect(Indirect)),
            ("STZ zpg,X, 65C02", Expect(ZeroPageIndexedX)),
            ("LDX zpg,Y", Expect(ZeroPageIndexedY)),
            ("LDA zpg", Expect(ZeroPage)),
            ("LDA abs", Expect(Absolute)),
            ("ASL A", NoMode),
            ("LDA #", NoMode),
            ("NOP impl", NoMode),
            ("BNE rel", NoMode),
        ];
        for (comment, expected) in cases {
            assert_eq!(classify(comment), expected, "{comment}");
        }
    }

    #[test]
    fn test_classify_hand_written_comments() {
        use Classification::{Expect, NoMode};
        use DeclaredMode::*;
        assert_eq!(classify("LDA abs, X"), Expect(AbsoluteIndexedX));
        assert_eq!(classify("ADC (ind), Y"), Expect(IndirectIndexed));
        assert_eq!(classify("ORA (ind, X)"), Expect(IndexedIndirect));
        assert_eq!(classify("JMP (abs, X), 65C02 only"), Expect(AbsoluteIndexedIndirect));
        assert_eq!(classify("AND abs, x"), Expect(AbsoluteIndexedX));
        assert_eq!(classify("LDA abs, y"), Expect(AbsoluteIndexedY));
        assert_eq!(classify("AND (ind), y"), Expect(IndirectIndexed));
        assert_eq!(classify("EOR (ind, x)"), Expect(IndexedIndirect));
        assert_eq!(classify("LDX zpg, y"), Expect(ZeroPageIndexedY));
        assert_eq!(classify("LDA imm"), NoMode);
        assert_eq!(classify("BRK"), NoMode);
        assert_eq!(classify(""), NoMode);
        assert_eq!(classify("LDA weird"), Classification::Unknown);
    }

    #[test]
    fn test_procedure_names() {
        assert_eq!(DeclaredMode::AbsoluteIndexedX.procedure().name, "absolute_indexed_X");
        assert_eq!(
            DeclaredMode::AbsoluteIndexedIndirect.procedure().name,
            "absolute_indexed_indirect"
        );
        assert_eq!(DeclaredMode::of(AddressingMode::Immediate), None);
        assert_eq!(
            DeclaredMode::of(AddressingMode::ZeroPageIndirect),
            Some(DeclaredMode::ZeroPageIndirect)
        );
    }

    #[test]
    fn test_match() {
        let text = "\
case 0xBD: { // LDA abs, X
    uint16_t address = absolute_indexed_X(page_crossed);
    a = bus.read(address);
    break;
}
case 0xEA: { // NOP
    break;
}
";
        let report = verify(text).unwrap();
        assert_eq!(report.cases, 2);
        assert_eq!(report.matched, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_unmatched() {
        let text = "\
case 0xBD: { // LDA abs, X
    uint16_t address = absolute(page_crossed);
    break;
}
case 0xEA: { // NOP
";
        let err = verify(text).unwrap_err();
        assert_eq!(
            err.to_string(),
            "didn't match absolute indexed X for case 0xBD: { // LDA abs, X, last was \"}\""
        );
    }

    #[test]
    fn test_lowercase_index_matched() {
        let text = "\
case 0x3D: { // AND abs, x
    uint16_t address = absolute_indexed_X(page_crossed);
    a = a & bus.read(address);
    break;
}
";
        assert_eq!(verify(text).unwrap().matched, 1);
    }

    #[test]
    fn test_unmatched_skips_blank_lines() {
        let text = "\
case 0xC6: { // DEC zpg
    uint16_t address = absolute();
    break;
}

case 0xEA: { // NOP
";
        match verify(text).unwrap_err() {
            VerifyError::Unmatched { last_line, .. } => assert_eq!(last_line, "}"),
            err => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn test_unmatched_at_end() {
        let err = verify("0xA5 => { // LDA zpg\n    self.a = 0;\n}\n").unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Unmatched {
                mode: DeclaredMode::ZeroPage,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_case() {
        let err = verify("case OPCODE_LDA: {\n").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedCase { line: 1, .. }));
    }

    #[test]
    fn test_unknown_recorded() {
        let report = verify("case 0x02: { // KIL weird\n    break;\n}\n").unwrap();
        assert_eq!(
            report.unknown,
            [UnknownMode {
                line: 1,
                header: "case 0x02: { // KIL weird".to_string()
            }]
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_verify_with_map() {
        let map = OpcodeMap::from_entries([
            OpcodeEntry::base(0x6D, "ADC", AddressingMode::Absolute),
            OpcodeEntry::base(0x69, "ADC", AddressingMode::Immediate),
        ])
        .unwrap();
        // the comment is ignored, the map says abs
        let text = "case 0x6D: { // ADC\n    uint16_t address = absolute();\n}\n";
        assert_eq!(verify_with_map(text, &map).unwrap().matched, 1);

        let err = verify_with_map("case 0x6D: {\n}\n", &map).unwrap_err();
        assert!(matches!(err, VerifyError::Unmatched { .. }));

        let report = verify_with_map("case 0x69: {\n}\ncase 0x03: {\n}\n", &map).unwrap();
        assert_eq!(report.unknown.len(), 1);
        assert_eq!(report.unknown[0].line, 3);
    }
}
