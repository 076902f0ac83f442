//! Operation semantics per mnemonic.
//!
//! The catalog is addressing-mode agnostic: one [`OperationSpec`] serves every
//! addressing mode its mnemonic appears with. Loads, stores, transfers, flag
//! changes, shifts, compares and the accumulator ALU instructions share the
//! [`AluSpec`] shape; control flow and stack instructions get their own kinds.

use lazy_static::lazy_static;
use num_enum::IntoPrimitive;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use strum::{Display, EnumString};
use AluOperation as Op;
use Operand::{Memory as MEM, None as NONE, Oper as OPER};
use Register::{A, P, Sp, X, Y};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Register {
    A,
    X,
    Y,
    Sp,
    P,
}

/// Status flag masks
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, EnumString, IntoPrimitive)]
#[repr(u8)]
pub enum Flag {
    N = 0x80,
    V = 0x40,
    /// Unused bit, always pushed as set
    B2 = 0x20,
    /// Break, only present in pushed copies of `p`
    B = 0x10,
    D = 0x08,
    I = 0x04,
    Z = 0x02,
    C = 0x01,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operand {
    None,
    Register(Register),
    /// Complement of a register, `~a`
    InvertedRegister(Register),
    /// Memory at the resolved address
    Memory,
    /// Accumulator for `A` addressing, memory otherwise
    Oper,
    Literal(u8),
    Flag(Flag),
    /// Complement of a flag mask, `~C`
    InvertedFlag(Flag),
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::None => write!(f, "none"),
            Operand::Register(r) => write!(f, "{r}"),
            Operand::InvertedRegister(r) => write!(f, "~{r}"),
            Operand::Memory => write!(f, "mem"),
            Operand::Oper => write!(f, "oper"),
            Operand::Literal(n) => write!(f, "{n}"),
            Operand::Flag(flag) => write!(f, "{flag}"),
            Operand::InvertedFlag(flag) => write!(f, "~{flag}"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AluOperation {
    Adc,
    Sbc,
    And,
    Or,
    Eor,
    Asl,
    Lsr,
    Rol,
    Ror,
    Add,
    Sub,
    None,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AluSpec {
    pub operand1: Operand,
    pub operand2: Operand,
    pub operation: AluOperation,
    pub result: Operand,
}

impl Display for AluSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {}({}, {})",
            self.result, self.operation, self.operand1, self.operand2
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Condition {
    Always,
    FlagSet(Flag),
    FlagClear(Flag),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Alu,
    Branch,
    Jump,
    Call,
    Return,
    ReturnFromInterrupt,
    Break,
    Push,
    Pull,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OperationSpec {
    Alu(AluSpec),
    Branch(Condition),
    Jump,
    Call,
    Return,
    ReturnFromInterrupt,
    Break,
    Push(Register),
    Pull(Register),
}

impl OperationSpec {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationSpec::Alu(_) => OperationKind::Alu,
            OperationSpec::Branch(_) => OperationKind::Branch,
            OperationSpec::Jump => OperationKind::Jump,
            OperationSpec::Call => OperationKind::Call,
            OperationSpec::Return => OperationKind::Return,
            OperationSpec::ReturnFromInterrupt => OperationKind::ReturnFromInterrupt,
            OperationSpec::Break => OperationKind::Break,
            OperationSpec::Push(_) => OperationKind::Push,
            OperationSpec::Pull(_) => OperationKind::Pull,
        }
    }
}

const fn alu(
    operand1: Operand,
    operand2: Operand,
    operation: AluOperation,
    result: Operand,
) -> OperationSpec {
    OperationSpec::Alu(AluSpec {
        operand1,
        operand2,
        operation,
        result,
    })
}

const fn reg(r: Register) -> Operand {
    Operand::Register(r)
}

/// Mnemonics and their semantics, in the order of the hand-written table.
pub static OPERATIONS: [(&str, OperationSpec); 64] = [
    ("LDA", alu(MEM, NONE, Op::None, reg(A))),
    ("STA", alu(reg(A), NONE, Op::None, MEM)),
    ("LDX", alu(MEM, NONE, Op::None, reg(X))),
    ("STX", alu(reg(X), NONE, Op::None, MEM)),
    ("LDY", alu(MEM, NONE, Op::None, reg(Y))),
    ("STY", alu(reg(Y), NONE, Op::None, MEM)),
    ("STZ", alu(Operand::Literal(0), NONE, Op::None, MEM)),
    ("TXA", alu(reg(X), NONE, Op::None, reg(A))),
    ("TAX", alu(reg(A), NONE, Op::None, reg(X))),
    ("TYA", alu(reg(Y), NONE, Op::None, reg(A))),
    ("TAY", alu(reg(A), NONE, Op::None, reg(Y))),
    ("TXS", alu(reg(X), NONE, Op::None, reg(Sp))),
    ("TSX", alu(reg(Sp), NONE, Op::None, reg(X))),
    ("CLV", alu(reg(P), Operand::InvertedFlag(Flag::V), Op::And, reg(P))),
    ("SEC", alu(reg(P), Operand::Flag(Flag::C), Op::Or, reg(P))),
    ("CLC", alu(reg(P), Operand::InvertedFlag(Flag::C), Op::And, reg(P))),
    ("SED", alu(reg(P), Operand::Flag(Flag::D), Op::Or, reg(P))),
    ("CLD", alu(reg(P), Operand::InvertedFlag(Flag::D), Op::And, reg(P))),
    ("SEI", alu(reg(P), Operand::Flag(Flag::I), Op::Or, reg(P))),
    ("CLI", alu(reg(P), Operand::InvertedFlag(Flag::I), Op::And, reg(P))),
    // shifts work on A or on memory, expressed through "oper"
    ("ASL", alu(OPER, NONE, Op::Asl, OPER)),
    ("ROR", alu(OPER, NONE, Op::Ror, OPER)),
    ("ROL", alu(OPER, NONE, Op::Rol, OPER)),
    ("LSR", alu(OPER, NONE, Op::Lsr, OPER)),
    ("CMP", alu(reg(A), MEM, Op::Sbc, NONE)),
    ("CPX", alu(reg(X), MEM, Op::Sbc, NONE)),
    ("CPY", alu(reg(Y), MEM, Op::Sbc, NONE)),
    ("DEC", alu(MEM, Operand::Literal(1), Op::Sub, MEM)),
    ("INC", alu(MEM, Operand::Literal(1), Op::Add, MEM)),
    ("DEX", alu(reg(X), Operand::Literal(1), Op::Sub, reg(X))),
    ("INX", alu(reg(X), Operand::Literal(1), Op::Add, reg(X))),
    ("DEY", alu(reg(Y), Operand::Literal(1), Op::Sub, reg(Y))),
    ("INY", alu(reg(Y), Operand::Literal(1), Op::Add, reg(Y))),
    ("ADC", alu(reg(A), MEM, Op::Adc, reg(A))),
    ("SBC", alu(reg(A), MEM, Op::Sbc, reg(A))),
    ("EOR", alu(reg(A), MEM, Op::Eor, reg(A))),
    ("ORA", alu(reg(A), MEM, Op::Or, reg(A))),
    ("AND", alu(reg(A), MEM, Op::And, reg(A))),
    // flags of BIT are not modelled
    ("BIT", alu(reg(A), MEM, Op::And, NONE)),
    ("TRB", alu(MEM, Operand::InvertedRegister(A), Op::And, MEM)),
    ("TSB", alu(MEM, reg(A), Op::Or, MEM)),
    ("NOP", alu(NONE, NONE, Op::None, NONE)),
    ("BPL", OperationSpec::Branch(Condition::FlagClear(Flag::N))),
    ("BMI", OperationSpec::Branch(Condition::FlagSet(Flag::N))),
    ("BVC", OperationSpec::Branch(Condition::FlagClear(Flag::V))),
    ("BVS", OperationSpec::Branch(Condition::FlagSet(Flag::V))),
    ("BCC", OperationSpec::Branch(Condition::FlagClear(Flag::C))),
    ("BCS", OperationSpec::Branch(Condition::FlagSet(Flag::C))),
    ("BNE", OperationSpec::Branch(Condition::FlagClear(Flag::Z))),
    ("BEQ", OperationSpec::Branch(Condition::FlagSet(Flag::Z))),
    ("BRA", OperationSpec::Branch(Condition::Always)),
    ("JMP", OperationSpec::Jump),
    ("JSR", OperationSpec::Call),
    ("RTS", OperationSpec::Return),
    ("RTI", OperationSpec::ReturnFromInterrupt),
    ("BRK", OperationSpec::Break),
    ("PHA", OperationSpec::Push(A)),
    ("PHP", OperationSpec::Push(P)),
    ("PHX", OperationSpec::Push(X)),
    ("PHY", OperationSpec::Push(Y)),
    ("PLA", OperationSpec::Pull(A)),
    ("PLP", OperationSpec::Pull(P)),
    ("PLX", OperationSpec::Pull(X)),
    ("PLY", OperationSpec::Pull(Y)),
];

/// Pure mnemonic lookup over a fixed set of operations.
#[derive(Debug, Clone)]
pub struct OperationCatalog {
    operations: HashMap<String, OperationSpec>,
}

impl OperationCatalog {
    pub fn new(operations: impl IntoIterator<Item = (impl Into<String>, OperationSpec)>) -> Self {
        Self {
            operations: operations
                .into_iter()
                .map(|(mnemonic, spec)| (mnemonic.into(), spec))
                .collect(),
        }
    }

    /// The catalog of every 6502 and 65C02 mnemonic the tables use.
    pub fn standard() -> &'static OperationCatalog {
        &STANDARD_CATALOG
    }

    pub fn get(&self, mnemonic: &str) -> Option<&OperationSpec> {
        self.operations.get(mnemonic)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

lazy_static! {
    static ref STANDARD_CATALOG: OperationCatalog = OperationCatalog::new(OPERATIONS);
}
