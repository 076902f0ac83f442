//! Operand resolution catalog.
//!
//! Every addressing mode either resolves its effective address through a
//! generic [`Procedure`], an ordered list of [`MicroOp`]s that ends by binding
//! [`Temp::Address`], or is [`Resolution::SpeciallyHandled`] by the body of
//! the instructions using it.

use crate::opcode::AddressingMode;
use Index::{X, Y};
use MicroOp::*;
use Offset::{Next, NextZeroPage, Same};
use Temp::*;

/// Named intermediate values of a resolution procedure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Temp {
    Zpg,
    Low,
    High,
    Pointer,
    Base,
    /// Effective address handed to the operation stage
    Address,
}

impl Temp {
    pub fn name(&self) -> &'static str {
        match self {
            Temp::Zpg => "zpg",
            Temp::Low => "low",
            Temp::High => "high",
            Temp::Pointer => "pointer",
            Temp::Base => "base",
            Temp::Address => "address",
        }
    }

    /// `true` for 16-bit values, `false` for bytes.
    pub fn is_wide(&self) -> bool {
        matches!(self, Temp::Pointer | Temp::Base | Temp::Address)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Index {
    X,
    Y,
}

impl Index {
    pub fn register(&self) -> &'static str {
        match self {
            Index::X => "x",
            Index::Y => "y",
        }
    }
}

/// Which cell a [`MicroOp::Read`] accesses relative to its source.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Offset {
    /// The source address itself
    Same,
    /// The successor with 16-bit wraparound
    Next,
    /// The successor, wrapping inside the zero page
    NextZeroPage,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MicroOp {
    /// `dst = read_pc_inc()`
    Fetch(Temp),
    /// `dst = pc; pc += 1`
    TakeProgramCounter(Temp),
    /// `dst = bus.read(src + offset)`
    Read { dst: Temp, src: Temp, offset: Offset },
    /// `dst = low + high * 256`
    Combine { dst: Temp, low: Temp, high: Temp },
    /// `dst = (src + index) & 0xFF`
    AddIndexZeroPage { dst: Temp, src: Temp, index: Index },
    /// `dst = src + index` with 16-bit wraparound
    AddIndex { dst: Temp, src: Temp, index: Index },
    /// Reports whether `base` and `address` differ in their high byte
    PageCross { base: Temp, address: Temp },
}

impl MicroOp {
    /// Number of program counter increments this step performs.
    pub fn pc_advance(&self) -> u16 {
        match self {
            MicroOp::Fetch(_) | MicroOp::TakeProgramCounter(_) => 1,
            _ => 0,
        }
    }

    /// Temporary written by this step, if any.
    pub fn target(&self) -> Option<Temp> {
        match *self {
            MicroOp::Fetch(dst)
            | MicroOp::TakeProgramCounter(dst)
            | MicroOp::Read { dst, .. }
            | MicroOp::Combine { dst, .. }
            | MicroOp::AddIndexZeroPage { dst, .. }
            | MicroOp::AddIndex { dst, .. } => Some(dst),
            MicroOp::PageCross { .. } => None,
        }
    }
}

/// A named effective-address computation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Procedure {
    pub name: &'static str,
    pub ops: &'static [MicroOp],
    /// Only reachable from 65C02 opcodes
    pub extended_only: bool,
}

impl Procedure {
    /// Whether the procedure can charge the page-cross penalty.
    pub fn crosses_pages(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, MicroOp::PageCross { .. }))
    }

    pub fn pc_advance(&self) -> u16 {
        self.ops.iter().map(MicroOp::pc_advance).sum()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Resolution {
    Generic(Procedure),
    SpeciallyHandled,
}

const ZEROPAGE: &[MicroOp] = &[Fetch(Address)];

const IMMEDIATE: &[MicroOp] = &[TakeProgramCounter(Address)];

const ABSOLUTE: &[MicroOp] = &[
    Fetch(Low),
    Fetch(High),
    Combine {
        dst: Address,
        low: Low,
        high: High,
    },
];

const ABSOLUTE_INDEXED_X: &[MicroOp] = &[
    Fetch(Low),
    Fetch(High),
    Combine {
        dst: Base,
        low: Low,
        high: High,
    },
    AddIndex {
        dst: Address,
        src: Base,
        index: X,
    },
    PageCross {
        base: Base,
        address: Address,
    },
];

const ABSOLUTE_INDEXED_Y: &[MicroOp] = &[
    Fetch(Low),
    Fetch(High),
    Combine {
        dst: Base,
        low: Low,
        high: High,
    },
    AddIndex {
        dst: Address,
        src: Base,
        index: Y,
    },
    PageCross {
        base: Base,
        address: Address,
    },
];

const INDEXED_INDIRECT: &[MicroOp] = &[
    Fetch(Zpg),
    AddIndexZeroPage {
        dst: Zpg,
        src: Zpg,
        index: X,
    },
    Read {
        dst: Low,
        src: Zpg,
        offset: Same,
    },
    Read {
        dst: High,
        src: Zpg,
        offset: NextZeroPage,
    },
    Combine {
        dst: Address,
        low: Low,
        high: High,
    },
];

const INDIRECT_INDEXED: &[MicroOp] = &[
    Fetch(Zpg),
    Read {
        dst: Low,
        src: Zpg,
        offset: Same,
    },
    Read {
        dst: High,
        src: Zpg,
        offset: NextZeroPage,
    },
    Combine {
        dst: Base,
        low: Low,
        high: High,
    },
    AddIndex {
        dst: Address,
        src: Base,
        index: Y,
    },
    PageCross {
        base: Base,
        address: Address,
    },
];

const ZEROPAGE_INDEXED_X: &[MicroOp] = &[
    Fetch(Zpg),
    AddIndexZeroPage {
        dst: Address,
        src: Zpg,
        index: X,
    },
];

const ZEROPAGE_INDEXED_Y: &[MicroOp] = &[
    Fetch(Zpg),
    AddIndexZeroPage {
        dst: Address,
        src: Zpg,
        index: Y,
    },
];

const INDIRECT: &[MicroOp] = &[
    Fetch(Low),
    Fetch(High),
    Combine {
        dst: Pointer,
        low: Low,
        high: High,
    },
    Read {
        dst: Low,
        src: Pointer,
        offset: Same,
    },
    Read {
        dst: High,
        src: Pointer,
        offset: Next,
    },
    Combine {
        dst: Address,
        low: Low,
        high: High,
    },
];

const ZEROPAGE_INDIRECT: &[MicroOp] = &[
    Fetch(Zpg),
    Read {
        dst: Low,
        src: Zpg,
        offset: Same,
    },
    Read {
        dst: High,
        src: Zpg,
        offset: NextZeroPage,
    },
    Combine {
        dst: Address,
        low: Low,
        high: High,
    },
];

const ABSOLUTE_INDEXED_INDIRECT_OPS: &[MicroOp] = &[
    Fetch(Low),
    Fetch(High),
    Combine {
        dst: Base,
        low: Low,
        high: High,
    },
    AddIndex {
        dst: Pointer,
        src: Base,
        index: X,
    },
    Read {
        dst: Low,
        src: Pointer,
        offset: Same,
    },
    Read {
        dst: High,
        src: Pointer,
        offset: Next,
    },
    Combine {
        dst: Address,
        low: Low,
        high: High,
    },
];

/// Jump target of `JMP (abs,X)`; not part of the generic catalog.
pub const ABSOLUTE_INDEXED_INDIRECT: Procedure = Procedure {
    name: "absolute_indexed_indirect",
    ops: ABSOLUTE_INDEXED_INDIRECT_OPS,
    extended_only: true,
};

const fn generic(name: &'static str, ops: &'static [MicroOp]) -> Resolution {
    Resolution::Generic(Procedure {
        name,
        ops,
        extended_only: false,
    })
}

const fn extended(name: &'static str, ops: &'static [MicroOp]) -> Resolution {
    Resolution::Generic(Procedure {
        name,
        ops,
        extended_only: true,
    })
}

impl AddressingMode {
    pub fn resolution(&self) -> Resolution {
        match self {
            AddressingMode::Accumulator
            | AddressingMode::Implied
            | AddressingMode::ProgramCounterRelative
            | AddressingMode::AbsoluteIndexedIndirectX => Resolution::SpeciallyHandled,
            AddressingMode::ZeroPage => generic("zeropage", ZEROPAGE),
            AddressingMode::Immediate => generic("immediate", IMMEDIATE),
            AddressingMode::Absolute => generic("absolute", ABSOLUTE),
            AddressingMode::AbsoluteIndexedX => generic("absolute_indexed_X", ABSOLUTE_INDEXED_X),
            AddressingMode::AbsoluteIndexedY => generic("absolute_indexed_Y", ABSOLUTE_INDEXED_Y),
            AddressingMode::ZeroPageIndexedIndirectX => {
                generic("indexed_indirect", INDEXED_INDIRECT)
            }
            AddressingMode::ZeroPageIndirectIndexedY => {
                generic("indirect_indexed", INDIRECT_INDEXED)
            }
            AddressingMode::ZeroPageIndexedX => generic("zeropage_indexed_X", ZEROPAGE_INDEXED_X),
            AddressingMode::ZeroPageIndexedY => generic("zeropage_indexed_Y", ZEROPAGE_INDEXED_Y),
            AddressingMode::AbsoluteIndirect => generic("indirect", INDIRECT),
            AddressingMode::ZeroPageIndirect => extended("zeropage_indirect", ZEROPAGE_INDIRECT),
        }
    }

    /// The generic procedure of this mode, `None` when specially handled.
    pub fn procedure(&self) -> Option<Procedure> {
        match self.resolution() {
            Resolution::Generic(procedure) => Some(procedure),
            Resolution::SpeciallyHandled => None,
        }
    }
}

/// All generic procedures followed by [`ABSOLUTE_INDEXED_INDIRECT`].
pub fn procedures() -> impl Iterator<Item = Procedure> {
    use strum::IntoEnumIterator;
    AddressingMode::iter()
        .filter_map(|mode| mode.procedure())
        .chain(std::iter::once(ABSOLUTE_INDEXED_INDIRECT))
}
