//! Dispatch code generation.
//!
//! Every implemented opcode is lowered into a list of [`Stmt`]s: one baseline
//! cycle, the address resolution of its mode and the body of its operation.
//! The configured [`Dialect`] renders the result.

use crate::addressing::{self, ABSOLUTE_INDEXED_INDIRECT, Procedure, Resolution};
use crate::dialect::{CodeWriter, Dialect, Expr, Stmt};
use crate::opcode::{AddressingMode, OpcodeEntry, OpcodeMap};
use crate::operation::{
    AluOperation, AluSpec, Flag, Operand, OperationCatalog, OperationKind, OperationSpec,
    Register,
};
use clap::ValueEnum;
use log::debug;
use strum::{Display, EnumString};
use thiserror::Error;

/// Vector read by `BRK`
pub const IRQ_VECTOR: u16 = 0xFFFE;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("opcode {byte:#04X}: unknown mnemonic {mnemonic}")]
    UnknownMnemonic { byte: u8, mnemonic: String },
    #[error("opcode {byte:#04X}: {mnemonic} accesses memory but {mode} resolves no address")]
    MissingAddress {
        byte: u8,
        mnemonic: String,
        mode: AddressingMode,
    },
    #[error("opcode {byte:#04X}: {kind} operation {mnemonic} does not support mode {mode}")]
    UnsupportedMode {
        byte: u8,
        mnemonic: String,
        kind: OperationKind,
        mode: AddressingMode,
    },
    #[error("opcode {byte:#04X}: {mnemonic} is missing an operand for {operation}")]
    MissingOperand {
        byte: u8,
        mnemonic: String,
        operation: AluOperation,
    },
    #[error("opcode {byte:#04X}: {mnemonic} cannot store its result to {result}")]
    InvalidResult {
        byte: u8,
        mnemonic: String,
        result: Operand,
    },
}

/// Which parts of the output to emit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Display, EnumString, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    /// Procedures followed by cases
    #[default]
    All,
    /// Address resolution procedures only
    Procedures,
    /// Dispatch cases only
    Cases,
}

pub struct Generator<'a> {
    dialect: &'a dyn Dialect,
    catalog: &'a OperationCatalog,
    indent: usize,
}

impl<'a> Generator<'a> {
    pub fn new(dialect: &'a dyn Dialect, catalog: &'a OperationCatalog) -> Self {
        Self {
            dialect,
            catalog,
            indent: 0,
        }
    }

    /// Indents every emitted line by `indent` columns.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Lowers one opcode into the statements of its case body.
    pub fn lower(&self, entry: &OpcodeEntry) -> Result<Vec<Stmt>, GenerateError> {
        let spec = self
            .catalog
            .get(&entry.mnemonic)
            .ok_or_else(|| GenerateError::UnknownMnemonic {
                byte: entry.byte,
                mnemonic: entry.mnemonic.clone(),
            })?;
        let mode = entry.addressing_mode;
        let unsupported = || GenerateError::UnsupportedMode {
            byte: entry.byte,
            mnemonic: entry.mnemonic.clone(),
            kind: spec.kind(),
            mode,
        };
        let implied = || {
            if mode == AddressingMode::Implied {
                Ok(())
            } else {
                Err(unsupported())
            }
        };

        let mut stmts = vec![Stmt::AddCycles(1)];
        if let Resolution::Generic(procedure) = mode.resolution() {
            stmts.push(Stmt::Resolve(procedure));
        }

        match *spec {
            OperationSpec::Alu(alu) => lower_alu(entry, &alu, &mut stmts)?,
            OperationSpec::Branch(condition) => {
                if mode != AddressingMode::ProgramCounterRelative {
                    return Err(unsupported());
                }
                stmts.push(Stmt::Branch(condition));
            }
            OperationSpec::Jump => {
                match mode {
                    AddressingMode::AbsoluteIndexedIndirectX => {
                        stmts.push(Stmt::Resolve(ABSOLUTE_INDEXED_INDIRECT));
                    }
                    _ if has_address(mode) => {}
                    _ => return Err(unsupported()),
                }
                stmts.push(Stmt::SetProgramCounter(Expr::Var("address")));
            }
            OperationSpec::Call => {
                if !has_address(mode) {
                    return Err(unsupported());
                }
                // return address is the last byte of the instruction
                stmts.push(Stmt::PushProgramCounter(-1));
                stmts.push(Stmt::SetProgramCounter(Expr::Var("address")));
            }
            OperationSpec::Return => {
                implied()?;
                stmts.push(Stmt::PullProgramCounter(1));
            }
            OperationSpec::ReturnFromInterrupt => {
                implied()?;
                stmts.push(Stmt::Assign {
                    target: Register::P,
                    value: Expr::Pull,
                });
                stmts.push(Stmt::PullProgramCounter(0));
            }
            OperationSpec::Break => {
                implied()?;
                // skip the padding byte
                stmts.push(Stmt::PushProgramCounter(1));
                stmts.push(Stmt::Push(pushed_status()));
                stmts.push(Stmt::Assign {
                    target: Register::P,
                    value: Expr::Apply(
                        AluOperation::Or,
                        vec![Expr::Register(Register::P), Expr::Mask(Flag::I)],
                    ),
                });
                stmts.push(Stmt::ExtendedOnly(vec![Stmt::Assign {
                    target: Register::P,
                    value: Expr::Apply(
                        AluOperation::And,
                        vec![Expr::Register(Register::P), Expr::not(Expr::Mask(Flag::D))],
                    ),
                }]));
                stmts.push(Stmt::SetProgramCounter(Expr::Vector(IRQ_VECTOR)));
            }
            OperationSpec::Push(register) => {
                implied()?;
                let value = match register {
                    Register::P => pushed_status(),
                    r => Expr::Register(r),
                };
                stmts.push(Stmt::Push(value));
            }
            OperationSpec::Pull(register) => {
                implied()?;
                stmts.push(Stmt::Assign {
                    target: register,
                    value: Expr::Pull,
                });
            }
        }
        Ok(stmts)
    }

    /// Renders the case of one opcode, including its guard.
    pub fn render_case(&self, w: &mut CodeWriter, entry: &OpcodeEntry) -> Result<(), GenerateError> {
        let stmts = self.lower(entry)?;
        debug!("{entry}: {} statements", stmts.len());
        if entry.extended_only {
            self.dialect.open_guard(w);
        }
        self.dialect.open_case(w, entry);
        self.dialect.statements(w, &stmts);
        self.dialect.close_case(w);
        if entry.extended_only {
            self.dialect.close_guard(w);
        }
        Ok(())
    }

    /// One case per implemented opcode, in ascending byte order.
    pub fn render_cases(&self, map: &OpcodeMap) -> Result<String, GenerateError> {
        let mut w = CodeWriter::new(self.indent);
        for (i, entry) in map.iter().enumerate() {
            if i > 0 {
                w.blank();
            }
            self.render_case(&mut w, entry)?;
        }
        Ok(w.finish())
    }

    /// One procedure per generic addressing mode and the `(abs,X)` jump
    /// target.
    pub fn render_procedures(&self) -> String {
        let mut w = CodeWriter::new(self.indent);
        for (i, procedure) in addressing::procedures().enumerate() {
            if i > 0 {
                w.blank();
            }
            self.render_procedure(&mut w, &procedure);
        }
        w.finish()
    }

    fn render_procedure(&self, w: &mut CodeWriter, procedure: &Procedure) {
        if procedure.extended_only {
            self.dialect.open_guard(w);
        }
        self.dialect.procedure(w, procedure);
        if procedure.extended_only {
            self.dialect.close_guard(w);
        }
    }

    pub fn render(&self, map: &OpcodeMap, section: Section) -> Result<String, GenerateError> {
        Ok(match section {
            Section::All => format!("{}\n{}", self.render_procedures(), self.render_cases(map)?),
            Section::Procedures => self.render_procedures(),
            Section::Cases => self.render_cases(map)?,
        })
    }
}

fn has_address(mode: AddressingMode) -> bool {
    mode.procedure().is_some()
}

/// `p` as pushed by `PHP` and `BRK`, with both break bits set.
fn pushed_status() -> Expr {
    Expr::Apply(
        AluOperation::Or,
        vec![
            Expr::Register(Register::P),
            Expr::Apply(
                AluOperation::Or,
                vec![Expr::Mask(Flag::B2), Expr::Mask(Flag::B)],
            ),
        ],
    )
}

/// Where an operand lives for the given mode.
fn operand_expr(entry: &OpcodeEntry, operand: Operand) -> Result<Option<Expr>, GenerateError> {
    let mode = entry.addressing_mode;
    Ok(match operand {
        Operand::None => None,
        Operand::Register(r) => Some(Expr::Register(r)),
        Operand::InvertedRegister(r) => Some(Expr::not(Expr::Register(r))),
        Operand::Memory | Operand::Oper if mode == AddressingMode::Accumulator => {
            Some(Expr::Register(Register::A))
        }
        Operand::Memory | Operand::Oper if has_address(mode) => Some(Expr::Memory),
        Operand::Memory | Operand::Oper => {
            return Err(GenerateError::MissingAddress {
                byte: entry.byte,
                mnemonic: entry.mnemonic.clone(),
                mode,
            });
        }
        Operand::Literal(n) => Some(Expr::Literal(n)),
        Operand::Flag(flag) => Some(Expr::Mask(flag)),
        Operand::InvertedFlag(flag) => Some(Expr::not(Expr::Mask(flag))),
    })
}

fn lower_alu(
    entry: &OpcodeEntry,
    alu: &AluSpec,
    stmts: &mut Vec<Stmt>,
) -> Result<(), GenerateError> {
    let missing_operand = || GenerateError::MissingOperand {
        byte: entry.byte,
        mnemonic: entry.mnemonic.clone(),
        operation: alu.operation,
    };

    let mut args = vec![];
    for (name, operand) in [("operand1", alu.operand1), ("operand2", alu.operand2)] {
        if let Some(value) = operand_expr(entry, operand)? {
            stmts.push(Stmt::Let { name, value });
            args.push(Expr::Var(name));
        }
    }

    let value = match alu.operation {
        AluOperation::None => match args.into_iter().next() {
            Some(value) => value,
            None if alu.result == Operand::None => return Ok(()), // nop
            None => return Err(missing_operand()),
        },
        AluOperation::Asl | AluOperation::Lsr | AluOperation::Rol | AluOperation::Ror => {
            if args.is_empty() {
                return Err(missing_operand());
            }
            args.truncate(1);
            Expr::Apply(alu.operation, args)
        }
        operation => {
            if args.len() < 2 {
                return Err(missing_operand());
            }
            Expr::Apply(operation, args)
        }
    };
    stmts.push(Stmt::Let {
        name: "result",
        value,
    });

    let result = Expr::Var("result");
    match operand_expr(entry, alu.result)? {
        None => stmts.push(Stmt::Discard("result")),
        Some(Expr::Register(target)) => stmts.push(Stmt::Assign {
            target,
            value: result,
        }),
        Some(Expr::Memory) => stmts.push(Stmt::Store(result)),
        Some(_) => {
            return Err(GenerateError::InvalidResult {
                byte: entry.byte,
                mnemonic: entry.mnemonic.clone(),
                result: alu.result,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::cpp::Cpp;
    use crate::operation::Condition;

    fn lower(byte: u8, mnemonic: &str, mode: AddressingMode) -> Result<Vec<Stmt>, GenerateError> {
        Generator::new(&Cpp, OperationCatalog::standard())
            .lower(&OpcodeEntry::base(byte, mnemonic, mode))
    }

    #[test]
    fn test_lower_adc_immediate() {
        let stmts = lower(0x69, "ADC", AddressingMode::Immediate).unwrap();
        assert_eq!(
            stmts,
            [
                Stmt::AddCycles(1),
                Stmt::Resolve(AddressingMode::Immediate.procedure().unwrap()),
                Stmt::Let {
                    name: "operand1",
                    value: Expr::Register(Register::A)
                },
                Stmt::Let {
                    name: "operand2",
                    value: Expr::Memory
                },
                Stmt::Let {
                    name: "result",
                    value: Expr::Apply(
                        AluOperation::Adc,
                        vec![Expr::Var("operand1"), Expr::Var("operand2")]
                    )
                },
                Stmt::Assign {
                    target: Register::A,
                    value: Expr::Var("result")
                },
            ]
        );
    }

    #[test]
    fn test_lower_accumulator_shift() {
        let stmts = lower(0x0A, "ASL", AddressingMode::Accumulator).unwrap();
        assert_eq!(stmts.len(), 4);
        assert_eq!(
            stmts[1],
            Stmt::Let {
                name: "operand1",
                value: Expr::Register(Register::A)
            }
        );
        assert_eq!(
            stmts[3],
            Stmt::Assign {
                target: Register::A,
                value: Expr::Var("result")
            }
        );
    }

    #[test]
    fn test_lower_nop() {
        assert_eq!(
            lower(0xEA, "NOP", AddressingMode::Implied).unwrap(),
            [Stmt::AddCycles(1)]
        );
    }

    #[test]
    fn test_lower_compare_discards() {
        let stmts = lower(0xC9, "CMP", AddressingMode::Immediate).unwrap();
        assert_eq!(stmts.last(), Some(&Stmt::Discard("result")));
    }

    #[test]
    fn test_lower_branch() {
        let stmts = lower(0xD0, "BNE", AddressingMode::ProgramCounterRelative).unwrap();
        assert_eq!(
            stmts,
            [
                Stmt::AddCycles(1),
                Stmt::Branch(Condition::FlagClear(Flag::Z))
            ]
        );
    }

    #[test]
    fn test_lower_indexed_indirect_jump() {
        let stmts = lower(0x7C, "JMP", AddressingMode::AbsoluteIndexedIndirectX).unwrap();
        assert_eq!(stmts[1], Stmt::Resolve(ABSOLUTE_INDEXED_INDIRECT));
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = lower(0x02, "XYZ", AddressingMode::Implied).unwrap_err();
        assert!(matches!(err, GenerateError::UnknownMnemonic { byte: 0x02, .. }));
    }

    #[test]
    fn test_memory_without_address() {
        let err = lower(0x02, "LDA", AddressingMode::Implied).unwrap_err();
        assert!(matches!(err, GenerateError::MissingAddress { .. }));
        assert_eq!(
            err.to_string(),
            "opcode 0x02: LDA accesses memory but impl resolves no address"
        );
    }

    #[test]
    fn test_unsupported_modes() {
        for (mnemonic, mode) in [
            ("BNE", AddressingMode::Absolute),
            ("JMP", AddressingMode::Implied),
            ("JSR", AddressingMode::AbsoluteIndexedIndirectX),
            ("RTS", AddressingMode::Absolute),
            ("PHA", AddressingMode::Accumulator),
        ] {
            let err = lower(0x02, mnemonic, mode).unwrap_err();
            assert!(
                matches!(err, GenerateError::UnsupportedMode { .. }),
                "{mnemonic} {mode}"
            );
        }
    }

    #[test]
    fn test_invalid_result() {
        let catalog = OperationCatalog::new([(
            "SCF",
            OperationSpec::Alu(AluSpec {
                operand1: Operand::Register(Register::A),
                operand2: Operand::None,
                operation: AluOperation::None,
                result: Operand::Flag(Flag::C),
            }),
        )]);
        let err = Generator::new(&Cpp, &catalog)
            .lower(&OpcodeEntry::base(0x02, "SCF", AddressingMode::Implied))
            .unwrap_err();
        assert!(matches!(err, GenerateError::InvalidResult { .. }));
    }

    #[test]
    fn test_missing_operand() {
        let catalog = OperationCatalog::new([(
            "ADD",
            OperationSpec::Alu(AluSpec {
                operand1: Operand::Register(Register::A),
                operand2: Operand::None,
                operation: AluOperation::Add,
                result: Operand::Register(Register::A),
            }),
        )]);
        let err = Generator::new(&Cpp, &catalog)
            .lower(&OpcodeEntry::base(0x02, "ADD", AddressingMode::Implied))
            .unwrap_err();
        assert!(matches!(err, GenerateError::MissingOperand { .. }));
    }

    #[test]
    fn test_procedures_guarded() {
        let text = Generator::new(&Cpp, OperationCatalog::standard()).render_procedures();
        assert!(text.contains("#if EMULATE_65C02\nuint16_t zeropage_indirect()\n"));
        assert!(text.contains("#if EMULATE_65C02\nuint16_t absolute_indexed_indirect()\n"));
        assert!(!text.contains("#if EMULATE_65C02\nuint16_t absolute()\n"));
    }
}
