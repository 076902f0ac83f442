//! C++ output for a templated `CPU6502<CLK, BUS>` core.

use super::{CodeWriter, Dialect, Expr, Stmt, case_comment};
use crate::addressing::{Index, MicroOp, Offset, Procedure, Temp};
use crate::opcode::OpcodeEntry;
use crate::operation::{AluOperation, Condition, Register};
use itertools::Itertools;
use std::collections::HashSet;

/// Preprocessor flag enabling the 65C02 opcodes
pub const GUARD: &str = "EMULATE_65C02";

#[derive(Debug, Copy, Clone, Default)]
pub struct Cpp;

impl Cpp {
    fn register(register: Register) -> &'static str {
        match register {
            Register::A => "a",
            Register::X => "x",
            Register::Y => "y",
            Register::Sp => "s",
            Register::P => "p",
        }
    }

    fn index(index: Index) -> &'static str {
        index.register()
    }

    fn expr(expr: &Expr) -> String {
        match expr {
            Expr::Register(r) => Self::register(*r).to_string(),
            Expr::Memory => "bus.read(address)".to_string(),
            Expr::Literal(n) => n.to_string(),
            Expr::Mask(flag) => flag.to_string(),
            Expr::Not(inner) => format!("~{}", Self::term(inner)),
            Expr::Var(name) => name.to_string(),
            Expr::Apply(operation, args) => match (operation, args.as_slice()) {
                (AluOperation::None, [value]) => Self::expr(value),
                (AluOperation::And, [l, r]) => format!("{} & {}", Self::term(l), Self::term(r)),
                (AluOperation::Or, [l, r]) => format!("{} | {}", Self::term(l), Self::term(r)),
                (AluOperation::Eor, [l, r]) => format!("{} ^ {}", Self::term(l), Self::term(r)),
                (AluOperation::Add, [l, r]) => format!("{} + {}", Self::term(l), Self::term(r)),
                (AluOperation::Sub, [l, r]) => format!("{} - {}", Self::term(l), Self::term(r)),
                (operation, args) => format!(
                    "{operation}({})",
                    args.iter().map(Self::expr).join(", ")
                ),
            },
            Expr::Pull => "stack_pull()".to_string(),
            Expr::Vector(address) => format!(
                "bus.read({address:#06X}) + bus.read({:#06X}) * 256",
                address.wrapping_add(1)
            ),
        }
    }

    /// An expression usable as an operand of an infix operator.
    fn term(expr: &Expr) -> String {
        match expr {
            Expr::Apply(AluOperation::And | AluOperation::Or | AluOperation::Eor, args)
            | Expr::Apply(AluOperation::Add | AluOperation::Sub, args)
                if args.len() == 2 =>
            {
                format!("({})", Self::expr(expr))
            }
            Expr::Vector(_) => format!("({})", Self::expr(expr)),
            _ => Self::expr(expr),
        }
    }

    fn condition(condition: &Condition) -> String {
        match condition {
            Condition::Always => "true".to_string(),
            Condition::FlagSet(flag) => format!("p & {flag}"),
            Condition::FlagClear(flag) => format!("!(p & {flag})"),
        }
    }

    fn program_counter(offset: i8) -> String {
        match offset {
            0 => "pc".to_string(),
            n if n < 0 => format!("(pc - {})", n.unsigned_abs()),
            n => format!("(pc + {n})"),
        }
    }

    fn micro_op(w: &mut CodeWriter, declared: &mut HashSet<Temp>, op: &MicroOp) {
        let mut assign = |w: &mut CodeWriter, dst: Temp, value: String| {
            if declared.insert(dst) {
                let ty = if dst.is_wide() { "uint16_t" } else { "uint8_t" };
                w.line(format!("{ty} {} = {value};", dst.name()));
            } else {
                w.line(format!("{} = {value};", dst.name()));
            }
        };
        match *op {
            MicroOp::Fetch(dst) => assign(w, dst, "read_pc_inc()".to_string()),
            MicroOp::TakeProgramCounter(dst) => {
                assign(w, dst, "pc".to_string());
                w.line("pc++;");
            }
            MicroOp::Read { dst, src, offset } => {
                let address = match offset {
                    Offset::Same => src.name().to_string(),
                    Offset::Next => format!("{} + 1", src.name()),
                    Offset::NextZeroPage => format!("({} + 1) & 0xFF", src.name()),
                };
                assign(w, dst, format!("bus.read({address})"));
            }
            MicroOp::Combine { dst, low, high } => {
                assign(w, dst, format!("{} + {} * 256", low.name(), high.name()));
            }
            MicroOp::AddIndexZeroPage { dst, src, index } => assign(
                w,
                dst,
                format!("({} + {}) & 0xFF", src.name(), Self::index(index)),
            ),
            MicroOp::AddIndex { dst, src, index } => {
                assign(w, dst, format!("{} + {}", src.name(), Self::index(index)));
            }
            MicroOp::PageCross { base, address } => w.line(format!(
                "page_crossed = ({} & 0xFF00) != ({} & 0xFF00);",
                base.name(),
                address.name()
            )),
        }
    }
}

impl Dialect for Cpp {
    fn open_case(&self, w: &mut CodeWriter, entry: &OpcodeEntry) {
        w.open(format!("case {:#04X}: {{ // {}", entry.byte, case_comment(entry)));
    }

    fn close_case(&self, w: &mut CodeWriter) {
        w.line("break;");
        w.close("}");
    }

    fn open_guard(&self, w: &mut CodeWriter) {
        w.raw_line(format!("#if {GUARD}"));
    }

    fn close_guard(&self, w: &mut CodeWriter) {
        w.raw_line(format!("#endif /* {GUARD} */"));
    }

    fn statement(&self, w: &mut CodeWriter, stmt: &Stmt) {
        match stmt {
            Stmt::AddCycles(n) => w.line(format!("clk.add_cpu_cycles({n});")),
            Stmt::Resolve(procedure) => {
                if procedure.crosses_pages() {
                    w.line("bool page_crossed = false;");
                    w.line(format!(
                        "uint16_t address = {}(page_crossed);",
                        procedure.name
                    ));
                    w.open("if(page_crossed) {");
                    w.line("clk.add_cpu_cycles(1);");
                    w.close("}");
                } else {
                    w.line(format!("uint16_t address = {}();", procedure.name));
                }
            }
            Stmt::Let { name, value } => {
                w.line(format!("uint8_t {name} = {};", Self::expr(value)));
            }
            Stmt::Assign { target, value } => {
                w.line(format!("{} = {};", Self::register(*target), Self::expr(value)));
            }
            Stmt::Store(value) => {
                w.line(format!("bus.write(address, {});", Self::expr(value)));
            }
            Stmt::Discard(name) => w.line(format!("(void){name};")),
            Stmt::Branch(condition) => {
                w.line("int8_t rel = read_pc_inc();");
                w.open(format!("if({}) {{", Self::condition(condition)));
                w.line("clk.add_cpu_cycles(1);");
                w.line("uint16_t target = pc + rel;");
                w.open("if((target & 0xFF00) != (pc & 0xFF00)) {");
                w.line("clk.add_cpu_cycles(1);");
                w.close("}");
                w.line("pc = target;");
                w.close("}");
            }
            Stmt::SetProgramCounter(value) => w.line(format!("pc = {};", Self::expr(value))),
            Stmt::PushProgramCounter(offset) => {
                let pc = Self::program_counter(*offset);
                w.line(format!("stack_push({pc} >> 8);"));
                w.line(format!("stack_push({pc} & 0xFF);"));
            }
            Stmt::PullProgramCounter(adjust) => {
                w.line("uint8_t low = stack_pull();");
                w.line("uint8_t high = stack_pull();");
                if *adjust == 0 {
                    w.line("pc = low + high * 256;");
                } else {
                    w.line(format!("pc = low + high * 256 + {adjust};"));
                }
            }
            Stmt::Push(value) => w.line(format!("stack_push({});", Self::expr(value))),
            Stmt::ExtendedOnly(stmts) => {
                self.open_guard(w);
                self.statements(w, stmts);
                self.close_guard(w);
            }
        }
    }

    fn procedure(&self, w: &mut CodeWriter, procedure: &Procedure) {
        if procedure.crosses_pages() {
            w.line(format!("uint16_t {}(bool& page_crossed)", procedure.name));
        } else {
            w.line(format!("uint16_t {}()", procedure.name));
        }
        w.open("{");
        let mut declared = HashSet::new();
        for op in procedure.ops {
            Self::micro_op(w, &mut declared, op);
        }
        w.line(format!("return {};", Temp::Address.name()));
        w.close("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::AddressingMode;
    use crate::operation::Flag;

    fn render_procedure(mode: AddressingMode) -> String {
        let mut w = CodeWriter::new(0);
        Cpp.procedure(&mut w, &mode.procedure().unwrap());
        w.finish()
    }

    #[test]
    fn test_immediate_procedure() {
        assert_eq!(
            render_procedure(AddressingMode::Immediate),
            "uint16_t immediate()\n{\n    uint16_t address = pc;\n    pc++;\n    return address;\n}\n"
        );
    }

    #[test]
    fn test_indexed_indirect_procedure() {
        let text = render_procedure(AddressingMode::ZeroPageIndexedIndirectX);
        assert!(text.contains("uint8_t zpg = read_pc_inc();\n"));
        assert!(text.contains("    zpg = (zpg + x) & 0xFF;\n"));
        assert!(text.contains("uint8_t high = bus.read((zpg + 1) & 0xFF);"));
    }

    #[test]
    fn test_page_cross_procedure() {
        let text = render_procedure(AddressingMode::AbsoluteIndexedY);
        assert!(text.starts_with("uint16_t absolute_indexed_Y(bool& page_crossed)\n"));
        assert!(text.contains("uint16_t address = base + y;"));
        assert!(text.contains("page_crossed = (base & 0xFF00) != (address & 0xFF00);"));
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            Cpp::expr(&Expr::Apply(
                AluOperation::And,
                vec![Expr::Register(Register::P), Expr::not(Expr::Mask(Flag::C))]
            )),
            "p & ~C"
        );
        assert_eq!(
            Cpp::expr(&Expr::Apply(AluOperation::Rol, vec![Expr::Var("operand1")])),
            "rol(operand1)"
        );
        assert_eq!(
            Cpp::expr(&Expr::Vector(0xFFFE)),
            "bus.read(0xFFFE) + bus.read(0xFFFF) * 256"
        );
    }
}
