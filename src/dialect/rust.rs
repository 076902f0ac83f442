//! Rust output: match arms and methods over a `self` holding the registers,
//! `bus` and `clk`.

use super::{CodeWriter, Dialect, Expr, Stmt, case_comment};
use crate::addressing::{Index, MicroOp, Offset, Procedure, Temp};
use crate::opcode::OpcodeEntry;
use crate::operation::{AluOperation, Condition, Flag, Register};
use itertools::Itertools;

/// Cargo feature enabling the 65C02 opcodes
pub const FEATURE: &str = "emulate_65c02";

#[derive(Debug, Copy, Clone, Default)]
pub struct Rust;

impl Rust {
    fn register(register: Register) -> &'static str {
        match register {
            Register::A => "self.a",
            Register::X => "self.x",
            Register::Y => "self.y",
            Register::Sp => "self.s",
            Register::P => "self.p",
        }
    }

    fn index(index: Index) -> String {
        format!("self.{}", index.register())
    }

    fn mask(flag: Flag) -> String {
        format!("{:#04X}", u8::from(flag))
    }

    fn expr(expr: &Expr) -> String {
        match expr {
            Expr::Register(r) => Self::register(*r).to_string(),
            Expr::Memory => "self.bus.read(address)".to_string(),
            Expr::Literal(n) => n.to_string(),
            Expr::Mask(flag) => Self::mask(*flag),
            Expr::Not(inner) => format!("!{}", Self::term(inner)),
            Expr::Var(name) => name.to_string(),
            Expr::Apply(operation, args) => match (operation, args.as_slice()) {
                (AluOperation::None, [value]) => Self::expr(value),
                (AluOperation::And, [l, r]) => format!("{} & {}", Self::term(l), Self::term(r)),
                (AluOperation::Or, [l, r]) => format!("{} | {}", Self::term(l), Self::term(r)),
                (AluOperation::Eor, [l, r]) => format!("{} ^ {}", Self::term(l), Self::term(r)),
                (AluOperation::Add, [l, r]) => {
                    format!("{}.wrapping_add({})", Self::term(l), Self::expr(r))
                }
                (AluOperation::Sub, [l, r]) => {
                    format!("{}.wrapping_sub({})", Self::term(l), Self::expr(r))
                }
                (operation, args) => format!(
                    "self.{operation}({})",
                    args.iter().map(Self::expr).join(", ")
                ),
            },
            Expr::Pull => "self.stack_pull()".to_string(),
            Expr::Vector(address) => format!(
                "u16::from_le_bytes([self.bus.read({address:#06X}), self.bus.read({:#06X})])",
                address.wrapping_add(1)
            ),
        }
    }

    fn term(expr: &Expr) -> String {
        match expr {
            Expr::Apply(AluOperation::And | AluOperation::Or | AluOperation::Eor, args)
                if args.len() == 2 =>
            {
                format!("({})", Self::expr(expr))
            }
            _ => Self::expr(expr),
        }
    }

    fn condition(condition: &Condition) -> String {
        match condition {
            Condition::Always => "true".to_string(),
            Condition::FlagSet(flag) => format!("self.p & {} != 0", Self::mask(*flag)),
            Condition::FlagClear(flag) => format!("self.p & {} == 0", Self::mask(*flag)),
        }
    }

    fn program_counter(offset: i8) -> String {
        match offset {
            0 => "self.pc".to_string(),
            n if n < 0 => format!("self.pc.wrapping_sub({})", n.unsigned_abs()),
            n => format!("self.pc.wrapping_add({n})"),
        }
    }

    /// Converts a byte-valued expression to the width of `dst`.
    fn widen(dst: Temp, byte: String) -> String {
        if dst.is_wide() {
            format!("u16::from({byte})")
        } else {
            byte
        }
    }

    /// `src` as a bus address.
    fn address(src: Temp, offset: Offset) -> String {
        let name = src.name();
        match (offset, src.is_wide()) {
            (Offset::Same, true) => name.to_string(),
            (Offset::Same, false) => format!("u16::from({name})"),
            (Offset::Next, true) => format!("{name}.wrapping_add(1)"),
            (Offset::Next, false) => format!("u16::from({name}).wrapping_add(1)"),
            (Offset::NextZeroPage, true) => format!("{name}.wrapping_add(1) & 0xFF"),
            (Offset::NextZeroPage, false) => format!("u16::from({name}.wrapping_add(1))"),
        }
    }

    fn micro_op(w: &mut CodeWriter, op: &MicroOp) {
        let assign = |w: &mut CodeWriter, dst: Temp, value: String| {
            w.line(format!("let {} = {value};", dst.name()));
        };
        match *op {
            MicroOp::Fetch(dst) => {
                assign(w, dst, Self::widen(dst, "self.read_pc_inc()".to_string()))
            }
            MicroOp::TakeProgramCounter(dst) => {
                assign(w, dst, "self.pc".to_string());
                w.line("self.pc = self.pc.wrapping_add(1);");
            }
            MicroOp::Read { dst, src, offset } => {
                let read = format!("self.bus.read({})", Self::address(src, offset));
                assign(w, dst, Self::widen(dst, read));
            }
            MicroOp::Combine { dst, low, high } => assign(
                w,
                dst,
                format!("u16::from_le_bytes([{}, {}])", low.name(), high.name()),
            ),
            MicroOp::AddIndexZeroPage { dst, src, index } => {
                let sum = if src.is_wide() {
                    format!("({} as u8).wrapping_add({})", src.name(), Self::index(index))
                } else {
                    format!("{}.wrapping_add({})", src.name(), Self::index(index))
                };
                assign(w, dst, Self::widen(dst, sum));
            }
            MicroOp::AddIndex { dst, src, index } => assign(
                w,
                dst,
                format!(
                    "{}.wrapping_add(u16::from({}))",
                    src.name(),
                    Self::index(index)
                ),
            ),
            MicroOp::PageCross { base, address } => w.line(format!(
                "let page_crossed = ({} & 0xFF00) != ({} & 0xFF00);",
                base.name(),
                address.name()
            )),
        }
    }
}

impl Dialect for Rust {
    fn open_case(&self, w: &mut CodeWriter, entry: &OpcodeEntry) {
        w.open(format!("{:#04X} => {{ // {}", entry.byte, case_comment(entry)));
    }

    fn close_case(&self, w: &mut CodeWriter) {
        w.close("}");
    }

    fn open_guard(&self, w: &mut CodeWriter) {
        w.line(format!("#[cfg(feature = \"{FEATURE}\")]"));
    }

    fn close_guard(&self, _w: &mut CodeWriter) {}

    fn statement(&self, w: &mut CodeWriter, stmt: &Stmt) {
        match stmt {
            Stmt::AddCycles(n) => w.line(format!("self.clk.add_cpu_cycles({n});")),
            Stmt::Resolve(procedure) => {
                if procedure.crosses_pages() {
                    w.line(format!(
                        "let (address, page_crossed) = self.{}();",
                        procedure.name
                    ));
                    w.open("if page_crossed {");
                    w.line("self.clk.add_cpu_cycles(1);");
                    w.close("}");
                } else {
                    w.line(format!("let address = self.{}();", procedure.name));
                }
            }
            Stmt::Let { name, value } => {
                w.line(format!("let {name}: u8 = {};", Self::expr(value)));
            }
            Stmt::Assign { target, value } => {
                w.line(format!("{} = {};", Self::register(*target), Self::expr(value)));
            }
            Stmt::Store(value) => {
                w.line(format!("self.bus.write(address, {});", Self::expr(value)));
            }
            Stmt::Discard(name) => w.line(format!("let _ = {name};")),
            Stmt::Branch(condition) => {
                w.line("let rel = self.read_pc_inc() as i8;");
                w.open(format!("if {} {{", Self::condition(condition)));
                w.line("self.clk.add_cpu_cycles(1);");
                w.line("let target = self.pc.wrapping_add_signed(i16::from(rel));");
                w.open("if (target & 0xFF00) != (self.pc & 0xFF00) {");
                w.line("self.clk.add_cpu_cycles(1);");
                w.close("}");
                w.line("self.pc = target;");
                w.close("}");
            }
            Stmt::SetProgramCounter(value) => {
                w.line(format!("self.pc = {};", Self::expr(value)));
            }
            Stmt::PushProgramCounter(offset) => {
                w.line(format!(
                    "let [low, high] = {}.to_le_bytes();",
                    Self::program_counter(*offset)
                ));
                w.line("self.stack_push(high);");
                w.line("self.stack_push(low);");
            }
            Stmt::PullProgramCounter(adjust) => {
                w.line("let low = self.stack_pull();");
                w.line("let high = self.stack_pull();");
                if *adjust == 0 {
                    w.line("self.pc = u16::from_le_bytes([low, high]);");
                } else {
                    w.line(format!(
                        "self.pc = u16::from_le_bytes([low, high]).wrapping_add({adjust});"
                    ));
                }
            }
            Stmt::Push(value) => w.line(format!("self.stack_push({});", Self::expr(value))),
            Stmt::ExtendedOnly(stmts) => {
                w.open(format!("if cfg!(feature = \"{FEATURE}\") {{"));
                self.statements(w, stmts);
                w.close("}");
            }
        }
    }

    fn procedure(&self, w: &mut CodeWriter, procedure: &Procedure) {
        if procedure.name.chars().any(|c| c.is_ascii_uppercase()) {
            w.line("#[allow(non_snake_case)]");
        }
        let crosses_pages = procedure.crosses_pages();
        if crosses_pages {
            w.open(format!("fn {}(&mut self) -> (u16, bool) {{", procedure.name));
        } else {
            w.open(format!("fn {}(&mut self) -> u16 {{", procedure.name));
        }
        for op in procedure.ops {
            Self::micro_op(w, op);
        }
        if crosses_pages {
            w.line(format!("({}, page_crossed)", Temp::Address.name()));
        } else {
            w.line(Temp::Address.name());
        }
        w.close("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::AddressingMode;

    fn render_procedure(mode: AddressingMode) -> String {
        let mut w = CodeWriter::new(0);
        Rust.procedure(&mut w, &mode.procedure().unwrap());
        w.finish()
    }

    #[test]
    fn test_zeropage_procedure() {
        assert_eq!(
            render_procedure(AddressingMode::ZeroPage),
            "fn zeropage(&mut self) -> u16 {\n    let address = u16::from(self.read_pc_inc());\n    address\n}\n"
        );
    }

    #[test]
    fn test_indexed_procedure() {
        let text = render_procedure(AddressingMode::AbsoluteIndexedX);
        assert!(text.starts_with("#[allow(non_snake_case)]\nfn absolute_indexed_X(&mut self) -> (u16, bool) {\n"));
        assert!(text.contains("let base = u16::from_le_bytes([low, high]);"));
        assert!(text.contains("let address = base.wrapping_add(u16::from(self.x));"));
        assert!(text.ends_with("    (address, page_crossed)\n}\n"));
    }

    #[test]
    fn test_zeropage_indexed_procedure() {
        let text = render_procedure(AddressingMode::ZeroPageIndexedY);
        assert!(text.contains("let address = u16::from(zpg.wrapping_add(self.y));"));
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            Rust::expr(&Expr::Apply(
                AluOperation::Or,
                vec![
                    Expr::Register(Register::P),
                    Expr::Apply(
                        AluOperation::Or,
                        vec![Expr::Mask(Flag::B2), Expr::Mask(Flag::B)]
                    )
                ]
            )),
            "self.p | (0x20 | 0x10)"
        );
        assert_eq!(
            Rust::expr(&Expr::Apply(
                AluOperation::Sub,
                vec![Expr::Var("operand1"), Expr::Var("operand2")]
            )),
            "operand1.wrapping_sub(operand2)"
        );
        assert_eq!(
            Rust::condition(&Condition::FlagClear(Flag::Z)),
            "self.p & 0x02 == 0"
        );
    }
}
