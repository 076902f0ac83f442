//! Output languages for generated dispatch code.
//!
//! The generator lowers every opcode into [`Stmt`]s; a [`Dialect`] turns
//! those and the resolution [`Procedure`]s into source text.

use crate::addressing::Procedure;
use crate::opcode::OpcodeEntry;
use crate::operation::{AluOperation, Condition, Flag, Register};
use clap::ValueEnum;
use strum::{Display, EnumString};

pub mod cpp;
pub mod rust;

/// Values used by generated statements.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr {
    Register(Register),
    /// Byte at the resolved address
    Memory,
    Literal(u8),
    Mask(Flag),
    /// Bitwise complement
    Not(Box<Expr>),
    /// A previously bound local
    Var(&'static str),
    /// ALU function applied to its operands
    Apply(AluOperation, Vec<Expr>),
    /// Byte pulled from the stack
    Pull,
    /// Little-endian word stored at a fixed address
    Vector(u16),
}

impl Expr {
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }
}

/// One statement of a dispatch case body.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Stmt {
    /// Charge cycles to the clock
    AddCycles(u8),
    /// Bind `address` through a resolution procedure, charging the page-cross
    /// penalty where the procedure can cross pages
    Resolve(Procedure),
    Let { name: &'static str, value: Expr },
    Assign { target: Register, value: Expr },
    /// Write to the resolved address
    Store(Expr),
    /// Evaluate a local for its side effects only
    Discard(&'static str),
    /// Relative branch reading its displacement from the instruction stream
    Branch(Condition),
    SetProgramCounter(Expr),
    /// Push `pc + offset`, high byte first
    PushProgramCounter(i8),
    /// Pull the program counter, low byte first, and add `adjust`
    PullProgramCounter(u8),
    Push(Expr),
    /// Statements only compiled into 65C02 builds
    ExtendedOnly(Vec<Stmt>),
}

/// Line-oriented writer with indentation.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    indent: usize,
}

impl CodeWriter {
    pub const INDENT: usize = 4;

    pub fn new(indent: usize) -> Self {
        Self {
            out: String::new(),
            indent,
        }
    }

    pub fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            self.out.extend(std::iter::repeat_n(' ', self.indent));
            self.out.push_str(line);
        }
        self.out.push('\n');
    }

    /// Writes a line at column zero, e.g. a preprocessor directive.
    pub fn raw_line(&mut self, line: impl AsRef<str>) {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `line` and indents everything after it.
    pub fn open(&mut self, line: impl AsRef<str>) {
        self.line(line);
        self.indent += Self::INDENT;
    }

    /// Dedents and writes `line`.
    pub fn close(&mut self, line: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(Self::INDENT);
        self.line(line);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Renders statements and procedures in one target language.
pub trait Dialect {
    /// Opens a dispatch case, including the `// MNEMONIC mode` comment.
    fn open_case(&self, w: &mut CodeWriter, entry: &OpcodeEntry);

    fn close_case(&self, w: &mut CodeWriter);

    fn open_guard(&self, w: &mut CodeWriter);

    fn close_guard(&self, w: &mut CodeWriter);

    fn statement(&self, w: &mut CodeWriter, stmt: &Stmt);

    fn procedure(&self, w: &mut CodeWriter, procedure: &Procedure);

    fn statements(&self, w: &mut CodeWriter, stmts: &[Stmt]) {
        for stmt in stmts {
            self.statement(w, stmt);
        }
    }
}

/// Trailing comment of a case header, e.g. `ADC abs,X` or `PHX impl, 65C02`.
pub fn case_comment(entry: &OpcodeEntry) -> String {
    let mut comment = format!("{} {}", entry.mnemonic, entry.addressing_mode);
    if entry.extended_only {
        comment.push_str(", 65C02");
    }
    comment
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Display, EnumString, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum DialectKind {
    /// C++ member function body, as used by a templated CPU6502 core
    #[default]
    Cpp,
    /// Rust match arms over `self`
    Rust,
}

impl DialectKind {
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Cpp => &cpp::Cpp,
            DialectKind::Rust => &rust::Rust,
        }
    }
}
