use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use cpu6502_gen::dialect::DialectKind;
use cpu6502_gen::generator::{Generator, Section};
use cpu6502_gen::opcode::OpcodeMap;
use cpu6502_gen::operation::OperationCatalog;
use cpu6502_gen::{Error, table, verifier};
use log::{error, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the merged opcode table
    Table {
        /// Base instruction grid, the built-in 6502 table if omitted
        #[arg(long)]
        table: Option<PathBuf>,
        /// Only print this opcode, decimal or 0x-prefixed hex
        #[arg(long, value_parser = maybe_hex::<u8>, conflicts_with = "mnemonic")]
        byte: Option<u8>,
        /// Only print opcodes of this mnemonic
        #[arg(long)]
        mnemonic: Option<String>,
    },
    /// Generate dispatch code
    Generate {
        /// Base instruction grid, the built-in 6502 table if omitted
        #[arg(long)]
        table: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t)]
        dialect: DialectKind,
        #[arg(long, value_enum, default_value_t)]
        section: Section,
        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that every case calls the resolution procedure of its mode
    Verify {
        /// Dispatch source, stdin if omitted
        file: Option<PathBuf>,
        /// Fail on cases with an unknown addressing mode
        #[arg(long)]
        strict: bool,
        /// Take the expected modes from this grid instead of the case comments
        #[arg(long)]
        table: Option<PathBuf>,
        /// Take the expected modes from the built-in 6502 and 65C02 table
        #[arg(long, conflicts_with = "table")]
        builtin: bool,
    },
}

fn load(table: Option<&Path>) -> Result<OpcodeMap, Error> {
    Ok(match table {
        Some(path) => table::load_file(path)?,
        None => table::load_standard()?,
    })
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Table {
            table,
            byte,
            mnemonic,
        } => {
            let map = load(table.as_deref())?;
            if let Some(byte) = byte {
                let entry = map.get(byte).ok_or(Error::NotImplemented(byte))?;
                println!("{entry}");
            } else if let Some(mnemonic) = mnemonic {
                let mnemonic = mnemonic.to_uppercase();
                for entry in map.get_instructions(&mnemonic) {
                    println!("{entry}");
                }
            } else {
                for entry in map.iter() {
                    println!("{entry}");
                }
            }
        }
        Command::Generate {
            table,
            dialect,
            section,
            output,
        } => {
            let map = load(table.as_deref())?;
            let generator = Generator::new(dialect.dialect(), OperationCatalog::standard());
            let text = generator.render(&map, section)?;
            match output {
                Some(path) => {
                    fs::write(&path, text)?;
                    info!("Wrote {dialect} {section} to {}", path.display());
                }
                None => print!("{text}"),
            }
        }
        Command::Verify {
            file,
            strict,
            table,
            builtin,
        } => {
            let text = match &file {
                Some(path) => fs::read_to_string(path)?,
                None => io::read_to_string(io::stdin())?,
            };
            let report = if builtin || table.is_some() {
                verifier::verify_with_map(&text, &load(table.as_deref())?)?
            } else {
                verifier::verify(&text)?
            };
            for unknown in &report.unknown {
                println!(
                    "line {}: unknown addressing mode: {}",
                    unknown.line, unknown.header
                );
            }
            println!(
                "{} cases, {} matched, {} unknown",
                report.cases,
                report.matched,
                report.unknown.len()
            );
            if strict && !report.is_clean() {
                return Err(Error::UnknownModes(report.unknown.len()));
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
