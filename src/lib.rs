use thiserror::Error;

pub mod addressing;
pub mod dialect;
pub mod generator;
pub mod opcode;
pub mod operation;
pub mod table;
pub mod verifier;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] table::LoadError),
    #[error(transparent)]
    Generate(#[from] generator::GenerateError),
    #[error(transparent)]
    Verify(#[from] verifier::VerifyError),
    #[error(transparent)]
    OpcodeMap(#[from] opcode::OpcodeMapError),
    #[error("opcode {0:#04X} is not implemented")]
    NotImplemented(u8),
    #[error("{0} case(s) with unknown addressing mode")]
    UnknownModes(usize),
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}
