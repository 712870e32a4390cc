use super::{pool::PoolError, ScError};
use std::fmt;
use thiserror::Error;

/// Where in the source an error was found, with the offending line captured
/// so the diagnostic can be rendered without re-reading the file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblerError {
    #[error("{location}: {kind}")]
    Source {
        location: Location,
        kind: SourceError,
    },
    #[error("could not read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("inconsistent instruction table: {0}")]
    Table(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("invalid token `{0}`")]
    InvalidToken(String),
    #[error("invalid literal `{0}`")]
    InvalidLiteral(String),
    #[error("literals are not permitted outside operand position")]
    BareLiteral,
    #[error("unknown toplevel definition `@{0}`")]
    UnknownDirective(String),
    #[error("unknown device `{0}`")]
    UnknownDevice(String),
    #[error("unknown function `{function}` for device `{device}`")]
    UnknownDeviceFunction { device: String, function: String },
    #[error("invalid opcode `{0}`")]
    InvalidOpcode(String),
    #[error("{mnemonic} expects {expected} operand(s), found {found}")]
    ArityMismatch {
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid operand {index} for {mnemonic}, expected {expected}")]
    InvalidOperand {
        mnemonic: &'static str,
        index: usize,
        expected: &'static str,
    },
    #[error("invalid register `{0}`")]
    InvalidRegister(String),
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("multiple entry points")]
    DuplicateEntry,
    #[error("unexpected stream size {0}, expected 8, 16 or 32")]
    InvalidStreamSize(u32),
    #[error("unexpected continuous flag {0}, expected 0 or 1")]
    InvalidContinuous(u32),
    #[error("operand value {0} does not fit an 8-bit operand field")]
    OperandRange(u32),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("cannot include `{path}`: {reason}")]
    Include { path: String, reason: String },
    #[error("includes nested deeper than {0} levels")]
    IncludeDepth(usize),
}

impl ScError for AssemblerError {}

pub type AssemblerResult<O = ()> = Result<O, AssemblerError>;
