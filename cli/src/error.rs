use samplecontrol::{
	assembler,
	error::{assembler::AssemblerError, fileio::FileIOError, runtime::RuntimeError},
};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CLIError {
	Assembler(AssemblerError),
	FileIO(FileIOError),
	Runtime(RuntimeError),
}

impl fmt::Display for CLIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			// Source errors get the full diagnostic with the offending line
			CLIError::Assembler(e) => f.write_str(assembler::render(e).trim_end()),
			CLIError::FileIO(e) => write!(f, "{}", e),
			CLIError::Runtime(e) => write!(f, "{}", e),
		}
	}
}

impl From<AssemblerError> for CLIError {
	fn from(e: AssemblerError) -> Self {
		CLIError::Assembler(e)
	}
}

impl From<FileIOError> for CLIError {
	fn from(e: FileIOError) -> Self {
		CLIError::FileIO(e)
	}
}

impl From<RuntimeError> for CLIError {
	fn from(e: RuntimeError) -> Self {
		CLIError::Runtime(e)
	}
}

pub type CLIResult<O = ()> = Result<O, CLIError>;
