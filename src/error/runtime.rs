use super::{fileio::FileIOError, ScError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("unknown opcode {opcode} at pc {pc}")]
    UnknownOpcode { opcode: u8, pc: u32 },
    #[error("program counter {pc} outside of {count} instructions")]
    PcOutOfBounds { pc: u32, count: usize },
    #[error("stack overflow in task {task}")]
    StackOverflow { task: usize },
    #[error("stack underflow in task {task}")]
    StackUnderflow { task: usize },
    #[error("division by zero at pc {pc}")]
    DivisionByZero { pc: u32 },
    #[error("memory access of {width} bytes at 0x{addr:x} is out of bounds")]
    MemoryOutOfBounds { addr: u32, width: u32 },
    #[error("store to read-only literal memory at 0x{addr:x}")]
    ReadOnlyMemory { addr: u32 },
    #[error("task limit of {0} reached")]
    TaskLimit(usize),
    #[error("required {0} device is not available")]
    DeviceUnavailable(&'static str),
    #[error("{0} device failed to initialise")]
    DeviceInit(&'static str),
    #[error("unknown {device} operation {op}")]
    UnknownDeviceOp { device: &'static str, op: u32 },
    #[error("no stream allocated for {}", reg(.0))]
    StreamNotAllocated(u8),
    #[error("cannot attach {} to {}", reg(.from), reg(.to))]
    InvalidAttach { from: u8, to: u8 },
    #[error(transparent)]
    Load(#[from] FileIOError),
}

impl ScError for RuntimeError {}

fn reg(r: &u8) -> String {
    crate::isa::register_name(*r)
}

pub type RuntimeResult<T = ()> = Result<T, RuntimeError>;
