#[macro_use]
pub mod log;

pub mod assembler;
pub mod config;
pub mod device;
pub mod disasm;
pub mod error;
pub mod fileio;
pub mod instruction;
pub mod isa;
pub mod pool;
pub mod ring;
pub mod runtime;
pub mod scanner;

pub use assembler::{assemble, assemble_file};
pub use config::{AssemblerOptions, Config};
pub use device::{BufferConsole, Devices, HeadlessScreen, StdoutConsole};
pub use disasm::{disassemble, DisassemblyOptions};
pub use fileio::{Capabilities, Module};
pub use ring::RingBuffer;
pub use runtime::{Exit, Runtime};
