use std::fmt;

pub mod assembler;
pub mod fileio;
pub mod pool;
pub mod runtime;

/// Marker implemented by every error surfaced from the toolchain.
pub trait ScError: fmt::Display + fmt::Debug {}
