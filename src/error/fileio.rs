use super::ScError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FileIOError {
    #[error("{path}: {reason}")]
    Io { path: String, reason: String },
    #[error("malformed header: {0}")]
    MalformedHeader(MalformedHeaderError),
    #[error("malformed {section} section: {reason}")]
    MalformedSection {
        section: &'static str,
        reason: MalformedSectionError,
    },
    #[error("{section} section is too large ({bytes} bytes)")]
    TooLarge { section: &'static str, bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedHeaderError {
    #[error("file is {0} bytes, shorter than the header")]
    Truncated(usize),
    #[error("bad magic 0x{0:08x}")]
    Magic(u32),
    #[error("{0}")]
    Decode(String),
    #[error("entry point {entry} outside of {count} instructions")]
    EntryPoint { entry: u16, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MalformedSectionError {
    #[error("range {start}..{end} exceeds file length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("length {0} is not a multiple of 4")]
    Unaligned(usize),
}

impl ScError for FileIOError {}

pub type FileIOResult<O = ()> = Result<O, FileIOError>;
