/*
    # Module format
    A fixed 22 byte little-endian header, followed by the literal pool and
    then the instruction words:

        magic        u32   0xDEADBEEF
        capabilities u32   bit 0 console, bit 1 screen
        entry point  u16   instruction index
        literals     u32 start, u16 length in bytes
        code         u32 start, u16 length in bytes
*/

use crate::error::fileio::*;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const MAGIC: u32 = 0xDEAD_BEEF;
pub const HEADER_SIZE: usize = 22;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities(u32);

impl Capabilities {
	pub const NONE: Capabilities = Capabilities(0);
	pub const CONSOLE: Capabilities = Capabilities(1);
	pub const SCREEN: Capabilities = Capabilities(1 << 1);

	pub const fn contains(&self, other: Capabilities) -> bool {
		self.0 & other.0 == other.0
	}

	pub fn insert(&mut self, other: Capabilities) {
		self.0 |= other.0;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Header {
	pub magic: u32,
	pub capabilities: Capabilities,
	pub entry_point: u16,
	pub literals_start: u32,
	pub literals_length: u16,
	pub code_start: u32,
	pub code_length: u16,
}

/// An assembled program: literal pool and instruction words.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Module {
	pub capabilities: Capabilities,
	pub entry_point: u16,
	pub literals: Vec<u32>,
	pub code: Vec<u32>,
}

fn options() -> impl Options {
	bincode::DefaultOptions::new()
		.with_fixint_encoding()
		.with_little_endian()
}

fn section_length(section: &'static str, words: &[u32]) -> FileIOResult<u16> {
	let bytes = words.len() * 4;
	u16::try_from(bytes).map_err(|_| FileIOError::TooLarge { section, bytes })
}

pub fn ser(module: &Module) -> FileIOResult<Vec<u8>> {
	let literals_length = section_length("literal", &module.literals)?;
	let code_length = section_length("code", &module.code)?;
	let header = Header {
		magic: MAGIC,
		capabilities: module.capabilities,
		entry_point: module.entry_point,
		literals_start: HEADER_SIZE as u32,
		literals_length,
		code_start: HEADER_SIZE as u32 + literals_length as u32,
		code_length,
	};

	let mut output = options()
		.serialize(&header)
		.map_err(|e| FileIOError::MalformedHeader(MalformedHeaderError::Decode(e.to_string())))?;
	for word in module.literals.iter().chain(&module.code) {
		output.extend(word.to_le_bytes());
	}
	Ok(output)
}

pub fn de(input: &[u8]) -> FileIOResult<Module> {
	if input.len() < HEADER_SIZE {
		return Err(FileIOError::MalformedHeader(MalformedHeaderError::Truncated(input.len())));
	}
	let header: Header = options()
		.deserialize(&input[..HEADER_SIZE])
		.map_err(|e| FileIOError::MalformedHeader(MalformedHeaderError::Decode(e.to_string())))?;
	if header.magic != MAGIC {
		return Err(FileIOError::MalformedHeader(MalformedHeaderError::Magic(header.magic)));
	}

	let literals = section(input, "literal", header.literals_start, header.literals_length)?;
	let code = section(input, "code", header.code_start, header.code_length)?;
	if !code.is_empty() && header.entry_point as usize >= code.len() {
		return Err(FileIOError::MalformedHeader(MalformedHeaderError::EntryPoint {
			entry: header.entry_point,
			count: code.len(),
		}));
	}

	Ok(Module {
		capabilities: header.capabilities,
		entry_point: header.entry_point,
		literals,
		code,
	})
}

fn section(input: &[u8], section: &'static str, start: u32, length: u16) -> FileIOResult<Vec<u32>> {
	let start = start as usize;
	let end = start + length as usize;
	if end > input.len() {
		return Err(FileIOError::MalformedSection {
			section,
			reason: MalformedSectionError::OutOfBounds { start, end, len: input.len() },
		});
	}
	if length % 4 != 0 {
		return Err(FileIOError::MalformedSection {
			section,
			reason: MalformedSectionError::Unaligned(length as usize),
		});
	}
	Ok(input[start..end]
		.chunks_exact(4)
		.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
		.collect())
}

fn io_error(path: &Path, err: std::io::Error) -> FileIOError {
	FileIOError::Io {
		path: path.display().to_string(),
		reason: err.to_string(),
	}
}

impl Module {
	pub fn read_file(path: impl AsRef<Path>) -> FileIOResult<Module> {
		let path = path.as_ref();
		let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
		de(&bytes)
	}

	pub fn write_file(&self, path: impl AsRef<Path>) -> FileIOResult {
		let path = path.as_ref();
		let bytes = ser(self)?;
		fs::write(path, bytes).map_err(|e| io_error(path, e))
	}
}
