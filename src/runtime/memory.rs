use crate::error::runtime::*;
use std::ops::Range;

/// Flat byte-addressed memory: the literal pool followed by scratch space.
/// The literal region is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
	bytes: Vec<u8>,
	literal_len: usize,
}

impl Memory {
	pub fn new(literals: &[u32], scratch: usize) -> Self {
		let mut bytes = Vec::with_capacity(literals.len() * 4 + scratch);
		for word in literals {
			bytes.extend(word.to_le_bytes());
		}
		let literal_len = bytes.len();
		bytes.resize(literal_len + scratch, 0);
		Self { bytes, literal_len }
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	fn range(&self, addr: u32, width: u32) -> RuntimeResult<Range<usize>> {
		let start = addr as usize;
		match start.checked_add(width as usize) {
			Some(end) if end <= self.bytes.len() => Ok(start..end),
			_ => Err(RuntimeError::MemoryOutOfBounds { addr, width }),
		}
	}

	/// Little-endian load of 1, 2 or 4 bytes, zero extended.
	pub fn load(&self, addr: u32, width: u32) -> RuntimeResult<u32> {
		let range = self.range(addr, width)?;
		Ok(self.bytes[range]
			.iter()
			.rev()
			.fold(0u32, |acc, b| acc << 8 | *b as u32))
	}

	pub fn store(&mut self, addr: u32, width: u32, value: u32) -> RuntimeResult {
		let range = self.range(addr, width)?;
		if range.start < self.literal_len {
			return Err(RuntimeError::ReadOnlyMemory { addr });
		}
		let bytes = value.to_le_bytes();
		self.bytes[range].copy_from_slice(&bytes[..width as usize]);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn literals_are_loaded_little_endian() {
		let mem = Memory::new(&[0x1122_3344], 4);
		assert_eq!(mem.len(), 8);
		assert_eq!(mem.load(0, 4), Ok(0x1122_3344));
		assert_eq!(mem.load(0, 1), Ok(0x44));
		assert_eq!(mem.load(2, 2), Ok(0x1122));
	}

	#[test]
	fn stores_go_to_scratch() {
		let mut mem = Memory::new(&[7], 8);
		assert_eq!(mem.store(4, 4, 0xAABB_CCDD), Ok(()));
		assert_eq!(mem.load(4, 4), Ok(0xAABB_CCDD));
		assert_eq!(mem.store(9, 2, 0x1234_5678), Ok(()));
		assert_eq!(mem.load(9, 2), Ok(0x5678));
		assert_eq!(mem.store(0, 1, 1), Err(RuntimeError::ReadOnlyMemory { addr: 0 }));
	}

	#[test]
	fn bounds() {
		let mem = Memory::new(&[], 4);
		assert_eq!(mem.load(1, 4), Err(RuntimeError::MemoryOutOfBounds { addr: 1, width: 4 }));
		assert_eq!(
			mem.load(u32::MAX, 4),
			Err(RuntimeError::MemoryOutOfBounds { addr: u32::MAX, width: 4 })
		);
	}
}
