use crate::{error::pool::*, scanner::Literal};

/// Words addressable by the literal pool; keeps the byte length within the header's 16-bit field.
pub const MAX_LITERAL_WORDS: usize = u16::MAX as usize / 4;

/// Append-only pool of 32-bit words. Each literal is identified by the index
/// of its first word, and occupies a disjoint run of words.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LiteralPool {
	words: Vec<u32>,
}

impl LiteralPool {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_words(words: Vec<u32>) -> Self {
		Self { words }
	}

	pub fn check_length(&self, increase: usize) -> PoolResult {
		if self.words.len() + increase > MAX_LITERAL_WORDS {
			Err(PoolError::Full(PoolItem::Literals))
		} else {
			Ok(())
		}
	}

	pub fn push_word(&mut self, word: u32) -> PoolResult<u16> {
		self.check_length(1)?;
		let idx = self.words.len() as u16;
		self.words.push(word);
		Ok(idx)
	}

	pub fn push_literal(&mut self, literal: Literal) -> PoolResult<u16> {
		self.push_word(literal.to_word())
	}

	/// Stores the bytes followed by a NUL, padded with zeros to whole words.
	pub fn push_str(&mut self, text: &str) -> PoolResult<u16> {
		let mut bytes = text.as_bytes().to_vec();
		bytes.push(0);
		let len = (bytes.len() + 3) / 4;
		bytes.resize(len * 4, 0);

		self.check_length(len)?;
		let idx = self.words.len() as u16;
		self.words.extend(
			bytes
				.chunks_exact(4)
				.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
		);
		Ok(idx)
	}

	pub fn get(&self, idx: u16) -> Option<u32> {
		self.words.get(idx as usize).copied()
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	pub fn words(&self) -> &[u32] {
		&self.words
	}

	pub fn into_words(self) -> Vec<u32> {
		self.words
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn literals_do_not_overlap() {
		let mut pool = LiteralPool::new();
		let a = pool.push_literal(Literal::Uint(5)).unwrap();
		let s = pool.push_str("hello").unwrap();
		let b = pool.push_literal(Literal::Int(-1)).unwrap();
		assert_eq!((a, s, b), (0, 1, 3));
		assert_eq!(pool.get(a), Some(5));
		assert_eq!(pool.get(b), Some(u32::MAX));
		assert_eq!(pool.len(), 4);
	}

	#[test]
	fn strings_are_nul_terminated_and_padded() {
		let mut pool = LiteralPool::new();
		pool.push_str("abcd").unwrap();
		assert_eq!(pool.words(), &[u32::from_le_bytes(*b"abcd"), 0]);

		let mut pool = LiteralPool::new();
		pool.push_str("").unwrap();
		assert_eq!(pool.words(), &[0]);
	}

	#[test]
	fn float_bits_are_stored() {
		let mut pool = LiteralPool::new();
		let idx = pool.push_literal(Literal::Float(1.5)).unwrap();
		assert_eq!(pool.get(idx).map(f32::from_bits), Some(1.5));
	}

	#[test]
	fn overflow() {
		let mut pool = LiteralPool::from_words(vec![0; MAX_LITERAL_WORDS - 1]);
		assert!(pool.push_word(1).is_ok());
		assert_eq!(pool.push_word(2), Err(PoolError::Full(PoolItem::Literals)));
		assert_eq!(pool.push_str("x"), Err(PoolError::Full(PoolItem::Literals)));
	}
}
