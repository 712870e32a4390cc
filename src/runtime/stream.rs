use crate::{error::runtime::*, isa, ring::RingBuffer};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Stream {
	pub ring: Arc<RingBuffer>,
	/// Sample width in bits: 8, 16 or 32.
	pub width: u32,
	pub rate: u32,
	pub continuous: bool,
}

impl Stream {
	pub fn mask(&self, value: u32) -> u32 {
		match self.width {
			8 => value & 0xFF,
			16 => value & 0xFFFF,
			_ => value,
		}
	}
}

/// Stream wired to the console consumer C0, drained on YIELD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sink {
	pub stream: u8,
	/// Values moved per drain, 0 for everything queued.
	pub block: u32,
}

/// VM-global stream table indexed by stream register.
#[derive(Debug, Clone, Default)]
pub struct Streams {
	slots: Vec<Option<Stream>>,
	pub sinks: Vec<Sink>,
}

impl Streams {
	pub fn new() -> Self {
		Self {
			slots: vec![None; isa::BANK_SIZE as usize],
			sinks: Vec::new(),
		}
	}

	fn slot(reg: u8) -> Option<usize> {
		isa::is_stream_reg(reg).then(|| (reg - isa::STREAM_BASE) as usize)
	}

	/// (Re)allocates the stream behind `reg` with a fresh ring.
	pub fn allocate(&mut self, reg: u8, width: u32, capacity: usize) -> RuntimeResult<&mut Stream> {
		let slot = Self::slot(reg).ok_or(RuntimeError::StreamNotAllocated(reg))?;
		Ok(self.slots[slot].insert(Stream {
			ring: Arc::new(RingBuffer::new(capacity)),
			width,
			rate: 0,
			continuous: false,
		}))
	}

	pub fn get(&self, reg: u8) -> RuntimeResult<&Stream> {
		Self::slot(reg)
			.and_then(|slot| self.slots[slot].as_ref())
			.ok_or(RuntimeError::StreamNotAllocated(reg))
	}

	pub fn get_mut(&mut self, reg: u8) -> RuntimeResult<&mut Stream> {
		Self::slot(reg)
			.and_then(|slot| self.slots[slot].as_mut())
			.ok_or(RuntimeError::StreamNotAllocated(reg))
	}

	/// Shared handle to a stream's ring, for producing from another thread.
	pub fn ring(&self, reg: u8) -> Option<Arc<RingBuffer>> {
		self.get(reg).ok().map(|s| s.ring.clone())
	}
}
