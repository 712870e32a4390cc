/*
	# Virtual Machine
	Code is executed one instruction word at a time for the active task:
	fetch the word at the task's pc, decode it into an opcode and three
	operand fields, execute, then advance the pc unless the instruction
	moved it itself (jumps, calls, returns, START).

	## Tasks
	Tasks are cooperative. Nothing switches tasks except START, which swaps
	the active task with the most recently spawned one. YIELD only paces the
	current task to its rate and services devices and stream sinks.

	## Streams
	A stream register names a slot in the VM-wide stream table. Each stream
	owns a single-producer single-consumer ring so a host thread, or a
	device generator, can feed it while the VM reads with SREAD.
*/

use crate::{
	config::Config,
	device::{Console, ConsoleOp, Devices, Screen, ScreenOp},
	disasm,
	error::runtime::*,
	fileio::{Capabilities, Module},
	isa::{self, Decoded, Opcode},
	ring::RingBuffer,
};
use num_traits::FromPrimitive;
use std::{path::Path, sync::Arc, thread, time::Instant};

mod memory;
mod stream;
mod task;
pub use memory::*;
pub use stream::*;
pub use task::*;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
	Halted,
	/// The screen asked to close.
	Closed,
}

enum Flow {
	Next,
	Jump(u32),
	/// The pc was already updated.
	Stay,
	Exit(Exit),
}

pub struct Runtime {
	code: Vec<u32>,
	pub memory: Memory,
	pub scheduler: Scheduler,
	pub streams: Streams,
	devices: Devices,
	initialised: Capabilities,
	screen_scale: u16,
	config: Config,
}

macro_rules! operation {
	($self:ident, $fields:expr, load $width:expr, $extend:expr) => {{ // Load
		let [d, addr, _] = $fields;
		let value: u32 = $self.memory.load($self.reg(addr), $width)?;
		$self.set(d, $extend(value));
		Ok(Flow::Next)
	}};

	($self:ident, $fields:expr, store $width:expr) => {{ // Store
		let [src, addr, _] = $fields;
		$self.memory.store($self.reg(addr), $width, $self.reg(src))?;
		Ok(Flow::Next)
	}};

	($self:ident, $fields:expr, $f:expr, F) => {{ // Float
		let [d, a, b] = $fields;
		let value: f32 = $f(f32::from_bits($self.reg(a)), f32::from_bits($self.reg(b)));
		$self.set(d, value.to_bits());
		Ok(Flow::Next)
	}};

	($self:ident, $fields:expr, $f:expr) => {{ // Integer
		let [d, a, b] = $fields;
		let value: u32 = $f($self.reg(a), $self.reg(b));
		$self.set(d, value);
		Ok(Flow::Next)
	}};
}

impl Runtime {
	/// Loads `module` and initialises the devices its capability bits ask for.
	pub fn new(module: Module, config: Config, devices: Devices) -> RuntimeResult<Self> {
		let mut runtime = Self {
			scheduler: Scheduler::new(module.entry_point as u32, &config),
			memory: Memory::new(&module.literals, config.memory_size),
			code: module.code,
			streams: Streams::new(),
			devices,
			initialised: Capabilities::NONE,
			screen_scale: 1,
			config,
		};
		runtime.init_devices(module.capabilities)?;
		Ok(runtime)
	}

	pub fn load(path: impl AsRef<Path>, config: Config, devices: Devices) -> RuntimeResult<Self> {
		Self::new(Module::read_file(path)?, config, devices)
	}

	fn init_devices(&mut self, required: Capabilities) -> RuntimeResult {
		if required.contains(Capabilities::CONSOLE) {
			let console = self
				.devices
				.console
				.as_mut()
				.filter(|c| c.is_available())
				.ok_or(RuntimeError::DeviceUnavailable("console"))?;
			if !console.init() {
				return Err(RuntimeError::DeviceInit("console"));
			}
			self.initialised.insert(Capabilities::CONSOLE);
		}
		if required.contains(Capabilities::SCREEN) {
			let screen = self
				.devices
				.screen
				.as_mut()
				.filter(|s| s.is_available())
				.ok_or(RuntimeError::DeviceUnavailable("screen"))?;
			if !screen.init() {
				return Err(RuntimeError::DeviceInit("screen"));
			}
			self.initialised.insert(Capabilities::SCREEN);
		}
		Ok(())
	}

	/// Runs until HALT, a screen close or a fault.
	pub fn exec(&mut self) -> RuntimeResult<Exit> {
		loop {
			if let Some(exit) = self.step()? {
				debug!("exit {:?} after {} task(s)", exit, self.scheduler.len());
				return Ok(exit);
			}
		}
	}

	/// Executes a single instruction of the active task.
	pub fn step(&mut self) -> RuntimeResult<Option<Exit>> {
		let pc = self.scheduler.active().pc;
		let word = *self.code.get(pc as usize).ok_or(RuntimeError::PcOutOfBounds {
			pc,
			count: self.code.len(),
		})?;
		let decoded = isa::decode(word).ok_or(RuntimeError::UnknownOpcode {
			opcode: (word >> 24) as u8,
			pc,
		})?;
		if self.config.trace {
			debug!("[{}] {:>4}  {}", self.scheduler.active().id, pc, disasm::format_decoded(&decoded));
		}

		match self.execute(pc, decoded)? {
			Flow::Next => self.scheduler.active_mut().pc = pc + 1,
			Flow::Jump(target) => self.scheduler.active_mut().pc = target,
			Flow::Stay => {}
			Flow::Exit(exit) => return Ok(Some(exit)),
		}
		Ok(None)
	}

	pub fn task(&self) -> &Task {
		self.scheduler.active()
	}

	/// Register of the active task.
	pub fn reg(&self, r: u8) -> u32 {
		self.scheduler.active().registers[r as usize]
	}

	fn set(&mut self, r: u8, value: u32) {
		self.scheduler.active_mut().registers[r as usize] = value;
	}

	pub fn flag(&self) -> bool {
		self.scheduler.active().flag
	}

	fn set_flag(&mut self, flag: bool) {
		self.scheduler.active_mut().flag = flag;
	}

	/// Ring behind stream `S<n>`, once the program has allocated it.
	pub fn stream(&self, n: u8) -> Option<Arc<RingBuffer>> {
		let reg = isa::RegisterBank::Stream.register(n as u32)?;
		self.streams.ring(reg)
	}

	fn literal(&self, offset: u8) -> RuntimeResult<u32> {
		self.memory.load(offset as u32, 4)
	}

	fn execute(&mut self, pc: u32, decoded: Decoded) -> RuntimeResult<Flow> {
		let fields = decoded.fields;
		let [x, y, z] = fields;
		match decoded.opcode {
			Opcode::Mov => {
				self.set(x, self.reg(y));
				Ok(Flow::Next)
			}
			Opcode::Movl => {
				let value = self.literal(y)?;
				self.set(x, value);
				Ok(Flow::Next)
			}
			Opcode::Ldl => {
				self.set(x, y as u32);
				Ok(Flow::Next)
			}
			Opcode::Sread => {
				let value = self.streams.get(y)?.ring.dequeue();
				self.set_flag(value.is_some());
				if let Some(value) = value {
					self.set(x, value);
				}
				Ok(Flow::Next)
			}
			Opcode::Swrite => {
				let value = self.reg(y);
				let stream = self.streams.get(x)?;
				let ok = stream.ring.enqueue(stream.mask(value));
				self.set_flag(ok);
				Ok(Flow::Next)
			}
			Opcode::Jmp => Ok(Flow::Jump(x as u32)),
			Opcode::Jmpz => Ok(if self.flag() { Flow::Jump(x as u32) } else { Flow::Next }),
			Opcode::Jmpnz => Ok(if self.flag() { Flow::Next } else { Flow::Jump(x as u32) }),
			Opcode::Nop => Ok(Flow::Next),
			Opcode::Cmp => {
				self.set_flag(self.reg(x) == self.reg(y));
				Ok(Flow::Next)
			}
			Opcode::Cmplt => {
				self.set_flag((self.reg(x) as i32) < (self.reg(y) as i32));
				Ok(Flow::Next)
			}
			Opcode::Call => {
				self.scheduler.active_mut().push(pc + 1)?;
				Ok(Flow::Jump(x as u32))
			}
			Opcode::Ret => Ok(Flow::Jump(self.scheduler.active_mut().pop()?)),
			Opcode::Halt => Ok(Flow::Exit(Exit::Halted)),
			Opcode::Add => operation!(self, fields, u32::wrapping_add),
			Opcode::Sub => operation!(self, fields, u32::wrapping_sub),
			Opcode::Mul => operation!(self, fields, u32::wrapping_mul),
			Opcode::Div => {
				let divisor = self.reg(z) as i32;
				if divisor == 0 {
					return Err(RuntimeError::DivisionByZero { pc });
				}
				self.set(x, (self.reg(y) as i32).wrapping_div(divisor) as u32);
				Ok(Flow::Next)
			}
			Opcode::And => operation!(self, fields, |a, b| a & b),
			Opcode::Or => operation!(self, fields, |a, b| a | b),
			Opcode::Xor => operation!(self, fields, |a, b| a ^ b),
			Opcode::Shl => operation!(self, fields, u32::wrapping_shl),
			Opcode::Shr => operation!(self, fields, u32::wrapping_shr),
			Opcode::Ftoi => {
				self.set(x, f32::from_bits(self.reg(y)) as i32 as u32);
				Ok(Flow::Next)
			}
			Opcode::Addf => operation!(self, fields, |a, b| a + b, F),
			Opcode::Subf => operation!(self, fields, |a, b| a - b, F),
			Opcode::Mulf => operation!(self, fields, |a, b| a * b, F),
			Opcode::Divf => operation!(self, fields, |a, b| a / b, F),
			Opcode::Itof => {
				self.set(x, (self.reg(y) as i32 as f32).to_bits());
				Ok(Flow::Next)
			}
			Opcode::Cmpltf => {
				self.set_flag(f32::from_bits(self.reg(x)) < f32::from_bits(self.reg(y)));
				Ok(Flow::Next)
			}
			Opcode::Push => {
				let value = self.reg(x);
				self.scheduler.active_mut().push(value)?;
				Ok(Flow::Next)
			}
			Opcode::Pop => {
				let value = self.scheduler.active_mut().pop()?;
				self.set(x, value);
				Ok(Flow::Next)
			}
			Opcode::Ldr => operation!(self, fields, load 4, |v| v),
			Opcode::Str => operation!(self, fields, store 4),
			Opcode::Ldrb => operation!(self, fields, load 1, |v| v),
			Opcode::Strb => operation!(self, fields, store 1),
			Opcode::Ldrh => operation!(self, fields, load 2, |v| v),
			Opcode::Strh => operation!(self, fields, store 2),
			Opcode::Ldrsb => operation!(self, fields, load 1, |v: u32| v as u8 as i8 as i32 as u32),
			Opcode::Ldrsh => operation!(self, fields, load 2, |v: u32| v as u16 as i16 as i32 as u32),
			Opcode::Spawn => {
				let rate = self.reg(x);
				let id = self.scheduler.spawn(y as u32, rate, &self.config)?;
				debug!("spawned task {} at {} running at {} Hz", id, y, rate);
				Ok(Flow::Next)
			}
			Opcode::Yield => self.yield_now(),
			Opcode::Start => {
				self.scheduler.active_mut().pc = pc + 1;
				self.scheduler.start();
				Ok(Flow::Stay)
			}
			Opcode::Console => self.console_call(x, y),
			Opcode::Screen => self.screen_call(x, y, z),
			Opcode::Stream => {
				let width = self.literal(y)?;
				self.streams.allocate(x, width, self.config.stream_capacity)?;
				Ok(Flow::Next)
			}
			Opcode::Setsf => {
				let rate = match self.literal(y)? {
					isa::SAMPLE_RATE_SENTINEL => self.config.sample_rate,
					rate => rate,
				};
				self.streams.get_mut(x)?.rate = rate;
				Ok(Flow::Next)
			}
			Opcode::Setsc => {
				let continuous = self.literal(y)? != 0;
				self.streams.get_mut(x)?.continuous = continuous;
				Ok(Flow::Next)
			}
			Opcode::Attach => self.attach(x, y, z),
		}
	}

	fn yield_now(&mut self) -> RuntimeResult<Flow> {
		if let Some(sleep) = self.scheduler.active_mut().pace(Instant::now()) {
			thread::sleep(sleep);
		}
		self.drain_sinks()?;
		if self.initialised.contains(Capabilities::SCREEN) && self.screen()?.process_events() {
			info!("screen closed");
			return Ok(Flow::Exit(Exit::Closed));
		}
		Ok(Flow::Next)
	}

	/// Moves queued values from streams into their consumers.
	fn drain_sinks(&mut self) -> RuntimeResult {
		for idx in 0..self.streams.sinks.len() {
			let sink = self.streams.sinks[idx];
			let ring = self.streams.get(sink.stream)?.ring.clone();
			let limit = match sink.block {
				0 => ring.len(),
				block => block as usize,
			};
			let console = self.console()?;
			for _ in 0..limit {
				match ring.dequeue() {
					Some(value) => {
						console.write(value as u8);
					}
					None => break,
				}
			}
		}
		Ok(())
	}

	fn console(&mut self) -> RuntimeResult<&mut Box<dyn Console>> {
		if !self.initialised.contains(Capabilities::CONSOLE) {
			return Err(RuntimeError::DeviceUnavailable("console"));
		}
		self.devices
			.console
			.as_mut()
			.ok_or(RuntimeError::DeviceUnavailable("console"))
	}

	fn screen(&mut self) -> RuntimeResult<&mut Box<dyn Screen>> {
		if !self.initialised.contains(Capabilities::SCREEN) {
			return Err(RuntimeError::DeviceUnavailable("screen"));
		}
		self.devices
			.screen
			.as_mut()
			.ok_or(RuntimeError::DeviceUnavailable("screen"))
	}

	fn console_call(&mut self, op: u8, value: u8) -> RuntimeResult<Flow> {
		let code = self.literal(op)?;
		let value = self.reg(value);
		let console = self.console()?;
		match ConsoleOp::from_u32(code) {
			Some(ConsoleOp::Write) => {
				if !console.write(value as u8) {
					warn!("console write failed");
				}
			}
			None => return Err(RuntimeError::UnknownDeviceOp { device: "console", op: code }),
		}
		Ok(Flow::Next)
	}

	fn screen_call(&mut self, op: u8, a: u8, b: u8) -> RuntimeResult<Flow> {
		let code = self.literal(op)?;
		let op = ScreenOp::from_u32(code).ok_or(RuntimeError::UnknownDeviceOp { device: "screen", op: code })?;
		let (a, b) = (self.reg(a), self.reg(b));
		if op == ScreenOp::Scale {
			self.screen()?;
			self.screen_scale = (a as u16).max(1);
			return Ok(Flow::Next);
		}

		let scale = self.screen_scale;
		let screen = self.screen()?;
		let ok = match op {
			ScreenOp::Resize => screen.resize(a as u16, b as u16, scale),
			ScreenOp::Move => screen.set_position(a as u16, b as u16),
			ScreenOp::Colour => screen.set_colour(a as u8),
			ScreenOp::Pixel => screen.draw_pixel(),
			ScreenOp::Line => screen.draw_line(a as u16, b as u16),
			ScreenOp::Rect => screen.draw_rect(a as u16, b as u16),
			ScreenOp::Fill => screen.fill(),
			ScreenOp::Palette => screen.set_palette(a as u8, b),
			ScreenOp::Font => screen.load_font(a as u16, b as u16),
			ScreenOp::Text => screen.draw_char(a as u8),
			ScreenOp::Begin => screen.begin_frame(),
			ScreenOp::End => screen.end_frame(),
			ScreenOp::Poll => {
				if screen.process_events() {
					info!("screen closed");
					return Ok(Flow::Exit(Exit::Closed));
				}
				true
			}
			ScreenOp::Scale => true,
		};
		if !ok {
			warn!("screen {:?} failed", op);
		}
		Ok(Flow::Next)
	}

	/// Wires a generator into a stream, or a stream into a consumer.
	fn attach(&mut self, from: u8, to: u8, block: u8) -> RuntimeResult<Flow> {
		let block = self.literal(block)?;
		if isa::is_generator_reg(from) && isa::is_stream_reg(to) {
			let ring = self.streams.get(to)?.ring.clone();
			match from - isa::GENERATOR_BASE {
				0 => self.screen()?.attach_pointer(ring),
				_ => return Err(RuntimeError::InvalidAttach { from, to }),
			}
		} else if isa::is_stream_reg(from) && isa::is_consumer_reg(to) {
			self.streams.get(from)?;
			match to - isa::CONSUMER_BASE {
				0 => {
					self.console()?;
					self.streams.sinks.push(Sink { stream: from, block });
				}
				_ => return Err(RuntimeError::InvalidAttach { from, to }),
			}
		} else {
			return Err(RuntimeError::InvalidAttach { from, to });
		}
		Ok(Flow::Next)
	}
}

impl Drop for Runtime {
	fn drop(&mut self) {
		if self.initialised.contains(Capabilities::CONSOLE) {
			if let Some(console) = self.devices.console.as_mut() {
				console.delete();
			}
		}
		if self.initialised.contains(Capabilities::SCREEN) {
			if let Some(screen) = self.devices.screen.as_mut() {
				screen.delete();
			}
		}
	}
}
