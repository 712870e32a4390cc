use crate::{config::Config, error::runtime::*, isa};
use std::time::{Duration, Instant};

/// A cooperative task: its own program counter, register file, stack,
/// comparison flag and target rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
	pub id: usize,
	pub pc: u32,
	pub registers: Box<[u32]>,
	pub stack: Vec<u32>,
	stack_size: usize,
	pub flag: bool,
	/// YIELDs per second, 0 for unbounded.
	pub rate: u32,
	last_yield: Option<Instant>,
}

impl Task {
	pub fn new(id: usize, pc: u32, rate: u32, config: &Config) -> Self {
		let mut registers = vec![0; isa::REGISTER_COUNT].into_boxed_slice();
		registers[isa::SAMPLE_RATE_REG as usize] = config.sample_rate;
		Self {
			id,
			pc,
			registers,
			stack: Vec::new(),
			stack_size: config.stack_size,
			flag: false,
			rate,
			last_yield: None,
		}
	}

	pub fn push(&mut self, value: u32) -> RuntimeResult {
		if self.stack.len() >= self.stack_size {
			return Err(RuntimeError::StackOverflow { task: self.id });
		}
		self.stack.push(value);
		Ok(())
	}

	pub fn pop(&mut self) -> RuntimeResult<u32> {
		self.stack
			.pop()
			.ok_or(RuntimeError::StackUnderflow { task: self.id })
	}

	/// How long to sleep at a YIELD so the task runs at most `rate` times a
	/// second. The first yield only starts the clock.
	pub fn pace(&mut self, now: Instant) -> Option<Duration> {
		if self.rate == 0 {
			return None;
		}
		let period = Duration::from_secs_f64(1.0 / self.rate as f64);
		let sleep = self
			.last_yield
			.and_then(|last| period.checked_sub(now.saturating_duration_since(last)))
			.filter(|d| !d.is_zero());
		self.last_yield = Some(now + sleep.unwrap_or_default());
		sleep
	}
}

/// Owns every task and knows which one is running. SPAWN records the new
/// task as the partner; START swaps the running task with its partner.
#[derive(Debug, Clone)]
pub struct Scheduler {
	tasks: Vec<Task>,
	active: usize,
	partner: Option<usize>,
	max_tasks: usize,
}

impl Scheduler {
	/// Starts with the main task at `entry`.
	pub fn new(entry: u32, config: &Config) -> Self {
		Self {
			tasks: vec![Task::new(0, entry, 0, config)],
			active: 0,
			partner: None,
			max_tasks: config.max_tasks.max(1),
		}
	}

	pub fn active(&self) -> &Task {
		&self.tasks[self.active]
	}

	pub fn active_mut(&mut self) -> &mut Task {
		&mut self.tasks[self.active]
	}

	pub fn task(&self, id: usize) -> Option<&Task> {
		self.tasks.get(id)
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	pub fn spawn(&mut self, pc: u32, rate: u32, config: &Config) -> RuntimeResult<usize> {
		if self.tasks.len() >= self.max_tasks {
			return Err(RuntimeError::TaskLimit(self.max_tasks));
		}
		let id = self.tasks.len();
		self.tasks.push(Task::new(id, pc, rate, config));
		self.partner = Some(id);
		Ok(id)
	}

	/// Swap in the partner task. `false` when nothing has been spawned.
	pub fn start(&mut self) -> bool {
		match self.partner {
			Some(partner) => {
				self.partner = Some(self.active);
				self.active = partner;
				true
			}
			None => false,
		}
	}
}
