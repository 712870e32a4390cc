use std::path::PathBuf;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_STACK_SIZE: usize = 4096;
pub const DEFAULT_MEMORY_SIZE: usize = 32 * 1024;
pub const DEFAULT_STREAM_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_TASKS: usize = 32;

/// Runtime knobs. Every field has a default so hosts only set what they need.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Value of the `SR` register and the rate used by `@stream ... SR`.
    pub sample_rate: u32,
    /// Per-task stack depth in words.
    pub stack_size: usize,
    /// Scratch bytes appended after the literal pool.
    pub memory_size: usize,
    /// Slots allocated for each stream's ring.
    pub stream_capacity: usize,
    pub max_tasks: usize,
    /// Log every executed instruction at debug level.
    pub trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            stack_size: DEFAULT_STACK_SIZE,
            memory_size: DEFAULT_MEMORY_SIZE,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            max_tasks: DEFAULT_MAX_TASKS,
            trace: false,
        }
    }
}

impl Config {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblerOptions {
    /// Searched in order after the including file's directory.
    pub include_paths: Vec<PathBuf>,
}

impl AssemblerOptions {
    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }
}
