use super::Console;
use std::io::{self, BufWriter, Stdout, Write};
use std::sync::{Arc, Mutex};

/// Writes console output to the process's stdout, flushing on newlines.
#[derive(Default)]
pub struct StdoutConsole {
    out: Option<BufWriter<Stdout>>,
}

impl StdoutConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for StdoutConsole {
    fn init(&mut self) -> bool {
        self.out = Some(BufWriter::new(io::stdout()));
        true
    }

    fn write(&mut self, byte: u8) -> bool {
        let Some(out) = self.out.as_mut() else {
            return false;
        };
        if out.write_all(&[byte]).is_err() {
            return false;
        }
        byte != b'\n' || out.flush().is_ok()
    }

    fn delete(&mut self) -> bool {
        self.out.take().map_or(true, |mut out| out.flush().is_ok())
    }
}

/// Collects console output in memory. Clones share the same buffer.
#[derive(Default, Clone)]
pub struct BufferConsole {
    output: Arc<Mutex<Vec<u8>>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.output.lock().map(|out| out.clone()).unwrap_or_default()
    }

    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Console for BufferConsole {
    fn init(&mut self) -> bool {
        true
    }

    fn write(&mut self, byte: u8) -> bool {
        match self.output.lock() {
            Ok(mut out) => {
                out.push(byte);
                true
            }
            Err(_) => false,
        }
    }
}
