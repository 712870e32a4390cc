use super::{pack_pointer, Screen};
use crate::ring::RingBuffer;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ScreenState {
    pub width: u16,
    pub height: u16,
    pub scale: u16,
    /// Palette index per pixel, row major.
    pub pixels: Vec<u8>,
    pub pen: (u16, u16),
    pub colour: u8,
    pub palette: Vec<u32>,
    pub font: (u16, u16),
    pub frames: usize,
    pub in_frame: bool,
    closed: bool,
    pointer: Option<Arc<RingBuffer>>,
}

impl ScreenState {
    fn put(&mut self, x: u16, y: u16) {
        if x < self.width && y < self.height {
            let idx = y as usize * self.width as usize + x as usize;
            self.pixels[idx] = self.colour;
        }
    }

    fn line(&mut self, to: (u16, u16)) {
        let (mut x, mut y) = (self.pen.0 as i32, self.pen.1 as i32);
        let (x1, y1) = (to.0 as i32, to.1 as i32);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x as u16, y as u16);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        self.pen = to;
    }

    fn rect(&mut self, width: u16, height: u16) {
        let (x0, y0) = self.pen;
        for y in y0..y0.saturating_add(height).min(self.height) {
            for x in x0..x0.saturating_add(width).min(self.width) {
                self.put(x, y);
            }
        }
    }
}

/// Framebuffer screen with no window. Clones share state, so a test or host
/// thread can inspect pixels, inject pointer motion or request close.
#[derive(Debug, Default, Clone)]
pub struct HeadlessScreen {
    state: Arc<Mutex<ScreenState>>,
}

impl HeadlessScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<MutexGuard<'_, ScreenState>> {
        self.state.lock().ok()
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<u8> {
        let state = self.state()?;
        if x >= state.width || y >= state.height {
            return None;
        }
        state
            .pixels
            .get(y as usize * state.width as usize + x as usize)
            .copied()
    }

    pub fn request_close(&self) {
        if let Some(mut state) = self.state() {
            state.closed = true;
        }
    }

    /// Feeds pointer motion to the attached generator. `false` when nothing
    /// is attached or the ring is full.
    pub fn inject_pointer(&self, x: u16, y: u16) -> bool {
        let ring = match self.state() {
            Some(state) => state.pointer.clone(),
            None => None,
        };
        ring.map_or(false, |ring| ring.enqueue(pack_pointer(x, y)))
    }

    fn with<F: FnOnce(&mut ScreenState)>(&mut self, f: F) -> bool {
        match self.state.lock() {
            Ok(mut state) => {
                f(&mut state);
                true
            }
            Err(_) => false,
        }
    }
}

impl Screen for HeadlessScreen {
    fn init(&mut self) -> bool {
        self.with(|s| {
            s.scale = 1;
            s.palette = vec![0; 256];
            s.font = (8, 8);
        })
    }

    fn resize(&mut self, width: u16, height: u16, scale: u16) -> bool {
        self.with(|s| {
            s.width = width;
            s.height = height;
            s.scale = scale.max(1);
            s.pixels = vec![0; width as usize * height as usize];
        })
    }

    fn set_position(&mut self, x: u16, y: u16) -> bool {
        self.with(|s| s.pen = (x, y))
    }

    fn set_colour(&mut self, index: u8) -> bool {
        self.with(|s| s.colour = index)
    }

    fn draw_pixel(&mut self) -> bool {
        self.with(|s| s.put(s.pen.0, s.pen.1))
    }

    fn draw_line(&mut self, x: u16, y: u16) -> bool {
        self.with(|s| s.line((x, y)))
    }

    fn draw_rect(&mut self, width: u16, height: u16) -> bool {
        self.with(|s| s.rect(width, height))
    }

    fn fill(&mut self) -> bool {
        self.with(|s| {
            let colour = s.colour;
            s.pixels.iter_mut().for_each(|p| *p = colour);
        })
    }

    fn set_palette(&mut self, index: u8, rgb: u32) -> bool {
        self.with(|s| {
            if let Some(entry) = s.palette.get_mut(index as usize) {
                *entry = rgb & 0x00FF_FFFF;
            }
        })
    }

    fn load_font(&mut self, width: u16, height: u16) -> bool {
        self.with(|s| s.font = (width.max(1), height.max(1)))
    }

    // No glyphs here, printable characters draw as a solid cell.
    fn draw_char(&mut self, ch: u8) -> bool {
        self.with(|s| {
            let (w, h) = s.font;
            if ch == b'\n' {
                s.pen = (0, s.pen.1.saturating_add(h));
                return;
            }
            if ch.is_ascii_graphic() {
                s.rect(w, h);
            }
            s.pen.0 = s.pen.0.saturating_add(w);
        })
    }

    fn begin_frame(&mut self) -> bool {
        self.with(|s| s.in_frame = true)
    }

    fn end_frame(&mut self) -> bool {
        self.with(|s| {
            s.in_frame = false;
            s.frames += 1;
        })
    }

    fn process_events(&mut self) -> bool {
        self.state().map_or(true, |s| s.closed)
    }

    fn attach_pointer(&mut self, ring: Arc<RingBuffer>) {
        self.with(|s| s.pointer = Some(ring));
    }
}
