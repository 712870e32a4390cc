/*
    # Devices
    Programs talk to the host through two devices. The console is a byte
    sink, the screen a palette framebuffer with a pen position. A module
    names the devices it uses in its capability bits and the runtime refuses
    to start when a required device is missing or fails to initialise.

    Backends implement [Console] and [Screen]; the runtime only sees the
    trait objects held in [Devices].
*/

use crate::ring::RingBuffer;
use num_derive::FromPrimitive;
use std::sync::Arc;

mod console;
mod screen;
pub use console::*;
pub use screen::*;

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum ConsoleOp {
    Write = 0,
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum ScreenOp {
    Resize = 0,
    Move,
    Colour,
    Pixel,
    Line,
    Rect,
    Fill,
    Palette,
    Font,
    Text,
    Begin,
    End,
    Poll,
    Scale,
}

impl ConsoleOp {
    pub fn from_name(name: &str) -> Option<(ConsoleOp, usize)> {
        match name {
            "write" => Some((ConsoleOp::Write, 1)),
            _ => None,
        }
    }
}

impl ScreenOp {
    /// Operation for a `.Screen/<name>` call, with the number of registers it reads.
    pub fn from_name(name: &str) -> Option<(ScreenOp, usize)> {
        Some(match name {
            "resize" => (ScreenOp::Resize, 2),
            "move" => (ScreenOp::Move, 2),
            "colour" => (ScreenOp::Colour, 1),
            "pixel" => (ScreenOp::Pixel, 0),
            "line" => (ScreenOp::Line, 2),
            "rect" => (ScreenOp::Rect, 2),
            "fill" => (ScreenOp::Fill, 0),
            "palette" => (ScreenOp::Palette, 2),
            "font" => (ScreenOp::Font, 2),
            "text" => (ScreenOp::Text, 1),
            "begin" => (ScreenOp::Begin, 0),
            "end" => (ScreenOp::End, 0),
            "poll" => (ScreenOp::Poll, 0),
            "scale" => (ScreenOp::Scale, 1),
            _ => return None,
        })
    }
}

pub trait Console {
    fn is_available(&self) -> bool {
        true
    }
    fn init(&mut self) -> bool;
    fn write(&mut self, byte: u8) -> bool;
    fn delete(&mut self) -> bool {
        true
    }
}

pub trait Screen {
    fn is_available(&self) -> bool {
        true
    }
    fn init(&mut self) -> bool;
    fn delete(&mut self) -> bool {
        true
    }

    fn resize(&mut self, width: u16, height: u16, scale: u16) -> bool;
    fn set_position(&mut self, x: u16, y: u16) -> bool;
    fn set_colour(&mut self, index: u8) -> bool;
    fn draw_pixel(&mut self) -> bool;
    fn draw_line(&mut self, x: u16, y: u16) -> bool;
    fn draw_rect(&mut self, width: u16, height: u16) -> bool;
    fn fill(&mut self) -> bool;
    fn set_palette(&mut self, index: u8, rgb: u32) -> bool;
    fn load_font(&mut self, width: u16, height: u16) -> bool;
    fn draw_char(&mut self, ch: u8) -> bool;
    fn begin_frame(&mut self) -> bool;
    fn end_frame(&mut self) -> bool;

    /// Pumps host events. Returns `true` once the user asked to close.
    fn process_events(&mut self) -> bool;

    /// Route pointer motion into `ring` as `x << 16 | y` words.
    fn attach_pointer(&mut self, ring: Arc<RingBuffer>);
}

pub fn pack_pointer(x: u16, y: u16) -> u32 {
    (x as u32) << 16 | y as u32
}

/// Backends handed to the runtime.
#[derive(Default)]
pub struct Devices {
    pub console: Option<Box<dyn Console>>,
    pub screen: Option<Box<dyn Screen>>,
}

impl Devices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Some(Box::new(console));
        self
    }

    pub fn with_screen(mut self, screen: impl Screen + 'static) -> Self {
        self.screen = Some(Box::new(screen));
        self
    }
}
