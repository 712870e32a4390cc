//! Lock-free single-producer single-consumer ring of 32-bit words.
//!
//! One thread may call [`RingBuffer::enqueue`] while another calls
//! [`RingBuffer::dequeue`]; neither blocks. One slot is always kept empty so
//! a ring of capacity `n` holds at most `n - 1` values.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct RingBuffer {
    head: AtomicUsize,
    tail: AtomicUsize,
    slots: Box<[AtomicU32]>,
}

impl RingBuffer {
    /// Capacities below two are raised to two.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Producer side. Returns `false` and leaves the ring untouched when full.
    pub fn enqueue(&self, value: u32) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity() - 1 {
            return false;
        }
        self.slots[tail % self.capacity()].store(value, Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Consumer side. `None` when empty.
    pub fn dequeue(&self) -> Option<u32> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let value = self.slots[head % self.capacity()].load(Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity() - 1
    }

    /// Snapshot of the number of queued values.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }
}
