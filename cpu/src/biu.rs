//! The bus interface unit: instruction prefetch, and every memory and
//! port access made by the execution unit.
use std::collections::VecDeque;

use tracing::{event, Level};

use base::source::ByteSource;
use base::width::Width;

use crate::decoded::QueueError;
use crate::io::{DeviceManager, UnattachedPort};
use crate::locator::{CodeAddress, MemoryLocator};
use crate::memory::MemoryUnit;

/// A bounded FIFO of instruction bytes fetched ahead of execution.
#[derive(Debug)]
pub struct PrefetchQueue {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl PrefetchQueue {
    pub fn new(capacity: usize) -> PrefetchQueue {
        PrefetchQueue {
            bytes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push_byte(&mut self, b: u8) -> Result<(), QueueError> {
        if self.bytes.len() >= self.capacity {
            Err(QueueError::Full)
        } else {
            self.bytes.push_back(b);
            Ok(())
        }
    }

    /// The byte `index` places from the head, without removing it.
    pub fn peek(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop_front()
    }

    /// Removes up to `n` bytes from the head.
    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.bytes.len());
        self.bytes.drain(..n);
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free(&self) -> usize {
        self.capacity - self.bytes.len()
    }
}

#[derive(Debug)]
pub struct BusInterfaceUnit {
    pub memory: MemoryUnit,
    pub devices: DeviceManager,
    queue: PrefetchQueue,
    fetch_chunk: usize,
    /// Where the byte at the head of the queue came from.
    queue_head: CodeAddress,
}

impl BusInterfaceUnit {
    pub fn new(
        memory: MemoryUnit,
        devices: DeviceManager,
        prefetch_capacity: usize,
        fetch_chunk: usize,
    ) -> BusInterfaceUnit {
        BusInterfaceUnit {
            memory,
            devices,
            queue: PrefetchQueue::new(prefetch_capacity),
            fetch_chunk: fetch_chunk.max(1),
            queue_head: CodeAddress::default(),
        }
    }

    pub fn queue(&self) -> &PrefetchQueue {
        &self.queue
    }

    /// Empties the prefetch queue.  The next fetch starts afresh at
    /// whatever address it is given.
    pub fn reset_queue(&mut self) {
        if !self.queue.is_empty() {
            event!(
                Level::TRACE,
                "discarding {} prefetched bytes at {:#07X}",
                self.queue.len(),
                self.queue_head.address()
            );
        }
        self.queue.reset();
    }

    /// Tops up the prefetch queue with the bytes which follow `at`,
    /// the address of the next instruction, in whole chunks.  Does
    /// not change the instruction pointer.  Fetching stops early at
    /// the end of populated memory.
    pub fn fetch_instructions(&mut self, at: CodeAddress) -> Result<(), QueueError> {
        if self.queue.is_empty() || self.queue_head != at {
            self.queue.reset();
            self.queue_head = at;
        }
        while self.queue.free() >= self.fetch_chunk {
            for _ in 0..self.fetch_chunk {
                let next = self.next_fetch_address();
                match self.memory.fetch_byte(next) {
                    Some(b) => {
                        event!(Level::TRACE, "prefetched {b:#04X} from {next:#07X}");
                        self.queue.push_byte(b)?;
                    }
                    None => return Ok(()),
                }
            }
        }
        Ok(())
    }

    fn next_fetch_address(&self) -> u32 {
        self.queue_head.offset_by(self.queue.len()).address()
    }

    /// Removes the `length` bytes of the instruction just decoded
    /// from the head of the instruction stream.
    pub fn consume(&mut self, length: usize) {
        self.queue.discard(length);
        self.queue_head = self.queue_head.offset_by(length);
    }

    pub fn read(&self, width: Width, at: MemoryLocator) -> u16 {
        let lo = u16::from(self.memory.read_byte(at.address()));
        match width {
            Width::Byte => lo,
            Width::Word => {
                // The high byte wraps within the segment.
                let hi = u16::from(self.memory.read_byte(at.offset_by(1).address()));
                lo | (hi << 8)
            }
        }
    }

    pub fn write(&mut self, width: Width, at: MemoryLocator, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.memory.write_byte(at.address(), lo);
        if width == Width::Word {
            self.memory.write_byte(at.offset_by(1).address(), hi);
        }
    }

    /// Pushes a word, pre-decrementing the stack locator.
    pub fn push(&mut self, stack: &mut MemoryLocator, value: u16) {
        stack.decrement(2);
        self.write(Width::Word, *stack, value);
    }

    /// Pops a word, post-incrementing the stack locator.
    pub fn pop(&mut self, stack: &mut MemoryLocator) -> u16 {
        let value = self.read(Width::Word, *stack);
        stack.increment(2);
        value
    }

    pub fn port_in(&mut self, width: Width, port: u16) -> Result<u16, UnattachedPort> {
        self.devices.port_in(width, port)
    }

    pub fn port_out(&mut self, width: Width, port: u16, value: u16) -> Result<(), UnattachedPort> {
        self.devices.port_out(width, port, value)
    }
}

/// Instruction bytes are read from the head of the prefetch queue;
/// an instruction longer than what has been prefetched is completed
/// from memory.
impl ByteSource for BusInterfaceUnit {
    fn byte_at(&mut self, index: usize) -> Option<u8> {
        match self.queue.peek(index) {
            Some(b) => Some(b),
            None => self
                .memory
                .fetch_byte(self.queue_head.offset_by(index).address()),
        }
    }
}
