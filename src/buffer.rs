//! Fixed-capacity byte buffer shared by the receive and transmit paths.
//!
//! One buffer per interface accumulates captured bytes and, when the interface
//! transmits, holds the encoded wire bytes while the UART drains them. It never
//! grows; writes past capacity are refused and counted so a too-long RTU frame
//! is rejected at decode time instead of being truncated.

use crate::protocol::BUFFER_CAPACITY;

/// Fixed byte array with a write count and a drain cursor
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    data: [u8; BUFFER_CAPACITY],
    count: usize,
    cursor: usize,
    dropped: usize,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0u8; BUFFER_CAPACITY],
            count: 0,
            cursor: 0,
            dropped: 0,
        }
    }

    /// Empty the buffer and rewind the drain cursor
    pub fn reset(&mut self) {
        self.count = 0;
        self.cursor = 0;
        self.dropped = 0;
    }

    /// Bytes stored so far
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn remaining(&self) -> usize {
        BUFFER_CAPACITY - self.count
    }

    pub const fn capacity(&self) -> usize {
        BUFFER_CAPACITY
    }

    /// Bytes refused because the buffer was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether any byte was refused since the last reset
    pub fn overflowed(&self) -> bool {
        self.dropped > 0
    }

    /// Append one byte; returns `false` and counts the byte if the buffer is full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.count == BUFFER_CAPACITY {
            self.dropped += 1;
            return false;
        }
        self.data[self.count] = byte;
        self.count += 1;
        true
    }

    /// Append a whole slice, all or nothing
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.remaining() {
            return false;
        }
        self.data[self.count..self.count + bytes.len()].copy_from_slice(bytes);
        self.count += bytes.len();
        true
    }

    /// Unused tail of the buffer, for reading a FIFO directly into it
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.count..]
    }

    /// Commit `n` bytes written into [`spare_mut`](Self::spare_mut)
    pub fn commit(&mut self, n: usize) {
        self.count = (self.count + n).min(BUFFER_CAPACITY);
    }

    /// Record bytes that were drained from the FIFO and thrown away
    pub fn record_dropped(&mut self, n: usize) {
        self.dropped += n;
    }

    /// Bytes not yet handed to the transmitter
    pub fn pending(&self) -> &[u8] {
        &self.data[self.cursor..self.count]
    }

    /// Advance the drain cursor after the transmitter accepted `n` bytes
    pub fn consume(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.count);
    }

    /// Whether every stored byte has been handed to the transmitter
    pub fn is_drained(&self) -> bool {
        self.cursor >= self.count
    }
}
