//! Bit-level I/O utilities for reading and writing individual bits.
//!
//! This module provides BitWriter and BitReader for the serialized tree and
//! the payload. Both operate in MSB-first (most significant bit first) order.
//!
//! # Padding Rules
//! - BitWriter: pads incomplete bytes with trailing zeros and reports how
//!   many filler bits it added
//! - BitReader: knows nothing about padding; `align` discards the rest of
//!   the current byte
//!
//! # Example
//! ```
//! use huffpack_core::bitio::{BitWriter, BitReader};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3).unwrap();  // Write 3 bits: 1, 0, 1
//! writer.write_bits(0b11, 2).unwrap();   // Write 2 bits: 1, 1
//! // Total: 10111 -> padded to 10111000
//! assert_eq!(writer.padding_bits(), 3);
//!
//! let bytes = writer.finish();
//! let mut reader = BitReader::new(&bytes[..]);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(2).unwrap(), 0b11);
//! ```

use std::io::{self, Read, Write};

use crate::error::{BitIoError, Result};

/// Writes bits MSB-first into a byte buffer.
///
/// Accumulates bits in a buffer and moves complete bytes to the output.
/// The output can be drained to a sink at any time with [`flush_to`],
/// which keeps memory bounded while streaming a payload.
///
/// # Invariants
/// - `bit_count` is always < 8
///
/// [`flush_to`]: BitWriter::flush_to
#[derive(Debug, Clone)]
pub struct BitWriter {
    /// Completed bytes not yet flushed
    bytes: Vec<u8>,
    /// Accumulator for the current partial byte (MSB-aligned)
    bit_buffer: u8,
    /// Number of bits in bit_buffer (0-7)
    bit_count: u8,
    /// Bytes already handed to a sink by `flush_to`
    flushed: u64,
}

impl BitWriter {
    /// Create a new BitWriter with empty output.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new BitWriter with room for `bytes` complete bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_buffer: 0,
            bit_count: 0,
            flushed: 0,
        }
    }

    /// Write up to 64 bits to the output.
    ///
    /// Bits are written MSB-first. For example, writing value=0b101 with count=3
    /// writes bits 1, 0, 1 in that order.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if count > 64.
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut remaining = count;
        let mut val = if count == 64 {
            value
        } else {
            value & ((1u64 << count) - 1)
        };

        while remaining > 0 {
            // How many bits fit in the current byte?
            let bits_to_write = remaining.min(8 - self.bit_count as usize);

            // Extract the top bits_to_write bits from val
            let shift = remaining - bits_to_write;
            let bits = ((val >> shift) & ((1 << bits_to_write) - 1)) as u8;

            self.bit_buffer |= bits << (8 - self.bit_count as usize - bits_to_write);
            self.bit_count += bits_to_write as u8;

            if self.bit_count == 8 {
                self.bytes.push(self.bit_buffer);
                self.bit_buffer = 0;
                self.bit_count = 0;
            }

            // Clear the bits we just wrote from val
            val &= (1u64 << shift) - 1;
            remaining -= bits_to_write;
        }

        Ok(())
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.bit_buffer |= (bit as u8) << (7 - self.bit_count);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.bytes.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Number of zero bits `finish` will append to reach a byte boundary.
    pub fn padding_bits(&self) -> u8 {
        if self.bit_count == 0 {
            0
        } else {
            8 - self.bit_count
        }
    }

    /// Move all complete bytes to `sink`, keeping the partial byte.
    pub fn flush_to<W: Write>(&mut self, sink: &mut W) -> io::Result<()> {
        if !self.bytes.is_empty() {
            sink.write_all(&self.bytes)?;
            self.flushed += self.bytes.len() as u64;
            self.bytes.clear();
        }
        Ok(())
    }

    /// Pad the partial byte with zeros and move everything to `sink`.
    ///
    /// Returns the number of padding bits that were added (0-7).
    pub fn finish_to<W: Write>(mut self, sink: &mut W) -> io::Result<u8> {
        let padding = self.padding_bits();
        self.flush_partial();
        self.flush_to(sink)?;
        Ok(padding)
    }

    /// Finish writing and return the output bytes.
    ///
    /// If there are any remaining bits in the buffer, they are padded with
    /// trailing zeros to complete the final byte. Bytes already moved out
    /// by `flush_to` are not included.
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_partial();
        self.bytes
    }

    fn flush_partial(&mut self) {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Return the number of complete bytes currently buffered.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Return the total number of bits written (including flushed bytes
    /// and the partial byte).
    pub fn bit_len(&self) -> u64 {
        (self.flushed + self.bytes.len() as u64) * 8 + self.bit_count as u64
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads bits MSB-first from a byte stream.
///
/// Holds one partially consumed byte and refills it from the underlying
/// reader only when it runs dry, so the reader never pulls a byte it does
/// not need. After `align`, `into_inner` hands back a reader positioned
/// exactly at the next unread byte.
#[derive(Debug)]
pub struct BitReader<R> {
    inner: R,
    /// Byte currently being consumed
    current: u8,
    /// Unread bits left in `current` (0-8)
    bits_left: u8,
    /// Total bits consumed so far
    position: u64,
}

impl<R: Read> BitReader<R> {
    /// Create a new BitReader over the given stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            bits_left: 0,
            position: 0,
        }
    }

    /// Create a BitReader whose first byte was already taken from `inner`.
    pub fn preloaded(inner: R, first: u8) -> Self {
        Self {
            inner,
            current: first,
            bits_left: 8,
            position: 0,
        }
    }

    /// Read a single bit (0 or 1).
    ///
    /// # Errors
    /// - `BitIoError::UnexpectedEof` if the stream is exhausted
    /// - `Error::Io` if the underlying reader fails
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bits_left == 0 {
            self.refill()?;
        }
        self.bits_left -= 1;
        self.position += 1;
        Ok((self.current >> self.bits_left) & 1 == 1)
    }

    /// Read up to 64 bits from the input, MSB-first.
    ///
    /// For example, reading 3 bits from byte 0b10110000 returns 0b101.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `BitIoError::UnexpectedEof` if not enough bits remain
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut result = 0u64;
        for _ in 0..count {
            result = (result << 1) | self.read_bit()? as u64;
        }
        Ok(result)
    }

    /// Discard the unread bits of the current byte.
    pub fn align(&mut self) {
        self.position += self.bits_left as u64;
        self.bits_left = 0;
    }

    /// Return the number of bits consumed (including bits skipped by `align`).
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Check whether the next read starts on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bits_left == 0
    }

    /// Give back the underlying reader. Unread bits of the current byte
    /// are lost; call `align` first to make that explicit.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> Result<()> {
        let mut byte = [0u8; 1];
        match self.inner.read_exact(&mut byte) {
            Ok(()) => {
                self.current = byte[0];
                self.bits_left = 8;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(BitIoError::UnexpectedEof.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
