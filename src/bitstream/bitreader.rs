//! BitReader: reads the packed bitstream of a compressed file, most significant bit first.
//!
//! Reads from any source that implements `Read`. Bits are pulled from a 1Mbyte buffer into a
//! small accumulator, so callers can ask for up to 32 bits at a time. Running out of input in
//! the middle of a read is reported as `Error::TruncatedStream`.

use std::io::{ErrorKind, Read};

use crate::error::{Error, Result};

const BUFFER_SIZE: usize = 1024 * 1024;

/// Reads a binary bzip2 stream.
#[derive(Debug)]
pub struct BitReader<R> {
    buffer: Vec<u8>,
    /// Next unread byte in the buffer.
    cursor: usize,
    /// Number of valid bytes in the buffer.
    end: usize,
    /// Bits waiting to be handed out. Only the lowest `acc_bits` bits are meaningful.
    acc: u64,
    acc_bits: u32,
    /// Bytes moved from the buffer into the accumulator.
    consumed: u64,
    source: R,
}

impl<R: Read> BitReader<R> {
    /// Creates a new BitReader (with a 1Mbyte buffer).
    pub fn new(source: R) -> Self {
        Self::with_capacity(BUFFER_SIZE, source)
    }

    /// Creates a new BitReader with a buffer of `size` bytes.
    pub fn with_capacity(size: usize, source: R) -> Self {
        Self {
            buffer: vec![0; size.max(1)],
            cursor: 0,
            end: 0,
            acc: 0,
            acc_bits: 0,
            consumed: 0,
            source,
        }
    }

    /// Refill the buffer. Returns false if the source has no more data.
    fn have_data(&mut self) -> Result<bool> {
        if self.cursor < self.end {
            return Ok(true);
        }
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(size) => {
                    self.cursor = 0;
                    self.end = size;
                    return Ok(size > 0);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Make sure at least `n` bits sit in the accumulator.
    fn need(&mut self, n: u32) -> Result<()> {
        while self.acc_bits < n {
            if !self.have_data()? {
                return Err(Error::TruncatedStream);
            }
            self.acc = self.acc << 8 | self.buffer[self.cursor] as u64;
            self.cursor += 1;
            self.acc_bits += 8;
            self.consumed += 1;
        }
        Ok(())
    }

    /// Return the next `n` bits (0-32) as a u32.
    pub fn bint(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 32);
        if n == 0 {
            return Ok(0);
        }
        self.need(n)?;
        self.acc_bits -= n;
        let value = (self.acc >> self.acc_bits) & (u64::MAX >> (64 - n));
        Ok(value as u32)
    }

    /// Return the next bit (1 or 0).
    pub fn bit(&mut self) -> Result<u32> {
        self.bint(1)
    }

    /// Return *true* if the next bit is 1, *false* if 0, consuming the bit.
    pub fn bool_bit(&mut self) -> Result<bool> {
        Ok(self.bint(1)? == 1)
    }

    /// Return the next 8 bits as a byte.
    pub fn byte(&mut self) -> Result<u8> {
        Ok(self.bint(8)? as u8)
    }

    /// Return the next `n` bytes.
    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        (0..n).map(|_| self.byte()).collect()
    }

    /// Count one-bits up to the next zero-bit, consuming the zero. Stops early (without
    /// consuming a zero) once `limit` ones have been read.
    pub fn read_unary(&mut self, limit: u32) -> Result<u32> {
        let mut count = 0;
        while count < limit {
            if !self.bool_bit()? {
                return Ok(count);
            }
            count += 1;
        }
        Ok(count)
    }

    /// Skip the padding bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        self.acc_bits -= self.acc_bits % 8;
    }

    /// True if any input remains, whether buffered or still in the source.
    pub fn has_more(&mut self) -> Result<bool> {
        if self.acc_bits > 0 {
            return Ok(true);
        }
        self.have_data()
    }

    /// Whole bytes consumed from the source so far. A partly read byte counts as consumed.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed - (self.acc_bits / 8) as u64
    }

    /// Give back the source. Buffered bytes that were not read are lost.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Give back the source along with the whole bytes taken from it but not yet read. Bits
    /// left over from a partly read byte are dropped.
    pub fn into_parts(self) -> (R, Vec<u8>) {
        let whole = (self.acc_bits / 8) as usize;
        let mut rest: Vec<u8> = (0..whole).rev().map(|i| (self.acc >> (8 * i)) as u8).collect();
        rest.extend_from_slice(&self.buffer[self.cursor..self.end]);
        (self.source, rest)
    }

    /// Debugging function. Report current position in the stream as bytes.bits
    pub fn loc(&self) -> String {
        let bits = self.consumed * 8 - self.acc_bits as u64;
        format!("[{}.{}]", bits / 8, bits % 8)
    }
}
