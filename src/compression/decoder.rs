//! `Read` adapter over the block decompressor.

use std::io::{self, Read};

use super::decompress::{log_bad_input, StreamDecoder};
use crate::error::Result;

/// Decompresses bzip2 data read from the inner reader. Concatenated streams are read as one,
/// unless the decoder was made with [`single_stream`](BzDecoder::single_stream).
pub struct BzDecoder<R: Read> {
    decoder: StreamDecoder<R>,
    /// Decoded bytes not yet handed out.
    buffer: Vec<u8>,
    cursor: usize,
    total_out: u64,
}

impl<R: Read> BzDecoder<R> {
    /// Create a decoder that uses one worker per core.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_workers(reader, rayon::current_num_threads())
    }

    /// Create a decoder that decodes up to `workers` blocks at a time.
    pub fn with_workers(reader: R, workers: usize) -> Result<Self> {
        Self::build(reader, workers, true)
    }

    /// Create a decoder that reports end of file after the first stream. Input past that
    /// stream is not checked; [`into_parts`](BzDecoder::into_parts) hands it back.
    pub fn single_stream(reader: R) -> Result<Self> {
        Self::build(reader, rayon::current_num_threads(), false)
    }

    fn build(reader: R, workers: usize, multi: bool) -> Result<Self> {
        Ok(Self {
            decoder: StreamDecoder::new(reader, workers, multi)?,
            buffer: Vec::new(),
            cursor: 0,
            total_out: 0,
        })
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.decoder.bytes_in()
    }

    /// Decompressed bytes returned so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Give back the inner reader. Input it already handed over but that was not decoded is
    /// lost.
    pub fn into_inner(self) -> R {
        self.decoder.into_inner()
    }

    /// Give back the inner reader and the input read from it ahead of the decoder, which
    /// comes before whatever the reader still holds.
    pub fn into_parts(self) -> (R, Vec<u8>) {
        self.decoder.into_parts()
    }
}

impl<R: Read> Read for BzDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.cursor == self.buffer.len() {
            self.buffer.clear();
            self.cursor = 0;
            let more = self.decoder.fill(&mut self.buffer).map_err(|e| {
                log_bad_input(&e);
                io::Error::from(e)
            })?;
            if !more {
                return Ok(0);
            }
        }
        let n = buf.len().min(self.buffer.len() - self.cursor);
        buf[..n].copy_from_slice(&self.buffer[self.cursor..self.cursor + n]);
        self.cursor += n;
        self.total_out += n as u64;
        Ok(n)
    }
}
