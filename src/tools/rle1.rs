//! Run-Length-Encoding phase 1: the block assembler.
//!
//! Reads the raw input and cuts it into blocks. Runs of 4 to 255 identical bytes are written as
//! four copies of the byte followed by a count byte (0-251) of further copies. Runs never
//! cross a block boundary. A block ends when the next run could overflow the coded capacity,
//! or when the raw byte limit is reached, whichever comes first.

use std::io::{ErrorKind, Read};

use log::debug;

use super::crc::BlockCrc;
use crate::error::{Error, Result};

/// Longest run a single RLE1 group can express.
const MAX_RUN: usize = 255;
/// Worst case coded size of one run (four bytes plus a count).
const MAX_RUN_CODED: usize = 5;

/// One RLE1 encoded block, ready for the BWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Position of the block in the stream, starting at 0.
    pub seq: u64,
    /// RLE1 coded bytes.
    pub data: Vec<u8>,
    /// Number of raw input bytes the block covers.
    pub raw_len: usize,
    /// CRC of the raw bytes.
    pub block_crc: u32,
}

/// Iterator style reader that returns RLE1 coded blocks from a source.
pub struct BlockAssembler<R> {
    source: R,
    buffer: Vec<u8>,
    cursor: usize,
    end: usize,
    data_gone: bool,
    /// Maximum coded bytes in a block.
    max_coded: usize,
    /// Maximum raw bytes in a block.
    max_raw: usize,
    seq: u64,
    total_in: u64,
}

impl<R: Read> BlockAssembler<R> {
    /// Create a block assembler. `max_coded` bounds the RLE1 output of each block and
    /// `max_raw` bounds the raw input each block consumes.
    pub fn new(source: R, max_coded: usize, max_raw: usize) -> Self {
        Self {
            source,
            buffer: vec![0; max_raw.clamp(1, 1024 * 1024)],
            cursor: 0,
            end: 0,
            data_gone: false,
            max_coded,
            max_raw,
            seq: 0,
            total_in: 0,
        }
    }

    /// Number the blocks from `seq` instead of 0.
    pub fn starting_at(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Give back the source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Raw bytes taken from the source so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Check (and refill) the buffer - true if we have data, false if there is no more.
    fn refill_buffer(&mut self) -> Result<bool> {
        if self.cursor < self.end {
            return Ok(true);
        }
        if self.data_gone {
            return Ok(false);
        }
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(0) => {
                    self.data_gone = true;
                    return Ok(false);
                }
                Ok(size) => {
                    self.cursor = 0;
                    self.end = size;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Returns the next block, or None when the source is exhausted. An empty source gives
    /// no blocks at all.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if !self.refill_buffer()? {
            return Ok(None);
        }
        let mut out: Vec<u8> = Vec::with_capacity(self.max_coded);
        let mut crc = BlockCrc::new();
        let mut raw_len = 0_usize;
        let mut run_byte = 0_u8;
        let mut run_len = 0_usize;

        while raw_len < self.max_raw && self.refill_buffer()? {
            let byte = self.buffer[self.cursor];
            if run_len > 0 && byte == run_byte && run_len < MAX_RUN {
                // Extend the current run as far as this buffer allows
                let limit = (MAX_RUN - run_len).min(self.max_raw - raw_len);
                let same = self.buffer[self.cursor..self.end]
                    .iter()
                    .take(limit)
                    .take_while(|&&b| b == run_byte)
                    .count();
                run_len += same;
                raw_len += same;
                self.cursor += same;
                continue;
            }
            if run_len > 0 {
                put_run(&mut out, &mut crc, run_byte, run_len);
                run_len = 0;
            }
            // Only start a run we know will fit
            if out.len() + MAX_RUN_CODED > self.max_coded {
                break;
            }
            run_byte = byte;
            run_len = 1;
            raw_len += 1;
            self.cursor += 1;
        }
        if run_len > 0 {
            put_run(&mut out, &mut crc, run_byte, run_len);
        }

        if out.len() > self.max_coded {
            return Err(Error::BlockOverflow {
                len: out.len(),
                capacity: self.max_coded,
            });
        }

        let block = Block {
            seq: self.seq,
            data: out,
            raw_len,
            block_crc: crc.value(),
        };
        debug!(
            "Assembled block {}: {} raw bytes, {} coded, crc {:08x}",
            block.seq,
            block.raw_len,
            block.data.len(),
            block.block_crc
        );
        self.seq += 1;
        self.total_in += raw_len as u64;
        Ok(Some(block))
    }
}

/// Write one run in RLE1 form and fold it into the block crc.
fn put_run(out: &mut Vec<u8>, crc: &mut BlockCrc, byte: u8, len: usize) {
    crc.update_run(byte, len);
    if len < 4 {
        out.extend(std::iter::repeat(byte).take(len));
    } else {
        out.extend_from_slice(&[byte; 4]);
        out.push((len - 4) as u8);
    }
}

impl<R: Read> Iterator for BlockAssembler<R> {
    type Item = Result<Block>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

/// Expand RLE1 coded data, appending to `out`. A group of four identical bytes is always
/// followed by a count byte, except at the very end of the data.
pub fn rle1_decode(data: &[u8], out: &mut Vec<u8>) {
    let mut last: Option<u8> = None;
    let mut run = 0;
    for &byte in data {
        if run == 4 {
            if let Some(b) = last {
                out.extend(std::iter::repeat(b).take(byte as usize));
            }
            run = 0;
            continue;
        }
        if Some(byte) == last {
            run += 1;
        } else {
            last = Some(byte);
            run = 1;
        }
        out.push(byte);
    }
}
