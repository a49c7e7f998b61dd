use std::io::{Read, Write};

use log::{error, info};
use rayon::ThreadPool;

use super::compress_block::compress_block;
use super::options::{BlockSize, CompressOptions};
use super::parallel::{build_pool, run_in_order};
use crate::bitstream::bitwriter::BitWriter;
use crate::error::{Error, Result};
use crate::tools::rle1::{Block, BlockAssembler};

/// Totals reported after compressing a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressStats {
    pub blocks_written: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Compress everything `reader` yields into one bzip2 stream on `writer`, using blocks of
/// 100k times `block_size_factor` (1-9) and default settings otherwise.
pub fn compress<R: Read, W: Write>(
    reader: R,
    writer: W,
    block_size_factor: u32,
) -> Result<CompressStats> {
    let options = CompressOptions::new(BlockSize::new(block_size_factor)?);
    compress_with(reader, writer, &options)
}

/// Compress everything `reader` yields into one bzip2 stream on `writer`.
pub fn compress_with<R: Read, W: Write>(
    reader: R,
    writer: W,
    options: &CompressOptions,
) -> Result<CompressStats> {
    let result = compress_stream(reader, writer, options);
    if let Err(e) = &result {
        log_failure(e);
    }
    result
}

fn compress_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    options: &CompressOptions,
) -> Result<CompressStats> {
    let block_size = options.block_size();
    let mut assembler = BlockAssembler::new(reader, block_size.max_coded(), block_size.max_raw());
    let mut encoder = BlockEncoder::new(writer, options)?;

    // At most one block per worker is held in memory at a time.
    loop {
        let mut batch = Vec::with_capacity(options.workers());
        while batch.len() < options.workers() {
            match assembler.next_block()? {
                Some(block) => batch.push(block),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        encoder.encode(batch)?;
    }

    let (_, stats) = encoder.finish(assembler.total_in())?;
    info!(
        "Compressed {} bytes into {} bytes in {} blocks",
        stats.bytes_in, stats.bytes_out, stats.blocks_written
    );
    Ok(stats)
}

/// Compression failures other than I/O mean the engine itself went wrong.
pub(crate) fn log_failure(e: &Error) {
    if !matches!(e, Error::Io(_)) {
        error!("Internal fault while compressing ({}): {}", e.category(), e);
    }
}

/// Encodes batches of RLE1 blocks in parallel and splices them onto the stream in order.
pub(crate) struct BlockEncoder<W: Write> {
    bw: BitWriter<W>,
    pool: ThreadPool,
    iterations: usize,
    blocks_written: u64,
}

impl<W: Write> BlockEncoder<W> {
    /// Start a stream on `writer`. The header goes out with the first flush.
    pub(crate) fn new(writer: W, options: &CompressOptions) -> Result<Self> {
        Ok(Self {
            bw: BitWriter::new(writer, options.block_size().level()),
            pool: build_pool(options.workers())?,
            iterations: options.iterations(),
            blocks_written: 0,
        })
    }

    /// Encode a batch of blocks and add them to the stream in the order given.
    pub(crate) fn encode(&mut self, batch: Vec<Block>) -> Result<()> {
        let iterations = self.iterations;
        let packed = run_in_order(&self.pool, batch, |block| compress_block(&block, iterations));
        for block in packed {
            self.bw.add_block(&block?)?;
            self.blocks_written += 1;
            info!("Wrote block {}", self.blocks_written);
        }
        Ok(())
    }

    /// Hand every finished byte to the writer and flush it.
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.bw.flush()
    }

    pub(crate) fn get_mut(&mut self) -> &mut W {
        self.bw.get_mut()
    }

    /// Bytes handed to the writer so far.
    pub(crate) fn bytes_out(&self) -> u64 {
        self.bw.bytes_out()
    }

    /// Write the stream footer and return the writer with the final totals.
    pub(crate) fn finish(self, bytes_in: u64) -> Result<(W, CompressStats)> {
        let blocks_written = self.blocks_written;
        let (writer, bytes_out) = self.bw.finish()?;
        Ok((
            writer,
            CompressStats {
                blocks_written,
                bytes_in,
                bytes_out,
            },
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_input_test() {
        let mut out = Vec::new();
        let stats = compress(&b""[..], &mut out, 9).unwrap();
        assert_eq!(
            out,
            vec![0x42, 0x5A, 0x68, 0x39, 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0]
        );
        assert_eq!(stats.blocks_written, 0);
        assert_eq!(stats.bytes_in, 0);
        assert_eq!(stats.bytes_out, 14);
    }

    #[test]
    fn header_digit_test() {
        let mut out = Vec::new();
        compress(&b"abc"[..], &mut out, 3).unwrap();
        assert_eq!(&out[..4], b"BZh3");
    }

    #[test]
    fn bad_factor_test() {
        let mut out = Vec::new();
        assert!(matches!(
            compress(&b"abc"[..], &mut out, 0),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(compress(&b"abc"[..], &mut out, 10).is_err());
    }

    #[test]
    fn block_count_test() {
        // One byte more than a block holds makes two blocks.
        let data: Vec<u8> = (0..100_001_u32).map(|i| (i % 251) as u8).collect();
        let mut out = Vec::new();
        let stats = compress(data.as_slice(), &mut out, 1).unwrap();
        assert_eq!(stats.blocks_written, 2);
        assert_eq!(stats.bytes_in, 100_001);
        assert_eq!(stats.bytes_out, out.len() as u64);
    }

    #[test]
    fn workers_do_not_change_output_test() {
        let data: Vec<u8> = (0..250_000_u32).map(|i| (i * i % 61) as u8).collect();
        let mut one = Vec::new();
        let mut four = Vec::new();
        let options = CompressOptions::new(BlockSize::FASTEST);
        compress_with(data.as_slice(), &mut one, &options.clone().with_workers(1).unwrap()).unwrap();
        compress_with(data.as_slice(), &mut four, &options.with_workers(4).unwrap()).unwrap();
        assert_eq!(one, four);
    }
}
