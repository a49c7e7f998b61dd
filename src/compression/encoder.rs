//! `Write` adapter over the block compressor.

use std::io::{self, Write};

use super::compress::{log_failure, BlockEncoder};
use super::options::{BlockSize, CompressOptions};
use crate::error::Result;
use crate::tools::rle1::BlockAssembler;

/// Compresses everything written to it into one bzip2 stream on the inner writer.
///
/// Call [`finish`](BzEncoder::finish) to write the end of stream and get the writer back.
/// Dropping an unfinished encoder finishes it too, but any error is lost.
///
/// [`flush`](Write::flush) ends the block being filled, so everything written so far can be
/// decoded from the inner writer except for the last few bits. Flushing often costs
/// compression.
pub struct BzEncoder<W: Write> {
    inner: Option<BlockEncoder<W>>,
    options: CompressOptions,
    /// Raw bytes not yet cut into blocks.
    pending: Vec<u8>,
    /// Sequence number of the next block.
    next_seq: u64,
    total_in: u64,
    total_out: u64,
}

impl<W: Write> BzEncoder<W> {
    /// Create an encoder writing blocks of the given size to `writer`.
    pub fn new(writer: W, block_size: BlockSize) -> Result<Self> {
        Self::with_options(writer, CompressOptions::new(block_size))
    }

    /// Create an encoder with full compression settings.
    pub fn with_options(writer: W, options: CompressOptions) -> Result<Self> {
        Ok(Self {
            inner: Some(BlockEncoder::new(writer, &options)?),
            options,
            pending: Vec::new(),
            next_seq: 0,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Raw bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Compressed bytes handed to the inner writer so far.
    pub fn total_out(&self) -> u64 {
        match &self.inner {
            Some(encoder) => encoder.bytes_out(),
            None => self.total_out,
        }
    }

    /// Encode the blocks in `pending`. Unless this is the end of the input, the last block is
    /// held back: more input may still extend it.
    fn encode_pending(&mut self, at_end: bool) -> Result<()> {
        let Some(encoder) = self.inner.as_mut() else {
            return Ok(());
        };
        let block_size = self.options.block_size();
        let assembler = BlockAssembler::new(
            self.pending.as_slice(),
            block_size.max_coded(),
            block_size.max_raw(),
        )
        .starting_at(self.next_seq);
        let mut blocks = assembler.collect::<Result<Vec<_>>>()?;
        if !at_end {
            blocks.pop();
        }
        let used: usize = blocks.iter().map(|b| b.raw_len).sum();
        self.next_seq += blocks.len() as u64;
        let mut blocks = blocks.into_iter().peekable();
        while blocks.peek().is_some() {
            let batch: Vec<_> = blocks.by_ref().take(self.options.workers()).collect();
            encoder.encode(batch)?;
        }
        self.pending.drain(..used);
        Ok(())
    }

    /// Close the block being filled and push all whole bytes to the inner writer.
    fn flush_stream(&mut self) -> Result<()> {
        self.encode_pending(true)?;
        match self.inner.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }

    fn finish_stream(&mut self) -> Result<W> {
        self.encode_pending(true)?;
        let encoder = self
            .inner
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "encoder already finished"))?;
        let (writer, stats) = encoder.finish(self.total_in)?;
        self.total_out = stats.bytes_out;
        Ok(writer)
    }

    /// Write the end of stream and return the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.finish_stream().map_err(|e| {
            log_failure(&e);
            e
        })
    }
}

impl<W: Write> Write for BzEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.inner.is_none() {
            return Err(io::Error::new(io::ErrorKind::Other, "encoder already finished"));
        }
        self.pending.extend_from_slice(buf);
        self.total_in += buf.len() as u64;
        // Keep a batch for every worker plus the block being filled.
        let threshold = self.options.block_size().max_raw() * (self.options.workers() + 1);
        if self.pending.len() >= threshold {
            self.encode_pending(false).map_err(|e| {
                log_failure(&e);
                io::Error::from(e)
            })?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_stream().map_err(|e| {
            log_failure(&e);
            io::Error::from(e)
        })
    }
}

impl<W: Write> Drop for BzEncoder<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(e) = self.finish_stream() {
                log_failure(&e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::compress::compress;
    use crate::compression::decompress::decompress;

    #[test]
    fn matches_compress_test() {
        let data: Vec<u8> = (0..350_000_u32).map(|i| (i / 7 % 13) as u8 + b'a').collect();
        let mut expected = Vec::new();
        compress(data.as_slice(), &mut expected, 1).unwrap();

        let mut encoder = BzEncoder::new(Vec::new(), BlockSize::FASTEST).unwrap();
        for chunk in data.chunks(12_345) {
            encoder.write_all(chunk).unwrap();
        }
        assert_eq!(encoder.total_in(), data.len() as u64);
        let out = encoder.finish().unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn empty_test() {
        let encoder = BzEncoder::new(Vec::new(), BlockSize::BEST).unwrap();
        let out = encoder.finish().unwrap();
        assert_eq!(out.len(), 14);
        assert_eq!(&out[..4], b"BZh9");
    }

    #[test]
    fn flush_ends_block_test() {
        let mut out = Vec::new();
        let mut encoder = BzEncoder::new(&mut out, BlockSize::FASTEST).unwrap();
        encoder.write_all(b"interactive message\n").unwrap();
        encoder.flush().unwrap();
        let flushed = encoder.total_out();
        // Header, block magic and crc at least.
        assert!(flushed > 14);

        // Nothing new to close, so a second flush writes nothing.
        encoder.flush().unwrap();
        assert_eq!(encoder.total_out(), flushed);

        encoder.write_all(b"and a reply\n").unwrap();
        encoder.flush().unwrap();
        assert!(encoder.total_out() > flushed);
        encoder.write_all(b"bye\n").unwrap();
        encoder.finish().unwrap();

        let mut plain = Vec::new();
        let stats = decompress(out.as_slice(), &mut plain).unwrap();
        assert_eq!(plain, b"interactive message\nand a reply\nbye\n");
        assert_eq!(stats.blocks_read, 3);
    }

    #[test]
    fn flush_reaches_inner_writer_test() {
        let mut encoder = BzEncoder::new(Vec::new(), BlockSize::BEST).unwrap();
        encoder.write_all(b"interactive message\n").unwrap();
        encoder.flush().unwrap();
        let out = encoder.finish().unwrap();
        let mut plain = Vec::new();
        decompress(out.as_slice(), &mut plain).unwrap();
        assert_eq!(plain, b"interactive message\n");
    }

    #[test]
    fn drop_finishes_test() {
        let mut out = Vec::new();
        {
            let mut encoder = BzEncoder::new(&mut out, BlockSize::FASTEST).unwrap();
            encoder.write_all(b"hello world\n").unwrap();
        }
        let mut plain = Vec::new();
        decompress(out.as_slice(), &mut plain).unwrap();
        assert_eq!(plain, b"hello world\n");
    }
}
