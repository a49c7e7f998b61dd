//! `Read` adapter that compresses the bytes of an inner reader.

use std::io::{self, Read};

use super::compress::{log_failure, BlockEncoder};
use super::options::{BlockSize, CompressOptions};
use crate::error::Result;
use crate::tools::rle1::BlockAssembler;

/// Reads uncompressed data from the inner reader and hands out one bzip2 stream.
///
/// Blocks are compressed a batch at a time, one block per worker, as the caller reads.
pub struct BzCompressReader<R: Read> {
    assembler: BlockAssembler<R>,
    /// None once the end of stream has been written.
    encoder: Option<BlockEncoder<Vec<u8>>>,
    workers: usize,
    /// Compressed bytes not yet handed out.
    buffer: Vec<u8>,
    cursor: usize,
    total_out: u64,
}

impl<R: Read> BzCompressReader<R> {
    /// Create a compressor that reads from `reader`, using blocks of the given size.
    pub fn new(reader: R, block_size: BlockSize) -> Result<Self> {
        Self::with_options(reader, CompressOptions::new(block_size))
    }

    /// Create a compressor with full compression settings.
    pub fn with_options(reader: R, options: CompressOptions) -> Result<Self> {
        let block_size = options.block_size();
        Ok(Self {
            assembler: BlockAssembler::new(reader, block_size.max_coded(), block_size.max_raw()),
            encoder: Some(BlockEncoder::new(Vec::new(), &options)?),
            workers: options.workers(),
            buffer: Vec::new(),
            cursor: 0,
            total_out: 0,
        })
    }

    /// Raw bytes taken from the inner reader so far.
    pub fn total_in(&self) -> u64 {
        self.assembler.total_in()
    }

    /// Compressed bytes returned so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Give back the inner reader.
    pub fn into_inner(self) -> R {
        self.assembler.into_inner()
    }

    /// Compress the next batch into `buffer`. Leaves `buffer` empty once the stream is done.
    fn refill(&mut self) -> Result<()> {
        self.buffer.clear();
        self.cursor = 0;
        if self.encoder.is_none() {
            return Ok(());
        }

        let mut batch = Vec::with_capacity(self.workers);
        while batch.len() < self.workers {
            match self.assembler.next_block()? {
                Some(block) => batch.push(block),
                None => break,
            }
        }

        if batch.is_empty() {
            if let Some(encoder) = self.encoder.take() {
                let (bytes, _) = encoder.finish(self.assembler.total_in())?;
                self.buffer = bytes;
            }
        } else if let Some(encoder) = self.encoder.as_mut() {
            encoder.encode(batch)?;
            encoder.flush()?;
            // The writer gets the emptied buffer back for the next batch.
            std::mem::swap(&mut self.buffer, encoder.get_mut());
        }
        Ok(())
    }
}

impl<R: Read> Read for BzCompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.cursor == self.buffer.len() {
            if self.encoder.is_none() {
                return Ok(0);
            }
            self.refill().map_err(|e| {
                log_failure(&e);
                io::Error::from(e)
            })?;
        }
        let n = buf.len().min(self.buffer.len() - self.cursor);
        buf[..n].copy_from_slice(&self.buffer[self.cursor..self.cursor + n]);
        self.cursor += n;
        self.total_out += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::compress::compress;
    use crate::compression::decompress::decompress;

    #[test]
    fn matches_compress_test() {
        let data: Vec<u8> = (0..250_000_u32).map(|i| (i / 5 % 29) as u8 + b'A').collect();
        let mut expected = Vec::new();
        compress(data.as_slice(), &mut expected, 1).unwrap();

        let mut reader = BzCompressReader::new(data.as_slice(), BlockSize::FASTEST).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, expected);
        assert_eq!(reader.total_in(), data.len() as u64);
        assert_eq!(reader.total_out(), out.len() as u64);
    }

    #[test]
    fn small_reads_test() {
        let data = b"a short line of text, read back a few bytes at a time\n".repeat(500);
        let options = CompressOptions::new(BlockSize::FASTEST).with_workers(2).unwrap();
        let mut reader = BzCompressReader::with_options(data.as_slice(), options).unwrap();
        let mut out = Vec::new();
        let mut chunk = [0_u8; 7];
        loop {
            let n = reader.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        // Reading past the end keeps returning 0.
        assert_eq!(reader.read(&mut chunk).unwrap(), 0);

        let mut plain = Vec::new();
        decompress(out.as_slice(), &mut plain).unwrap();
        assert_eq!(plain, data);
    }

    #[test]
    fn empty_test() {
        let mut reader = BzCompressReader::new(&b""[..], BlockSize::BEST).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(
            out,
            vec![0x42, 0x5A, 0x68, 0x39, 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0]
        );
    }
}
