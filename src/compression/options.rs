//! User settable options for compression, checked when they are built.

use super::format::{BLOCK_OVERHEAD, BLOCK_UNIT};
use crate::error::{Error, Result};

/// Most Huffman refinement passes allowed.
pub const MAX_ITERATIONS: usize = 16;
/// Refinement passes used by the reference coder.
pub const DEFAULT_ITERATIONS: usize = 4;

/// Block size factor, 1-9. Each block holds up to 100k times the factor of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockSize(u8);

impl BlockSize {
    /// 100k blocks.
    pub const FASTEST: BlockSize = BlockSize(1);
    /// 600k blocks.
    pub const DEFAULT: BlockSize = BlockSize(6);
    /// 900k blocks.
    pub const BEST: BlockSize = BlockSize(9);

    /// Create a block size from a factor in 1..=9.
    pub fn new(factor: u32) -> Result<Self> {
        match factor {
            1..=9 => Ok(BlockSize(factor as u8)),
            _ => Err(Error::InvalidConfiguration(format!(
                "block size factor {} is outside 1..=9",
                factor
            ))),
        }
    }

    /// The factor as stored in the stream header.
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Most raw input bytes one block can cover.
    pub fn max_raw(&self) -> usize {
        BLOCK_UNIT * self.0 as usize
    }

    /// Most RLE1 coded bytes one block can hold.
    pub fn max_coded(&self) -> usize {
        BLOCK_UNIT * self.0 as usize - BLOCK_OVERHEAD
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        BlockSize::DEFAULT
    }
}

/// Compression settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressOptions {
    block_size: BlockSize,
    iterations: usize,
    workers: usize,
}

impl CompressOptions {
    /// Options with the given block size, four refinement passes and one worker per core.
    pub fn new(block_size: BlockSize) -> Self {
        Self {
            block_size,
            iterations: DEFAULT_ITERATIONS,
            workers: rayon::current_num_threads().max(1),
        }
    }

    /// Set the number of Huffman refinement passes (1..=16).
    pub fn with_iterations(mut self, iterations: usize) -> Result<Self> {
        if !(1..=MAX_ITERATIONS).contains(&iterations) {
            return Err(Error::InvalidConfiguration(format!(
                "iterations {} is outside 1..={}",
                iterations, MAX_ITERATIONS
            )));
        }
        self.iterations = iterations;
        Ok(self)
    }

    /// Set how many blocks are encoded at once. Also bounds the blocks held in memory.
    pub fn with_workers(mut self, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidConfiguration(
                "worker count must be at least 1".to_string(),
            ));
        }
        self.workers = workers;
        Ok(self)
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self::new(BlockSize::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_size_test() {
        assert_eq!(BlockSize::new(1).unwrap(), BlockSize::FASTEST);
        assert_eq!(BlockSize::new(9).unwrap().max_raw(), 900_000);
        assert_eq!(BlockSize::FASTEST.max_coded(), 99_981);
        assert!(matches!(
            BlockSize::new(0),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(BlockSize::new(10).is_err());
    }

    #[test]
    fn options_test() {
        let opts = CompressOptions::new(BlockSize::BEST)
            .with_iterations(1)
            .unwrap()
            .with_workers(3)
            .unwrap();
        assert_eq!(opts.block_size().level(), 9);
        assert_eq!(opts.iterations(), 1);
        assert_eq!(opts.workers(), 3);
        assert!(CompressOptions::default().with_iterations(0).is_err());
        assert!(CompressOptions::default().with_iterations(17).is_err());
        assert!(CompressOptions::default().with_workers(0).is_err());
    }
}
