//! Pure Rust block-sorting compression engine, compatible with the bzip2 stream format.
//!
//! Provides fast, safe compression and decompression using the bzip2 format. Blocks are
//! compressed and decompressed in parallel on a rayon pool.
//!
//! ```no_run
//! use bzip2_engine::{compress, decompress};
//!
//! let mut packed = Vec::new();
//! compress(&b"hello world\n"[..], &mut packed, 9)?;
//! let mut plain = Vec::new();
//! decompress(packed.as_slice(), &mut plain)?;
//! # Ok::<(), bzip2_engine::Error>(())
//! ```
//!
//! Basic usage of the binary to compress a file is as follows:
//!
//! `$> bzip2-engine -z test.txt`
//!
//! This will compress the file and create the file test.txt.bz2.
//! The original file will be deleted.
//!
pub mod bitstream;
pub mod bwt_algorithms;
pub mod compression;
pub mod error;
pub mod huffman_coding;
pub mod tools;

pub use compression::compress::{compress, compress_with, CompressStats};
pub use compression::compress_reader::BzCompressReader;
pub use compression::decoder::BzDecoder;
pub use compression::decompress::{decompress, DecompressStats};
pub use compression::decompress_writer::BzDecompressWriter;
pub use compression::encoder::BzEncoder;
pub use compression::options::{BlockSize, CompressOptions};
pub use error::{CrcScope, Error, Result};
