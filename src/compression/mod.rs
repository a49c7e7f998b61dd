//! The compression module manages both directions of the block pipeline.
//!
//! Compression happens in the following steps:
//! - Run Length Encoding 1: Compress all runs of 4-255 identical bytes while cutting the input into blocks.
//! - Burrows Wheeler Transform: Sort the data to increase the probability of runs of identical bytes.
//! - Move To Front transform: Increase the frequency of lower byte values, and thereby decrease the frequency of other byte values.
//! - Run Length Encoding 2: Compress all runs of the zero byte.
//! - Huffman coding: Encode frequent symbols using smaller bit codes and less frequent symbols with longer bit codes.
//!
//! While the initial RLE1 compression is probably not necessary, it is part of the bzip2 format and must be preserved.
//!
//! Blocks are independent, so a batch of blocks is compressed in parallel and written out in order.
//!
//! Both directions come as functions over a reader and a writer, and as adapters: `BzEncoder`
//! and `BzDecompressWriter` are written to, `BzCompressReader` and `BzDecoder` are read from.
//!
//! Decompression follows the inverse of the compression process. The huffman section of each block is read
//! sequentially, since a block's end is only known once it has been decoded. The rest runs in parallel:
//! - RLE 2: Expand all runs of the zero byte.
//! - MTF transform: Convert from the Move-To-Front indexes to the symbols represented by the indexes.
//! - BWT reversal: Restore the original data from the BWT transform.
//! - RLE 1: Expand all runs of 4+ identical bytes.
//!
pub mod compress;
pub mod compress_block;
pub mod compress_reader;
pub mod decoder;
pub mod decompress;
pub mod decompress_block;
pub mod decompress_writer;
pub mod encoder;
pub mod format;
pub mod options;
pub mod parallel;
