//! The tools module provides the helper stages of the block pipeline.
//!
//! The tools are:
//! - cli: Command line interface.
//! - crc: CRC32 checksum, both block and stream versions.
//! - freq_count: Byte frequency count.
//! - rle1: Block assembly with Run-Length-Encoding phase 1, and its inverse.
//! - rle2_mtf: Move-To-Front transform and Run-Length-Encoding phase 2 (integrated for speed).
//! - rle2_mtf_decode: The inverse of rle2_mtf.
//! - symbol_map: Encode and decode the symbol map written with each block.
//!
pub mod cli;
pub mod crc;
pub mod freq_count;
pub mod rle1;
pub mod rle2_mtf;
pub mod rle2_mtf_decode;
pub mod symbol_map;
