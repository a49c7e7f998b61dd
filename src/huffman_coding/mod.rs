//! The huffman module generates and reads the entropy coded part of each block.
//!
//! Huffman encoding is used in lieu of arithmetic encoding because of an historical problem with licensing restrictions.
//! While that has been resolved in more recent years, the BZIP2 standard was set based on the huffman standard.
//!
//! The huffman coding algorithm as used by BZIP2 is both block and chunk oriented. Within each block, groups of 50
//! symbols are encoded separately using one of two to six huffman tables. The table used for each group is recorded
//! in a selector list. This allows for higher compression ratios compared to using one huffman table per block.
//!
//! The process of encoding and decoding each block is inherently sequential. Parallelism happens across blocks.
//!
pub mod huffman;
pub mod huffman_code_from_weights;
pub mod huffman_decode;
