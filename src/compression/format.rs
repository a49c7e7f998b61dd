//! Fixed constants of the bzip2 wire format.

/// Stream header, followed by the block size digit '1'..'9'.
pub const STREAM_MAGIC: [u8; 3] = *b"BZh";
/// Block header magic (BCD of pi).
pub const BLOCK_MAGIC: u64 = 0x3141_5926_5359;
/// End of stream magic (BCD of sqrt(pi)).
pub const STREAM_FOOTER: u64 = 0x1772_4538_5090;
/// End of stream magic as bytes.
pub const STREAM_FOOTER_MAGIC: [u8; 6] = [0x17, 0x72, 0x45, 0x38, 0x50, 0x90];

/// Raw bytes per block for each step of the block size factor.
pub const BLOCK_UNIT: usize = 100_000;
/// Room kept free at the end of each block for a trailing run.
pub const BLOCK_OVERHEAD: usize = 19;

/// Symbols coded with one selector.
pub const GROUP_SIZE: usize = 50;
pub const MIN_TABLES: usize = 2;
pub const MAX_TABLES: usize = 6;
/// Largest selector count the reference decoder stores; extra selectors are read and dropped.
pub const MAX_SELECTORS: usize = 18_002;
/// Longest code the format can carry.
pub const MAX_CODE_LEN: u32 = 20;
/// Longest code the encoder builds.
pub const ENCODE_CODE_LEN: u32 = 17;
