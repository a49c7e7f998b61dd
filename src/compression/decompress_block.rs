use log::{debug, trace};

use crate::bwt_algorithms::bwt_sort::bwt_decode;
use crate::error::{CrcScope, Error, Result};
use crate::tools::crc::do_crc;
use crate::tools::rle1::rle1_decode;
use crate::tools::rle2_mtf_decode::rle2_mtf_decode;

/// Everything read from the bitstream for one block. The rest of the decoding does not
/// touch the stream, so records can be finished on any worker thread.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    /// Block number in the input, counting from 1.
    pub seq: u64,
    /// CRC stored in the block header.
    pub stored_crc: u32,
    /// BWT origin pointer.
    pub key: u32,
    /// Sorted byte values from the symbol map.
    pub in_use: Vec<u8>,
    /// Huffman decoded symbols, without the end of block symbol.
    pub symbols: Vec<u16>,
    /// Most bytes the block may hold before RLE1 decoding.
    pub capacity: usize,
}

/// A block that has been fully decoded and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    pub data: Vec<u8>,
    pub block_crc: u32,
}

/// Undo MTF/RLE2, the BWT and RLE1, then check the block CRC.
pub fn decompress_block(record: BlockRecord) -> Result<DecodedBlock> {
    let bwt = rle2_mtf_decode(&record.symbols, &record.in_use, record.capacity)?;
    trace!("Block {}: {} bytes after RLE2/MTF", record.seq, bwt.len());
    let rle1 = bwt_decode(record.key, &bwt)?;

    let mut data = Vec::with_capacity(rle1.len() + rle1.len() / 4);
    rle1_decode(&rle1, &mut data);

    let block_crc = do_crc(0, &data);
    if block_crc != record.stored_crc {
        return Err(Error::ChecksumMismatch {
            scope: CrcScope::Block(record.seq),
            expected: record.stored_crc,
            actual: block_crc,
        });
    }
    debug!(
        "Block {}: {} bytes, crc {:08x}",
        record.seq,
        data.len(),
        block_crc
    );
    Ok(DecodedBlock { data, block_crc })
}
