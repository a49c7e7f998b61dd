use log::{debug, trace};

use crate::bitstream::bitpacker::{BitPacker, PackedBlock};
use crate::bwt_algorithms::bwt_sort::bwt_encode;
use crate::compression::format::BLOCK_MAGIC;
use crate::error::Result;
use crate::huffman_coding::huffman::huf_encode;
use crate::tools::rle1::Block;
use crate::tools::rle2_mtf::rle2_mtf_encode;

/// Called by compress, this handles one RLE1 block and returns its packed bitstream:
/// block magic, crc, randomized bit, BWT key, then the huffman section.
/// Blocks are independent, so this runs on any worker thread.
pub fn compress_block(block: &Block, iterations: usize) -> Result<PackedBlock> {
    let mut bp = BitPacker::new(block.data.len() + block.data.len() / 4 + 1024);

    // Six bytes of magic, 4 bytes of crc data, 1 bit for Randomized flag.
    trace!("Block {}: writing magic and crc at {}", block.seq, bp.loc());
    bp.write_bits(24, (BLOCK_MAGIC >> 24) as u32); // magic bits  1-24
    bp.write_bits(24, (BLOCK_MAGIC & 0xff_ffff) as u32); // magic bits 25-48
    bp.out32(block.block_crc);
    bp.write_bits(1, 0);

    let (key, bwt) = bwt_encode(&block.data);
    trace!("Block {}: writing key {} at {}", block.seq, key, bp.loc());
    bp.write_bits(24, key);

    let rle2 = rle2_mtf_encode(&bwt);

    // Now for the compression - the Huffman encoding (which also writes out data)
    huf_encode(&mut bp, &rle2, iterations)?;

    debug!(
        "Block {}: {} bytes in block, {} after MTF & RLE2 coding, {} syms in use, {} bits out",
        block.seq,
        block.data.len(),
        rle2.symbols.len(),
        rle2.eob + 1,
        bp.bit_len()
    );
    Ok(bp.finish(block.block_crc))
}
