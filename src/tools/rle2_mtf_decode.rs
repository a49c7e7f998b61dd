//! Inverse of the MTF/RLE2 stage: expands RUNA/RUNB runs and undoes the move-to-front.

use super::rle2_mtf::{RUNA, RUNB};
use crate::error::{Error, Result};

/// Does run-length-decoding and MTF decoding of one block of huffman decoded symbols.
/// `symbols` must not include the end of block symbol. `in_use` is the sorted symbol set
/// from the symbol map. Output larger than `capacity` is rejected as corrupt.
pub fn rle2_mtf_decode(symbols: &[u16], in_use: &[u8], capacity: usize) -> Result<Vec<u8>> {
    if in_use.is_empty() {
        return Err(Error::corrupt("empty symbol map"));
    }
    let mut mtf_index = in_use.to_vec();
    let mut out: Vec<u8> = Vec::with_capacity(capacity.min(symbols.len() * 2));

    let mut zeros = 0_usize;
    let mut bit_multiplier = 1_usize;

    for &symbol in symbols {
        match symbol {
            RUNA | RUNB => {
                zeros += bit_multiplier << symbol;
                bit_multiplier <<= 1;
                if zeros > capacity {
                    return Err(Error::corrupt("zero run exceeds block capacity"));
                }
            }
            n => {
                put_zeros(&mut out, mtf_index[0], zeros, capacity)?;
                zeros = 0;
                bit_multiplier = 1;

                let mut loc = n as usize - 1;
                if loc >= mtf_index.len() {
                    return Err(Error::corrupt(format!("MTF index {} out of range", loc)));
                }
                if out.len() == capacity {
                    return Err(Error::corrupt("block exceeds capacity"));
                }
                let sym = mtf_index[loc];
                out.push(sym);

                // Move the symbol to the front
                while loc > 3 {
                    mtf_index[loc] = mtf_index[loc - 1];
                    mtf_index[loc - 1] = mtf_index[loc - 2];
                    mtf_index[loc - 2] = mtf_index[loc - 3];
                    mtf_index[loc - 3] = mtf_index[loc - 4];
                    loc -= 4;
                }
                while loc > 0 {
                    mtf_index[loc] = mtf_index[loc - 1];
                    loc -= 1;
                }
                mtf_index[0] = sym;
            }
        }
    }
    put_zeros(&mut out, mtf_index[0], zeros, capacity)?;
    Ok(out)
}

/// Output a pending run of zero indexes, which all map to the front symbol.
fn put_zeros(out: &mut Vec<u8>, front: u8, zeros: usize, capacity: usize) -> Result<()> {
    if out.len() + zeros > capacity {
        return Err(Error::corrupt("zero run exceeds block capacity"));
    }
    out.extend(std::iter::repeat(front).take(zeros));
    Ok(())
}
