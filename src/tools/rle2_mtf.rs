//! Move-to-front transform and Run-Length-Encoding 2, done in one pass before the huffman stage.
//!
//! The move-to-front transform turns the clustered bytes of the BWT output into mostly small
//! indexes, zero above all. Runs of zeros are then written in a bijective base 2 scheme using
//! the two symbols RUNA and RUNB, so a run of any length costs only log2 symbols.
//!
//! Encoding also returns the frequency table and symbol map used during the huffman stage.

use super::freq_count::freqs;
use super::symbol_map::encode_sym_map;

pub const RUNA: u16 = 0;
pub const RUNB: u16 = 1;

/// MTF/RLE2 output for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rle2Block {
    /// Symbols 0..=eob. Always ends with a single eob.
    pub symbols: Vec<u16>,
    /// Frequency of each symbol, indexed by symbol (length eob + 1).
    pub freqs: Vec<u32>,
    /// End of block symbol, one more than the number of bytes in use.
    pub eob: u16,
    /// bzip2 symbol map of the bytes in use.
    pub sym_map: Vec<u16>,
}

/// Does Move-To-Front transform and Run-Length-Encoding 2 on a block of BWT data.
pub fn rle2_mtf_encode(block: &[u8]) -> Rle2Block {
    // Find every byte used in the input.
    let counts = freqs(block);
    let mut in_use = [false; 256];
    let mut mtf_index = [0_u8; 256];
    let mut n_in_use = 0_usize;
    for (byte, &count) in counts.iter().enumerate() {
        if count > 0 {
            in_use[byte] = true;
            mtf_index[n_in_use] = byte as u8;
            n_in_use += 1;
        }
    }
    let eob = n_in_use as u16 + 1;
    let sym_map = encode_sym_map(&in_use);

    let mut zeros = 0_usize;
    let mut rle2: Vec<u16> = Vec::with_capacity(block.len() + 1);
    let mut freqs = vec![0_u32; eob as usize + 1];

    for &byte in block {
        // Every byte is in the index by construction.
        let mut idx = mtf_index[..n_in_use]
            .iter()
            .position(|&c| c == byte)
            .unwrap_or_default();
        if idx == 0 {
            zeros += 1;
            continue;
        }
        // Not a zero, so output any pending zeros first
        push_run(&mut rle2, &mut freqs, zeros);
        zeros = 0;

        freqs[idx + 1] += 1;
        rle2.push(idx as u16 + 1);

        // Shift each index in front of the current byte back one, in blocks of 8 for speed.
        let temp_sym = mtf_index[idx];
        while idx > 7 {
            mtf_index.copy_within(idx - 8..idx, idx - 7);
            idx -= 8;
        }
        while idx > 0 {
            mtf_index[idx] = mtf_index[idx - 1];
            idx -= 1;
        }
        mtf_index[0] = temp_sym;
    }
    push_run(&mut rle2, &mut freqs, zeros);

    rle2.push(eob);
    freqs[eob as usize] += 1;

    Rle2Block {
        symbols: rle2,
        freqs,
        eob,
        sym_map,
    }
}

/// Write a run of `zeros` zero indexes as RUNA/RUNB digits, least significant first.
fn push_run(rle2: &mut Vec<u16>, freqs: &mut [u32], zeros: usize) {
    if zeros == 0 {
        return;
    }
    let mut n = zeros - 1;
    loop {
        let sym = (n & 1) as u16;
        rle2.push(sym);
        freqs[sym as usize] += 1;
        if n < 2 {
            break;
        }
        n = (n - 2) >> 1;
    }
}
