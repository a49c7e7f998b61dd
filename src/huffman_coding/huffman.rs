use log::{debug, trace};

use super::huffman_code_from_weights::{canonical_codes, code_lengths};
use crate::bitstream::bitpacker::BitPacker;
use crate::compression::format::{ENCODE_CODE_LEN, GROUP_SIZE, MAX_CODE_LEN, MAX_TABLES};
use crate::error::{Error, Result};
use crate::tools::rle2_mtf::Rle2Block;

/// Number of coding tables for a block with this many symbols.
pub fn table_count(symbols: usize) -> usize {
    match symbols {
        0..=199 => 2,
        200..=599 => 3,
        600..=1199 => 4,
        1200..=2399 => 5,
        _ => 6,
    }
}

/// Encode MTF/RLE2 data using 2 to 6 Huffman tables and write everything after the block
/// header: symbol map, table count, selectors, code length tables and the coded symbols.
/// `iterations` caps the refinement passes (bzip2 itself uses 4).
pub fn huf_encode(bp: &mut BitPacker, block: &Rle2Block, iterations: usize) -> Result<()> {
    let symbols = &block.symbols;
    let alpha = block.eob as usize + 1;
    let tables_used = table_count(symbols.len());

    // Start from tables that split the symbol range by frequency.
    let mut tables = init_tables(&block.freqs, tables_used, alpha, symbols.len());
    let mut selectors: Vec<usize> = Vec::with_capacity(symbols.len() / GROUP_SIZE + 1);

    /*
    Each pass picks the cheapest table for every group of 50 symbols, then rebuilds every table
    from the symbols of the groups that picked it. Once the choices stop changing, the rebuilt
    tables would come out the same, so there is no point going on.
     */
    for iter in 0..iterations.max(1) {
        let mut favorites = [0_usize; MAX_TABLES];
        let mut total_cost = 0_u64;
        let mut rfreq = vec![vec![0_u32; alpha]; tables_used];
        let mut picks: Vec<usize> = Vec::with_capacity(selectors.capacity());

        for chunk in symbols.chunks(GROUP_SIZE) {
            let mut cost = [0_u32; MAX_TABLES];
            for &sym in chunk {
                for (t, c) in cost.iter_mut().enumerate().take(tables_used) {
                    *c += tables[t][sym as usize] as u32;
                }
            }
            // First table with the lowest cost
            let mut bt = 0;
            for t in 1..tables_used {
                if cost[t] < cost[bt] {
                    bt = t;
                }
            }
            total_cost += cost[bt] as u64;
            favorites[bt] += 1;
            chunk.iter().for_each(|&sym| rfreq[bt][sym as usize] += 1);
            picks.push(bt);
        }

        let stable = iter > 0 && picks == selectors;
        selectors = picks;
        debug!(
            "pass {}: cost {} bytes, table uses {:?}{}",
            iter + 1,
            total_cost / 8,
            &favorites[..tables_used],
            if stable { " (stable)" } else { "" }
        );
        if stable {
            break;
        }
        for (t, table) in tables.iter_mut().enumerate() {
            *table = code_lengths(&rfreq[t], ENCODE_CODE_LEN);
        }
    }

    for (t, table) in tables.iter().enumerate() {
        if let Some((symbol, &length)) = table
            .iter()
            .enumerate()
            .find(|(_, &l)| l == 0 || l as u32 > MAX_CODE_LEN)
        {
            return Err(Error::CodeLengthOverflow {
                table: t,
                symbol,
                length: length as i32,
            });
        }
    }

    // Symbol maps: 16 bit index + up to 16 words of 16 bit maps.
    trace!("Symbol map written at {}", bp.loc());
    block.sym_map.iter().for_each(|&word| bp.out16(word));

    bp.write_bits(3, tables_used as u32);
    bp.write_bits(15, selectors.len() as u32);

    // Selectors are written after a Move-To-Front transform, in unary.
    trace!("{} selectors written at {}", selectors.len(), bp.loc());
    let mut table_idx: Vec<usize> = (0..tables_used).collect();
    for &selector in &selectors {
        let idx = table_idx.iter().position(|&t| t == selector).unwrap_or(0);
        bp.write_unary(idx);
        table_idx[..=idx].rotate_right(1);
    }

    // Code lengths: a 5 bit start, then per symbol "10" (+1) or "11" (-1) steps and a 0.
    for (t, table) in tables.iter().enumerate() {
        trace!("Table {} lengths written at {}", t, bp.loc());
        let mut current = table[0] as i32;
        bp.write_bits(5, current as u32);
        for &len in table.iter() {
            let len = len as i32;
            while current < len {
                bp.write_bits(2, 0b10);
                current += 1;
            }
            while current > len {
                bp.write_bits(2, 0b11);
                current -= 1;
            }
            bp.write_bits(1, 0);
        }
    }

    // Now encode and write the data, switching tables every 50 symbols.
    let codes: Vec<Vec<u32>> = tables.iter().map(|t| canonical_codes(t)).collect();
    trace!("Huffman data written at {}", bp.loc());
    for (chunk, &sel) in symbols.chunks(GROUP_SIZE).zip(&selectors) {
        let (lengths, table_codes) = (&tables[sel], &codes[sel]);
        for &sym in chunk {
            let sym = sym as usize;
            bp.write_bits(lengths[sym], table_codes[sym]);
        }
    }
    Ok(())
}

/// Build the starting tables. Each table gets a contiguous range of symbols holding about an
/// equal share of the frequency: those symbols cost 0 in that table and 15 everywhere else.
/// Table `count - 1` takes the lowest symbols.
fn init_tables(freqs: &[u32], count: usize, alpha: usize, total: usize) -> Vec<Vec<u8>> {
    let mut tables = vec![vec![15_u8; alpha]; count];
    let mut parts_left = count;
    let mut remaining = total as i64;
    let mut gs = 0_i64;

    while parts_left > 0 {
        let target = remaining / parts_left as i64;
        let mut ge = gs - 1;
        let mut acc = 0_i64;
        while acc < target && ge < alpha as i64 - 1 {
            ge += 1;
            acc += freqs[ge as usize] as i64;
        }
        // Alternate tables stop just short of their share.
        if ge > gs && parts_left != count && parts_left != 1 && (count - parts_left) % 2 == 1 {
            acc -= freqs[ge as usize] as i64;
            ge -= 1;
        }
        let table = &mut tables[parts_left - 1];
        for v in gs.max(0)..=ge {
            table[v as usize] = 0;
        }
        parts_left -= 1;
        gs = ge + 1;
        remaining -= acc;
    }
    tables
}
