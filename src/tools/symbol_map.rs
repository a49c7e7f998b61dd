//! The bzip2 symbol map: which of the 256 byte values occur in a block.
//!
//! 256 byte values make 16 sets of 16. A leading 16 bit word has a bit set for each set that
//! has at least one byte in use, and each such set follows as its own 16 bit word.

const BIT_MASK: u16 = 0x8000;

/// Takes a table of the bytes used at the BWT stage and returns the bzip2 symbol map: the
/// index word followed only by the non-empty set words.
pub fn encode_sym_map(in_use: &[bool; 256]) -> Vec<u16> {
    let mut sym_maps: Vec<u16> = vec![0; 17]; // Index and 16 maps

    // 'A' is 0100_0001, so map 4 (0100) has bit 1 (0001) set.
    in_use.iter().enumerate().for_each(|(idx, &used)| {
        if used {
            sym_maps[0] |= BIT_MASK >> (idx >> 4);
            sym_maps[1 + (idx >> 4)] |= BIT_MASK >> (idx & 15)
        }
    });

    // Keep the index word, then only those maps that have bits set.
    let index = sym_maps[0];
    let mut out = vec![index];
    out.extend(sym_maps[1..].iter().filter(|&&map| map > 0));
    out
}

/// Takes a bzip2 symbol map and returns a sorted vec of all bytes used in the block.
/// The map must hold the index word plus one word per bit set in the index.
pub fn decode_sym_map(symbol_map: &[u16]) -> Vec<u8> {
    let mut symbols: Vec<u8> = Vec::with_capacity(256);
    let mut map_idx = 0;

    for block in 0..16 {
        if (symbol_map[0] & (BIT_MASK >> block)) > 0 {
            map_idx += 1;
            for byte_idx in 0..16_u8 {
                if (symbol_map[map_idx] & (BIT_MASK >> byte_idx)) > 0 {
                    symbols.push((block << 4) + byte_idx);
                };
            }
        }
    }
    symbols
}
