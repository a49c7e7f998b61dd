//! Decoding side of the huffman stage: reads the table count, selectors and code length tables of
//! a block, then decodes its symbols group by group until the end of block symbol.

use std::io::Read;

use log::trace;

use crate::bitstream::bitreader::BitReader;
use crate::compression::format::{GROUP_SIZE, MAX_CODE_LEN, MAX_SELECTORS, MAX_TABLES, MIN_TABLES};
use crate::error::{Error, Result};

/// Codes of one length, as a contiguous range of canonical code values.
#[derive(Debug, Clone)]
struct Level {
    /// Bits to read to get from the previous length to this one.
    bits: u32,
    /// Index in the sorted symbol list of the first symbol at this length.
    offset: u32,
    /// First code at this length.
    start_code: u32,
    /// One past the last code at this length.
    end_code: u32,
}

/// Canonical huffman decoding table built from code lengths.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    levels: Vec<Level>,
    /// Symbols sorted by (length, symbol).
    symbols: Vec<u16>,
}

impl DecodeTable {
    /// Build a decode table. Lengths must be 1..=20; a set of lengths that claims more codes
    /// than can exist is rejected.
    pub fn new(lengths: &[u8]) -> Result<Self> {
        let min = lengths.iter().copied().min().unwrap_or(0) as u32;
        let max = lengths.iter().copied().max().unwrap_or(0) as u32;
        if min == 0 || max > MAX_CODE_LEN {
            return Err(Error::corrupt("code lengths outside 1..=20"));
        }

        let mut symbols: Vec<u16> = (0..lengths.len() as u16).collect();
        symbols.sort_by_key(|&s| (lengths[s as usize], s));

        let mut levels = Vec::with_capacity((max - min + 1) as usize);
        let mut code = 0_u32;
        let mut offset = 0_u32;
        for len in min..=max {
            let count = lengths.iter().filter(|&&l| l as u32 == len).count() as u32;
            let end = code + count;
            if end > 1 << len {
                return Err(Error::corrupt(format!(
                    "over-subscribed huffman code at length {}",
                    len
                )));
            }
            levels.push(Level {
                bits: if len == min { min } else { 1 },
                offset,
                start_code: code,
                end_code: end,
            });
            offset += count;
            code = end << 1;
        }
        Ok(Self { levels, symbols })
    }

    /// Read one symbol from the stream.
    pub fn decode<R: Read>(&self, br: &mut BitReader<R>) -> Result<u16> {
        let mut code = 0_u32;
        for level in &self.levels {
            code = code << level.bits | br.bint(level.bits)?;
            if code < level.end_code {
                if code < level.start_code {
                    break;
                }
                return Ok(self.symbols[(level.offset + code - level.start_code) as usize]);
            }
        }
        Err(Error::corrupt("invalid huffman code"))
    }
}

/// Read the huffman section of a block (after the symbol map) and return the decoded symbols,
/// not including the end of block symbol. `in_use` is the number of bytes in the symbol map.
/// More than `max_symbols` symbols is corrupt.
pub fn huf_decode<R: Read>(
    br: &mut BitReader<R>,
    in_use: usize,
    max_symbols: usize,
) -> Result<Vec<u16>> {
    let alpha = in_use + 2;
    let eob = (in_use + 1) as u16;

    let table_count = br.bint(3)? as usize;
    if !(MIN_TABLES..=MAX_TABLES).contains(&table_count) {
        return Err(Error::InvalidTableCount(table_count));
    }

    let selector_count = br.bint(15)? as usize;
    if selector_count == 0 {
        return Err(Error::corrupt("block has no selectors"));
    }

    // Selectors come MTF coded, in unary. Anything past the largest usable count is dropped.
    let mut table_idx: Vec<usize> = (0..table_count).collect();
    let mut selectors = Vec::with_capacity(selector_count.min(MAX_SELECTORS));
    for _ in 0..selector_count {
        let idx = br.read_unary(table_count as u32)? as usize;
        if idx >= table_count {
            return Err(Error::SelectorOutOfRange {
                selector: idx,
                tables: table_count,
            });
        }
        let table = table_idx[idx];
        table_idx[..=idx].rotate_right(1);
        if selectors.len() < MAX_SELECTORS {
            selectors.push(table);
        }
    }
    trace!(
        "{} tables, {} selectors ({} kept)",
        table_count,
        selector_count,
        selectors.len()
    );

    // Code lengths: a 5 bit start, then "10" (+1) / "11" (-1) steps ending with a 0 per symbol.
    let mut tables = Vec::with_capacity(table_count);
    for table in 0..table_count {
        let mut lengths = vec![0_u8; alpha];
        let mut current = br.bint(5)? as i32;
        for (symbol, length) in lengths.iter_mut().enumerate() {
            loop {
                if current < 1 || current > MAX_CODE_LEN as i32 {
                    return Err(Error::CodeLengthOverflow {
                        table,
                        symbol,
                        length: current,
                    });
                }
                if !br.bool_bit()? {
                    break;
                }
                if br.bool_bit()? {
                    current -= 1;
                } else {
                    current += 1;
                }
            }
            *length = current as u8;
        }
        tables.push(DecodeTable::new(&lengths)?);
    }

    // Decode symbols, switching tables every 50.
    let mut out: Vec<u16> = Vec::new();
    let mut decoded = 0_usize;
    let mut table = &tables[0];
    loop {
        if decoded % GROUP_SIZE == 0 {
            let group = decoded / GROUP_SIZE;
            let Some(&sel) = selectors.get(group) else {
                return Err(Error::corrupt("ran out of selectors"));
            };
            table = &tables[sel];
        }
        let sym = table.decode(br)?;
        decoded += 1;
        if sym == eob {
            break;
        }
        if out.len() == max_symbols {
            return Err(Error::corrupt("block exceeds capacity"));
        }
        out.push(sym);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bitstream::bitpacker::BitPacker;
    use crate::huffman_coding::huffman::huf_encode;
    use crate::tools::rle2_mtf::rle2_mtf_encode;

    /// Encode a symbol stream, then skip the symbol map and decode it again.
    fn round_trip(data: &[u8]) -> (Vec<u16>, Vec<u16>) {
        let rle2 = rle2_mtf_encode(data);
        let mut bp = BitPacker::new(data.len() + 100);
        huf_encode(&mut bp, &rle2, 4).unwrap();
        let packed = bp.finish(0);
        let mut br = BitReader::new(packed.data.as_slice());
        for _ in 0..rle2.sym_map.len() {
            br.bint(16).unwrap();
        }
        let in_use = rle2.eob as usize - 1;
        let decoded = huf_decode(&mut br, in_use, data.len()).unwrap();
        let expected = rle2.symbols[..rle2.symbols.len() - 1].to_vec();
        (decoded, expected)
    }

    #[test]
    fn decode_table_test() {
        // codes: sym1 = 0, sym0 = 10, sym2 = 110, sym3 = 111
        let table = DecodeTable::new(&[2, 1, 3, 3]).unwrap();
        let data = [0b0101_1011, 0b1000_0000];
        let mut br = BitReader::new(data.as_slice());
        assert_eq!(table.decode(&mut br).unwrap(), 1);
        assert_eq!(table.decode(&mut br).unwrap(), 0);
        assert_eq!(table.decode(&mut br).unwrap(), 2);
        assert_eq!(table.decode(&mut br).unwrap(), 3);
    }

    #[test]
    fn incomplete_code_test() {
        // Only code 0 is valid: a 1 bit is not a code at all.
        let table = DecodeTable::new(&[1, 2]).unwrap();
        let data = [0b1110_0000];
        let mut br = BitReader::new(data.as_slice());
        assert!(matches!(
            table.decode(&mut br),
            Err(Error::CorruptStream { .. })
        ));
    }

    #[test]
    fn over_subscribed_test() {
        assert!(DecodeTable::new(&[1, 1, 1]).is_err());
        assert!(DecodeTable::new(&[0, 1]).is_err());
        assert!(DecodeTable::new(&[21, 1]).is_err());
    }

    #[test]
    fn small_round_trip_test() {
        let (decoded, expected) = round_trip(b"hello world, hello huffman");
        assert_eq!(decoded, expected);
    }

    #[test]
    fn multi_table_round_trip_test() {
        let data: Vec<u8> = (0..20_000_u32)
            .map(|i| if i % 3000 < 1500 { (i % 5) as u8 } else { (i * 7 % 200) as u8 })
            .collect();
        let (decoded, expected) = round_trip(&data);
        assert_eq!(decoded, expected);
    }

    #[test]
    fn bad_table_count_test() {
        // table count 7
        let data = [0b1110_0000, 0, 0];
        let mut br = BitReader::new(data.as_slice());
        assert!(matches!(
            huf_decode(&mut br, 3, 100),
            Err(Error::InvalidTableCount(7))
        ));
    }

    #[test]
    fn zero_selectors_test() {
        // 2 tables, 0 selectors
        let data = [0b0100_0000, 0, 0];
        let mut br = BitReader::new(data.as_slice());
        assert!(matches!(
            huf_decode(&mut br, 3, 100),
            Err(Error::CorruptStream { .. })
        ));
    }

    #[test]
    fn selector_out_of_range_test() {
        // 2 tables, 1 selector, selector "11" reaches the table count
        let mut bp = BitPacker::new(10);
        bp.write_bits(3, 2);
        bp.write_bits(15, 1);
        bp.write_bits(2, 0b11);
        let packed = bp.finish(0);
        let mut br = BitReader::new(packed.data.as_slice());
        assert!(matches!(
            huf_decode(&mut br, 3, 100),
            Err(Error::SelectorOutOfRange {
                selector: 2,
                tables: 2
            })
        ));
    }

    #[test]
    fn code_length_overflow_test() {
        // 2 tables, 1 selector "0", first table starts at length 0
        let mut bp = BitPacker::new(10);
        bp.write_bits(3, 2);
        bp.write_bits(15, 1);
        bp.write_bits(1, 0);
        bp.write_bits(5, 0);
        bp.write_bits(8, 0);
        let packed = bp.finish(0);
        let mut br = BitReader::new(packed.data.as_slice());
        assert!(matches!(
            huf_decode(&mut br, 3, 100),
            Err(Error::CodeLengthOverflow {
                table: 0,
                symbol: 0,
                length: 0
            })
        ));
    }
}
