//! CRC32 checksums for bzip2, both block and stream versions.
//!
//! bzip2 uses the CRC-32 polynomial 0x04c11db7 processed most significant bit first, with an
//! initial value of 0xffffffff and a final inversion. The stream CRC folds each block CRC in
//! with a one bit rotation.

const POLY: u32 = 0x04c1_1db7;

static CRC_TABLE: [u32; 256] = make_table();

const fn make_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = (i as u32) << 24;
        let mut k = 0;
        while k < 8 {
            c = if c & 0x8000_0000 != 0 {
                (c << 1) ^ POLY
            } else {
                c << 1
            };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

#[inline(always)]
fn update(crc: u32, byte: u8) -> u32 {
    (crc << 8) ^ CRC_TABLE[((crc >> 24) ^ byte as u32) as usize]
}

/// Continue a block CRC over `data`. Start a new CRC with 0. Calls chain, so
/// `do_crc(do_crc(0, a), b) == do_crc(0, ab)`.
pub fn do_crc(crc: u32, data: &[u8]) -> u32 {
    !data.iter().fold(!crc, |c, &b| update(c, b))
}

/// Running block CRC for callers that see the data a byte or a run at a time.
#[derive(Debug, Clone, Copy)]
pub struct BlockCrc(u32);

impl BlockCrc {
    pub fn new() -> Self {
        Self(u32::MAX)
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0 = data.iter().fold(self.0, |c, &b| update(c, b));
    }

    /// Add `count` copies of `byte`.
    pub fn update_run(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.0 = update(self.0, byte);
        }
    }

    pub fn value(&self) -> u32 {
        !self.0
    }
}

impl Default for BlockCrc {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a block CRC into the stream CRC.
pub fn do_stream_crc(stream_crc: u32, block_crc: u32) -> u32 {
    stream_crc.rotate_left(1) ^ block_crc
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_value_test() {
        assert_eq!(do_crc(0, b"123456789"), 0xfc89_1918);
    }

    #[test]
    fn block_crc_test() {
        assert_eq!(do_crc(0, b"hello world\n"), 0x4eec_e836);
        assert_eq!(do_crc(0, b"ABAB"), 0xee44_b621);
        assert_eq!(do_crc(0, b""), 0);
    }

    #[test]
    fn chained_crc_test() {
        let crc = do_crc(do_crc(0, b"hello "), b"world\n");
        assert_eq!(crc, 0x4eec_e836);
    }

    #[test]
    fn running_crc_test() {
        let mut crc = BlockCrc::new();
        crc.update(b"AB");
        crc.update_run(b'A', 1);
        crc.update(b"B");
        assert_eq!(crc.value(), 0xee44_b621);
        assert_eq!(BlockCrc::default().value(), 0);
    }

    #[test]
    fn stream_crc_test() {
        // A single block stream carries the block crc as its stream crc
        assert_eq!(do_stream_crc(0, 0x4eec_e836), 0x4eec_e836);
        assert_eq!(do_stream_crc(0x8000_0001, 0), 0x0000_0003);
    }
}
