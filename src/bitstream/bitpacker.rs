/// A finished, bit-packed block. The last byte may be only partly used; `bits` records how
/// many bits are valid so the stream writer can splice blocks together without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedBlock {
    /// Packed bits, MSB first, zero padded in the last byte.
    pub data: Vec<u8>,
    /// Number of valid bits in `data`.
    pub bits: u64,
    /// CRC of the raw bytes this block encodes.
    pub block_crc: u32,
}

/// Creates a bitstream for one block. Each block is packed on its own (possibly on a
/// worker thread) and handed to the stream BitWriter afterwards.
pub struct BitPacker {
    output: Vec<u8>,
    queue: u64,
    q_bits: u8,
}

impl BitPacker {
    /// Create a new BitPacker with an output buffer of size specified. Suggest the
    /// size be set to the block size.
    pub fn new(size: usize) -> Self {
        Self {
            output: Vec::with_capacity(size),
            queue: 0,
            q_bits: 0,
        }
    }

    /// Internal bitstream write function common to all write functions.
    fn write_stream(&mut self) {
        while self.q_bits > 7 {
            let byte = (self.queue >> (self.q_bits - 8)) as u8;
            self.output.push(byte); //push the packed byte out
            self.q_bits -= 8; //adjust the count of bits left in the queue
        }
    }

    /// Writes the lowest `n` bits (0-32) of `value`, most significant bit first.
    pub fn write_bits(&mut self, n: u8, value: u32) {
        debug_assert!(n <= 32);
        if n == 0 {
            return;
        }
        let mask = u64::MAX >> (64 - n as u32);
        self.queue <<= n; //shift queue by bit length
        self.queue |= value as u64 & mask; //add data portion to queue
        self.q_bits += n; //update depth of queue bits
        self.write_stream();
    }

    /// Puts an 8 bit word on the stream.
    pub fn out8(&mut self, data: u8) {
        self.write_bits(8, data as u32);
    }

    /// Puts a 16 bit word on the stream.
    pub fn out16(&mut self, data: u16) {
        self.write_bits(16, data as u32);
    }

    /// Puts a 32 bit word on the stream.
    pub fn out32(&mut self, data: u32) {
        self.write_bits(32, data);
    }

    /// Writes `value` one-bits followed by a single zero-bit.
    pub fn write_unary(&mut self, mut value: usize) {
        while value >= 24 {
            self.write_bits(24, 0x00ff_ffff);
            value -= 24;
        }
        // value ones, then the terminating zero
        self.write_bits(value as u8 + 1, ((1_u32 << value) - 1) << 1);
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> u64 {
        self.output.len() as u64 * 8 + self.q_bits as u64
    }

    /// Debugging function to return the number of bytes.bits output so far
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.bit_len() / 8, self.bit_len() % 8)
    }

    /// Flushes the remaining bits (1-7) from the queue, padding with 0s in the least
    /// significant bits, and returns the packed block.
    pub fn finish(mut self, block_crc: u32) -> PackedBlock {
        let bits = self.bit_len();
        if self.q_bits > 0 {
            self.queue <<= 8 - self.q_bits; //pad the queue with zeros
            self.q_bits = 8;
            self.write_stream(); // write out all that is left
        }
        PackedBlock {
            data: self.output,
            bits,
            block_crc,
        }
    }
}

#[cfg(test)]
mod test {
    use super::BitPacker;

    #[test]
    fn out16_test() {
        let mut bw = BitPacker::new(100);
        bw.out16(0b00100001_00100000);
        let out = bw.finish(0);
        assert_eq!(out.data, "! ".as_bytes());
        assert_eq!(out.bits, 16);
    }

    #[test]
    fn write_bits_and_loc_test() {
        let mut bw = BitPacker::new(100);
        bw.write_bits(8, 0b00100001);
        assert_eq!("[1.0]", &bw.loc());
        bw.write_bits(3, 0b011);
        assert_eq!("[1.3]", &bw.loc());
        let out = bw.finish(7);
        assert_eq!(out.data, vec![33, 0b0110_0000]);
        assert_eq!(out.bits, 11);
        assert_eq!(out.block_crc, 7);
    }

    #[test]
    fn write_bits_masks_high_bits_test() {
        let mut bw = BitPacker::new(10);
        bw.write_bits(4, 0xffff_fff5);
        bw.write_bits(4, 0);
        assert_eq!(bw.finish(0).data, vec![0x50]);
    }

    #[test]
    fn out32_test() {
        let mut bw = BitPacker::new(100);
        bw.write_bits(1, 1);
        bw.out32(0b00100001_00100000_00100001_00100000);
        let out = bw.finish(0);
        assert_eq!(out.data, [0x90, 0x90, 0x10, 0x90, 0x00]);
        assert_eq!(out.bits, 33);
    }

    #[test]
    fn unary_test() {
        let mut bw = BitPacker::new(10);
        bw.write_unary(0);
        bw.write_unary(3);
        bw.write_unary(1);
        // 0 1110 10 -> 0111_0100
        let out = bw.finish(0);
        assert_eq!(out.data, vec![0b0111_0100]);
        assert_eq!(out.bits, 7);
    }

    #[test]
    fn long_unary_test() {
        let mut bw = BitPacker::new(10);
        bw.write_unary(30);
        let out = bw.finish(0);
        assert_eq!(out.bits, 31);
        assert_eq!(out.data, vec![0xff, 0xff, 0xff, 0b1111_1100]);
    }
}
