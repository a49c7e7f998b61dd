use std::io::Write;

use log::trace;

use super::bitpacker::PackedBlock;
use crate::compression::format::{STREAM_FOOTER_MAGIC, STREAM_MAGIC};
use crate::error::Result;
use crate::tools::crc::do_stream_crc;

/// Size at which buffered output is pushed to the underlying writer.
const FLUSH_THRESHOLD: usize = 64 * 1024;

/// Writes a bitstream for output. Takes the blocks packed by BitPacker and assembles them with
/// the stream header and footer, calculating the stream CRC as it processes the blocks.
pub struct BitWriter<W: Write> {
    /// Output buffer used to write the bitstream.
    output: Vec<u8>,
    /// Private queue to hold bits that are waiting to be put as bytes into the output buffer.
    queue: u64,
    /// Count of valid bits in the queue.
    q_bits: u8,
    /// Handle to the output stream
    writer: W,
    /// Stream CRC, calculated from each block crc and added to the stream footer.
    stream_crc: u32,
    /// Bytes handed to the writer so far.
    bytes_out: u64,
    /// Blocks added so far.
    blocks: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new BitWriter and put the stream header (`BZh` plus the block size digit)
    /// on the stream. Use add_block() to add each block to the stream.
    pub fn new(writer: W, block_size: u8) -> Self {
        let mut bw = Self {
            output: Vec::with_capacity(2 * FLUSH_THRESHOLD),
            queue: 0,
            q_bits: 0,
            writer,
            stream_crc: 0,
            bytes_out: 0,
            blocks: 0,
        };
        STREAM_MAGIC.iter().for_each(|&x| bw.out8(x));
        bw.out8(block_size + b'0');
        bw
    }

    /// Add a packed block to the output. The block starts wherever the previous one ended,
    /// so padding in the packed block's last byte is dropped.
    pub fn add_block(&mut self, block: &PackedBlock) -> Result<()> {
        self.blocks += 1;
        // Update the stream crc
        self.stream_crc = do_stream_crc(self.stream_crc, block.block_crc);
        trace!(
            "Adding block {} ({} bits) at {}, stream crc now {:08x}",
            self.blocks,
            block.bits,
            self.loc(),
            self.stream_crc
        );

        let full_bytes = (block.bits / 8) as usize;
        let tail_bits = (block.bits % 8) as u8;
        block.data[..full_bytes].iter().for_each(|&x| self.out8(x));
        if tail_bits > 0 {
            self.out_bits(tail_bits, block.data[full_bytes] >> (8 - tail_bits));
        }

        if self.output.len() >= FLUSH_THRESHOLD {
            self.drain()?;
        }
        Ok(())
    }

    /// Write the end of stream magic and the stream CRC, flush the padded last byte and
    /// return the writer along with the total number of bytes written.
    pub fn finish(mut self) -> Result<(W, u64)> {
        STREAM_FOOTER_MAGIC.iter().for_each(|&x| self.out8(x));
        let crc = self.stream_crc;
        crc.to_be_bytes().iter().for_each(|&x| self.out8(x));
        self.flush_queue();
        self.drain()?;
        self.writer.flush()?;
        Ok((self.writer, self.bytes_out))
    }

    /// The stream CRC over all blocks added so far.
    pub fn stream_crc(&self) -> u32 {
        self.stream_crc
    }

    /// Bytes handed to the writer so far (not counting the buffered tail).
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// Push every whole byte written so far to the writer and flush it. Up to 7 bits of the
    /// last block stay queued, since the next block or the footer continues that byte.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.writer.flush()?;
        Ok(())
    }

    /// Mutable access to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Write out the full bytes in the output buffer. The queue carries over.
    fn drain(&mut self) -> Result<()> {
        self.writer.write_all(&self.output)?;
        self.bytes_out += self.output.len() as u64;
        self.output.clear();
        Ok(())
    }

    /// Internal bitstream write function common to all out functions.
    fn push_queue(&mut self) {
        while self.q_bits > 7 {
            let byte = (self.queue >> (self.q_bits - 8)) as u8;
            self.output.push(byte); //push the packed byte out
            self.q_bits -= 8; //adjust the count of bits left in the queue
        }
    }

    /// Put a byte of pre-packed binary encoded data on the stream.
    fn out8(&mut self, data: u8) {
        self.out_bits(8, data);
    }

    /// Put the lowest `n` (1-8) bits of `data` on the stream.
    fn out_bits(&mut self, n: u8, data: u8) {
        self.queue <<= n;
        self.queue |= (data as u64) & (0xff >> (8 - n));
        self.q_bits += n;
        self.push_queue();
    }

    /// Flushes the remaining bits (1-7) from the queue, padding with 0s in the least
    /// significant bits.
    fn flush_queue(&mut self) {
        if self.q_bits > 0 {
            let byte = (self.queue << (8 - self.q_bits)) as u8;
            self.output.push(byte);
            self.q_bits = 0;
        }
    }

    /// Debugging function. Report current position in the stream as bytes.bits
    fn loc(&self) -> String {
        let bits = (self.bytes_out + self.output.len() as u64) * 8 + self.q_bits as u64;
        format!("[{}.{}]", bits / 8, bits % 8)
    }
}

#[cfg(test)]
mod test {
    use super::BitWriter;
    use crate::bitstream::bitpacker::BitPacker;

    #[test]
    fn empty_stream_test() {
        let bw = BitWriter::new(Vec::new(), 9);
        let (out, written) = bw.finish().unwrap();
        assert_eq!(
            out,
            vec![0x42, 0x5a, 0x68, 0x39, 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0]
        );
        assert_eq!(written, 14);
    }

    #[test]
    fn splice_blocks_test() {
        let mut bw = BitWriter::new(Vec::new(), 1);
        let mut bp = BitPacker::new(4);
        bp.write_bits(3, 0b101);
        let first = bp.finish(1);
        let mut bp = BitPacker::new(4);
        bp.write_bits(5, 0b11011);
        let second = bp.finish(2);
        bw.add_block(&first).unwrap();
        bw.add_block(&second).unwrap();
        // crc: ((0 << 1) ^ 1) = 1, then (1 << 1) ^ 2 = 0
        assert_eq!(bw.stream_crc(), 0);
        let (out, _) = bw.finish().unwrap();
        assert_eq!(&out[..4], b"BZh1");
        // 101 + 11011 = one full byte
        assert_eq!(out[4], 0b1011_1011);
        assert_eq!(&out[5..11], &[0x17, 0x72, 0x45, 0x38, 0x50, 0x90]);
        assert_eq!(out.len(), 15);
    }

    #[test]
    fn flush_keeps_partial_byte_test() {
        let mut bw = BitWriter::new(Vec::new(), 1);
        let mut bp = BitPacker::new(4);
        bp.write_bits(12, 0xabc);
        bw.add_block(&bp.finish(0)).unwrap();
        bw.flush().unwrap();
        // Header and the first 8 block bits are out, the last 4 bits wait for more.
        assert_eq!(bw.get_mut().as_slice(), b"BZh1\xab");
        assert_eq!(bw.bytes_out(), 5);
        let (out, written) = bw.finish().unwrap();
        assert_eq!(out[5], 0xc1);
        assert_eq!(written, out.len() as u64);
    }

    #[test]
    fn unaligned_footer_test() {
        let mut bw = BitWriter::new(Vec::new(), 1);
        let mut bp = BitPacker::new(4);
        bp.write_bits(1, 1);
        bw.add_block(&bp.finish(0x8000_0000)).unwrap();
        let (out, _) = bw.finish().unwrap();
        // header(4) + 1 bit + 48 bit magic + 32 bit crc = 81 bits -> 11 bytes
        assert_eq!(out.len(), 4 + 11);
        assert_eq!(out[4], 0x80 | (0x17 >> 1));
        assert_eq!(out[14], 0);
    }
}
