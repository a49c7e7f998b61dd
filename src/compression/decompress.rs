use std::io::{Read, Write};

use log::{info, trace, warn};
use rayon::ThreadPool;

use super::decompress_block::{decompress_block, BlockRecord};
use super::format::{BLOCK_MAGIC, BLOCK_UNIT, STREAM_FOOTER, STREAM_MAGIC};
use super::parallel::{build_pool, run_in_order};
use crate::bitstream::bitreader::BitReader;
use crate::error::{CrcScope, Error, Result};
use crate::huffman_coding::huffman_decode::huf_decode;
use crate::tools::crc::do_stream_crc;
use crate::tools::symbol_map::decode_sym_map;

/// Totals reported after decompressing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressStats {
    pub blocks_read: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Decompress one or more concatenated bzip2 streams from `reader` onto `writer`.
/// Every block and stream CRC is checked. Nothing after the last stream is allowed.
pub fn decompress<R: Read, W: Write>(reader: R, writer: W) -> Result<DecompressStats> {
    let result = decompress_stream(reader, writer);
    match &result {
        Ok(stats) => info!(
            "Decompressed {} bytes into {} bytes from {} blocks",
            stats.bytes_in, stats.bytes_out, stats.blocks_read
        ),
        Err(e) => log_bad_input(e),
    }
    result
}

fn decompress_stream<R: Read, W: Write>(reader: R, mut writer: W) -> Result<DecompressStats> {
    let mut decoder = StreamDecoder::new(reader, rayon::current_num_threads(), true)?;
    let mut buf = Vec::new();
    let mut bytes_out = 0_u64;
    while decoder.fill(&mut buf)? {
        writer.write_all(&buf)?;
        bytes_out += buf.len() as u64;
        buf.clear();
    }
    writer.flush()?;
    Ok(DecompressStats {
        blocks_read: decoder.blocks_read(),
        bytes_in: decoder.bytes_in(),
        bytes_out,
    })
}

/// Decompression failures other than I/O are the input's fault.
pub(crate) fn log_bad_input(e: &Error) {
    if e.is_data_error() {
        warn!("Bad compressed input ({}): {}", e.category(), e);
    }
}

/// What follows a block boundary in the bitstream.
enum Section {
    Block(BlockRecord),
    /// End of stream, with the stored stream CRC.
    End(u32),
}

/// Where the decoder stands in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between streams. A new stream header is required only for the first stream.
    Between { first: bool },
    /// Inside a stream with blocks of up to `capacity` bytes.
    InStream { capacity: usize, stream_crc: u32 },
    Done,
}

/// Reads bzip2 streams and decodes their blocks a batch at a time.
pub(crate) struct StreamDecoder<R: Read> {
    br: BitReader<R>,
    pool: ThreadPool,
    batch_size: usize,
    state: State,
    /// Read concatenated streams up to the end of input, or stop after the first one.
    multi: bool,
    blocks_read: u64,
}

impl<R: Read> StreamDecoder<R> {
    /// Decode up to `workers` blocks at a time.
    pub(crate) fn new(reader: R, workers: usize, multi: bool) -> Result<Self> {
        let workers = workers.max(1);
        Ok(Self {
            br: BitReader::new(reader),
            pool: build_pool(workers)?,
            batch_size: workers,
            state: State::Between { first: true },
            multi,
            blocks_read: 0,
        })
    }

    pub(crate) fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Compressed bytes read so far.
    pub(crate) fn bytes_in(&self) -> u64 {
        self.br.bytes_consumed()
    }

    pub(crate) fn into_inner(self) -> R {
        self.br.into_inner()
    }

    /// The reader and the bytes read ahead from it that were not decoded.
    pub(crate) fn into_parts(self) -> (R, Vec<u8>) {
        self.br.into_parts()
    }

    /// Decode the next batch of blocks and append their data to `out`. Returns false once
    /// every stream has been read and checked.
    pub(crate) fn fill(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        loop {
            match self.state {
                State::Done => return Ok(false),
                State::Between { first } => {
                    if !first && (!self.multi || !self.br.has_more()?) {
                        self.state = State::Done;
                        return Ok(false);
                    }
                    let capacity = self.read_stream_header()?;
                    self.state = State::InStream {
                        capacity,
                        stream_crc: 0,
                    };
                }
                State::InStream {
                    capacity,
                    stream_crc,
                } => {
                    let mut records = Vec::with_capacity(self.batch_size);
                    let mut stored_stream_crc = None;
                    while records.len() < self.batch_size {
                        match self.read_section(capacity)? {
                            Section::Block(record) => records.push(record),
                            Section::End(crc) => {
                                stored_stream_crc = Some(crc);
                                break;
                            }
                        }
                    }

                    let got_blocks = !records.is_empty();
                    let mut stream_crc = stream_crc;
                    for block in run_in_order(&self.pool, records, decompress_block) {
                        let block = block?;
                        stream_crc = do_stream_crc(stream_crc, block.block_crc);
                        out.extend_from_slice(&block.data);
                    }

                    match stored_stream_crc {
                        Some(stored) => {
                            if stored != stream_crc {
                                return Err(Error::ChecksumMismatch {
                                    scope: CrcScope::Stream,
                                    expected: stored,
                                    actual: stream_crc,
                                });
                            }
                            trace!("Stream ends at {}, crc {:08x}", self.br.loc(), stream_crc);
                            self.br.align_to_byte();
                            self.state = State::Between { first: false };
                        }
                        None => {
                            self.state = State::InStream {
                                capacity,
                                stream_crc,
                            }
                        }
                    }
                    if got_blocks {
                        return Ok(true);
                    }
                }
            }
        }
    }

    /// Check the "BZh" signature and return the block capacity from the size digit.
    fn read_stream_header(&mut self) -> Result<usize> {
        let magic = self.br.bytes(3)?;
        if magic != STREAM_MAGIC {
            return Err(Error::corrupt("missing BZh stream signature"));
        }
        let digit = self.br.byte()?;
        if !(b'1'..=b'9').contains(&digit) {
            return Err(Error::corrupt(format!(
                "invalid block size digit {:?}",
                digit as char
            )));
        }
        info!("Found stream with {}k blocks", (digit - b'0') as usize * 100);
        Ok((digit - b'0') as usize * BLOCK_UNIT)
    }

    /// Read a block header and its huffman section, or the end of stream marker.
    fn read_section(&mut self, capacity: usize) -> Result<Section> {
        let magic = (self.br.bint(24)? as u64) << 24 | self.br.bint(24)? as u64;
        match magic {
            BLOCK_MAGIC => Ok(Section::Block(self.read_block(capacity)?)),
            STREAM_FOOTER => Ok(Section::End(self.br.bint(32)?)),
            _ => Err(Error::corrupt(format!(
                "bad block magic {:012x} at {}",
                magic,
                self.br.loc()
            ))),
        }
    }

    fn read_block(&mut self, capacity: usize) -> Result<BlockRecord> {
        self.blocks_read += 1;
        let seq = self.blocks_read;
        let stored_crc = self.br.bint(32)?;
        if self.br.bool_bit()? {
            return Err(Error::corrupt("randomized blocks are not supported"));
        }
        let key = self.br.bint(24)?;

        // Symbol map: an index word, then one word per set bit in the index
        let index = self.br.bint(16)? as u16;
        if index == 0 {
            return Err(Error::corrupt("block has an empty symbol map"));
        }
        let mut words = vec![index];
        for _ in 0..index.count_ones() {
            words.push(self.br.bint(16)? as u16);
        }
        let in_use = decode_sym_map(&words);
        if in_use.is_empty() {
            return Err(Error::corrupt("block has an empty symbol map"));
        }

        let symbols = huf_decode(&mut self.br, in_use.len(), capacity)?;
        info!("Read block {}: {} symbols", seq, symbols.len());
        Ok(BlockRecord {
            seq,
            stored_crc,
            key,
            in_use,
            symbols,
            capacity,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::compress::compress;

    /// "hello world\n" compressed by the reference encoder at -9.
    const HELLO: [u8; 52] = [
        0x42, 0x5a, 0x68, 0x39, 0x31, 0x41, 0x59, 0x26, 0x53, 0x59, 0x4e, 0xec, 0xe8, 0x36, 0x00,
        0x00, 0x02, 0x51, 0x80, 0x00, 0x10, 0x40, 0x00, 0x06, 0x44, 0x90, 0x80, 0x20, 0x00, 0x31,
        0x06, 0x4c, 0x41, 0x01, 0xa7, 0xa9, 0xa5, 0x80, 0xbb, 0x94, 0x31, 0xf8, 0xbb, 0x92, 0x29,
        0xc2, 0x84, 0x82, 0x77, 0x67, 0x41, 0xb0,
    ];

    #[test]
    fn reference_stream_test() {
        let mut out = Vec::new();
        let stats = decompress(HELLO.as_slice(), &mut out).unwrap();
        assert_eq!(out, b"hello world\n");
        assert_eq!(stats.blocks_read, 1);
        assert_eq!(stats.bytes_in, HELLO.len() as u64);
        assert_eq!(stats.bytes_out, 12);
    }

    #[test]
    fn empty_stream_test() {
        let stream = [0x42, 0x5A, 0x68, 0x31, 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0];
        let mut out = Vec::new();
        let stats = decompress(stream.as_slice(), &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(stats.blocks_read, 0);
    }

    #[test]
    fn concatenated_test() {
        let mut stream = Vec::new();
        compress(&b"first part, "[..], &mut stream, 1).unwrap();
        compress(&b"second part"[..], &mut stream, 9).unwrap();
        let mut out = Vec::new();
        let stats = decompress(stream.as_slice(), &mut out).unwrap();
        assert_eq!(out, b"first part, second part");
        assert_eq!(stats.blocks_read, 2);
    }

    #[test]
    fn single_stream_test() {
        let mut stream = HELLO.to_vec();
        stream.extend_from_slice(b"trailing bytes");
        let mut decoder = StreamDecoder::new(stream.as_slice(), 2, false).unwrap();
        let mut out = Vec::new();
        while decoder.fill(&mut out).unwrap() {}
        assert_eq!(out, b"hello world\n");
        assert_eq!(decoder.bytes_in(), HELLO.len() as u64);
        let (rest, ahead) = decoder.into_parts();
        assert!(rest.is_empty());
        assert_eq!(ahead, b"trailing bytes");
    }

    #[test]
    fn no_input_test() {
        let mut out = Vec::new();
        assert!(matches!(
            decompress(&b""[..], &mut out),
            Err(Error::TruncatedStream)
        ));
    }

    #[test]
    fn bad_header_test() {
        let mut out = Vec::new();
        assert!(matches!(
            decompress(&b"BZx9"[..], &mut out),
            Err(Error::CorruptStream { .. })
        ));
        assert!(matches!(
            decompress(&b"BZh0"[..], &mut out),
            Err(Error::CorruptStream { .. })
        ));
    }

    #[test]
    fn trailing_garbage_test() {
        let mut stream = HELLO.to_vec();
        stream.extend_from_slice(b"junk");
        let mut out = Vec::new();
        assert!(matches!(
            decompress(stream.as_slice(), &mut out),
            Err(Error::CorruptStream { .. })
        ));
    }

    #[test]
    fn truncated_test() {
        let mut out = Vec::new();
        assert!(matches!(
            decompress(&HELLO[..30], &mut out),
            Err(Error::TruncatedStream)
        ));
    }

    #[test]
    fn stream_crc_test() {
        let mut stream = HELLO.to_vec();
        // The byte before last is entirely stream crc.
        let idx = stream.len() - 2;
        stream[idx] ^= 0x01;
        let mut out = Vec::new();
        assert!(matches!(
            decompress(stream.as_slice(), &mut out),
            Err(Error::ChecksumMismatch {
                scope: CrcScope::Stream,
                ..
            })
        ));
    }

    #[test]
    fn randomized_block_test() {
        let mut stream = HELLO.to_vec();
        // The randomized bit follows the block crc: top bit of byte 14.
        stream[14] |= 0x80;
        let mut out = Vec::new();
        assert!(matches!(
            decompress(stream.as_slice(), &mut out),
            Err(Error::CorruptStream { .. })
        ));
    }
}
