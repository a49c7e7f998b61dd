//! The bitstream module forms the I/O subsystem of the engine.
//!
//! bzip2 is a block-oriented format, but blocks are not byte aligned: each block starts on the
//! bit where the previous one ended. Blocks are packed independently (and possibly in parallel)
//! by the BitPacker, then spliced into one continuous stream by the BitWriter, which also adds
//! the stream header, footer and stream CRC.
//!
//! The BitReader is the decoding side. It is shared by every stage that parses the stream.
pub mod bitpacker;
pub mod bitreader;
pub mod bitwriter;
